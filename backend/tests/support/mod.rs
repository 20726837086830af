// Shared one-time server bootstrapping for integration tests.
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use backend::config::Config;
use backend::utils::generate_random_string::generate_random_string;

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return the shared base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);

        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // One in-memory database shared through a single pooled connection.
                unsafe {
                    std::env::set_var("DATABASE_URL", "sqlite::memory:");
                    std::env::set_var("DB_MAX_CONNECTIONS", "1");
                    std::env::set_var("JWT_SECRET", "integration-test-secret");
                    std::env::set_var("QR_MAX_AGE_SECONDS", "900");
                    std::env::set_var("PRICE_PER_LITER_CENTS", "175");
                    std::env::set_var("ALLOWED_LITERS", "1,5,10,20");
                    std::env::set_var("APP_ORIGIN", "https://kiosk.aquapoint.example");
                    std::env::set_var("SIGN_IN_URL", "https://auth.aquapoint.example/sign-in");
                }
                let config = Config::from_env().expect("test config");

                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));

                backend::run(listener, config).await.expect("server failed");
            });
        });

        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for URL publication and then wait for the server socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

// Register a fresh user and return their bearer token.
pub async fn register_and_login(client: &reqwest::Client, base_url: &str) -> String {
    let username = format!("user{}", generate_random_string(8));
    let payload = serde_json::json!({
        "username": username,
        "email": format!("{}@test.example", username),
        "password": "correct-horse-battery",
    });

    let res = client
        .post(format!("{base_url}/auth/register"))
        .json(&payload)
        .send()
        .await
        .expect("register request should succeed");
    assert!(res.status().is_success(), "registration failed");

    let res = client
        .post(format!("{base_url}/auth/login"))
        .json(&serde_json::json!({
            "username": username,
            "password": "correct-horse-battery",
        }))
        .send()
        .await
        .expect("login request should succeed");
    assert!(res.status().is_success(), "login failed");

    let body: serde_json::Value = res.json().await.expect("login body");
    body["data"]["access_token"]
        .as_str()
        .expect("access token in login response")
        .to_string()
}

// Credit the user's wallet.
pub async fn top_up(client: &reqwest::Client, base_url: &str, token: &str, amount_cents: i64) {
    let res = client
        .post(format!("{base_url}/api/me/wallet/topup"))
        .bearer_auth(token)
        .json(&serde_json::json!({ "amountCents": amount_cents }))
        .send()
        .await
        .expect("top-up request should succeed");
    assert!(res.status().is_success(), "top-up failed");
}

// Provision a machine and return the response data object
// (id, location, qrSecret, qrUrl, ...).
pub async fn provision_machine(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    location: &str,
) -> serde_json::Value {
    let res = client
        .post(format!("{base_url}/api/machines"))
        .bearer_auth(token)
        .json(&serde_json::json!({ "location": location }))
        .send()
        .await
        .expect("provision request should succeed");
    assert!(res.status().is_success(), "provisioning failed");

    let body: serde_json::Value = res.json().await.expect("provision body");
    body["data"].clone()
}
