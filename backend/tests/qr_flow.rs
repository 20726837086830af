//! End-to-end tests for QR resolution and the auth-gated resume flow,
//! driving the real server with the kiosk-side flow core.

mod support;

use backend::flow::{
    AuthProvider, AuthStatus, FileStore, FlowController, FlowState, HostedAuthProvider,
    MachineValidator,
    PendingIntentStore, QrParser, ResolveFailure, ResolveOutcome, ValidateMachine,
    resume_pending_dispense,
};
use backend::utils::qr_signature;
use chrono::Utc;
use std::sync::Arc;
use url::Url;

fn parser() -> QrParser {
    QrParser::new(Url::parse("https://kiosk.aquapoint.example").unwrap())
}

fn validator(base_url: &str) -> MachineValidator {
    MachineValidator::new(Url::parse(base_url).unwrap())
}

#[tokio::test]
async fn signed_qr_payload_resolves_to_a_verified_machine() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let token = support::register_and_login(&client, base_url).await;
    let machine = support::provision_machine(&client, base_url, &token, "Plaza Central").await;

    let qr_url = machine["qrUrl"].as_str().expect("qrUrl in response");
    let reference = parser().parse(qr_url);
    assert!(reference.is_parsed());
    assert!(reference.signature.is_some());

    let verified = validator(base_url)
        .verify(&reference)
        .await
        .expect("signed payload should verify");
    assert_eq!(verified.machine_id, machine["id"].as_str().unwrap());
    assert_eq!(verified.display_location, "Plaza Central");
}

#[tokio::test]
async fn fresh_timestamped_payload_verifies_and_stale_one_expires() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let token = support::register_and_login(&client, base_url).await;
    let machine = support::provision_machine(&client, base_url, &token, "Estación Norte").await;

    let machine_id = machine["id"].as_str().unwrap();
    let secret = machine["qrSecret"].as_str().unwrap();

    let fresh_ts = Utc::now().timestamp().to_string();
    let fresh_sig = qr_signature::sign(secret, machine_id, Some(&fresh_ts));
    let reference = parser().parse(&format!("?m={machine_id}&ts={fresh_ts}&sig={fresh_sig}"));
    assert!(validator(base_url).verify(&reference).await.is_ok());

    let stale_ts = (Utc::now().timestamp() - 3600).to_string();
    let stale_sig = qr_signature::sign(secret, machine_id, Some(&stale_ts));
    let reference = parser().parse(&format!("?m={machine_id}&ts={stale_ts}&sig={stale_sig}"));
    match validator(base_url).verify(&reference).await {
        Err(ResolveFailure::InvalidOrExpired(code)) => assert_eq!(code, "EXPIRED"),
        other => panic!("expected expired rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let token = support::register_and_login(&client, base_url).await;
    let machine = support::provision_machine(&client, base_url, &token, "Mercado Sur").await;

    let machine_id = machine["id"].as_str().unwrap();
    let reference = parser().parse(&format!("?m={machine_id}&sig=deadbeef"));

    match validator(base_url).verify(&reference).await {
        Err(ResolveFailure::InvalidOrExpired(code)) => assert_eq!(code, "INVALID_SIGNATURE"),
        other => panic!("expected signature rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_machine_is_not_found() {
    let base_url = support::ensure_server();

    let reference = parser().parse("NOSUCH");
    match validator(base_url).verify(&reference).await {
        Err(ResolveFailure::NotFoundOrInactive(code)) => assert_eq!(code, "NOT_FOUND"),
        other => panic!("expected not-found rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn deactivated_machine_is_not_dispensing() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let token = support::register_and_login(&client, base_url).await;
    let machine = support::provision_machine(&client, base_url, &token, "Depósito").await;
    let machine_id = machine["id"].as_str().unwrap();

    let res = client
        .post(format!("{base_url}/api/machines/{machine_id}/deactivate"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("deactivate request should succeed");
    assert!(res.status().is_success());

    let reference = parser().parse(machine["qrUrl"].as_str().unwrap());
    match validator(base_url).verify(&reference).await {
        Err(ResolveFailure::NotFoundOrInactive(code)) => assert_eq!(code, "INACTIVE"),
        other => panic!("expected inactive rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn payload_without_machine_reference_never_reaches_the_server() {
    let base_url = support::ensure_server();

    let reference = parser().parse("");
    match validator(base_url).verify(&reference).await {
        Err(ResolveFailure::MissingParameters) => {}
        other => panic!("expected missing parameters, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_backend_surfaces_as_a_network_failure() {
    // Nothing listens on this port.
    let validator = MachineValidator::new(Url::parse("http://127.0.0.1:9").unwrap());
    let reference = parser().parse("?m=007&sig=abc");

    match validator.verify(&reference).await {
        Err(ResolveFailure::Network(_)) => {}
        other => panic!("expected network failure, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_location_in_resolve_response_defaults_to_unknown() {
    // Stub backend that confirms the machine but omits its location.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let router = axum::Router::new().route(
            "/api/qr/resolve",
            axum::routing::get(|| async {
                axum::Json(serde_json::json!({ "ok": true, "machineId": "007" }))
            }),
        );
        axum::serve(listener, router).await.unwrap();
    });

    let validator = MachineValidator::new(Url::parse(&format!("http://{addr}")).unwrap());
    let reference = parser().parse("?m=007&sig=abc");

    let verified = validator.verify(&reference).await.unwrap();
    assert_eq!(verified.machine_id, "007");
    assert_eq!(verified.display_location, "unknown");
}

#[tokio::test]
async fn scan_before_sign_in_parks_the_intent_and_resumes_after_auth() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let token = support::register_and_login(&client, base_url).await;
    let machine = support::provision_machine(&client, base_url, &token, "Terminal Oeste").await;
    let machine_id = machine["id"].as_str().unwrap().to_string();
    let qr_url = machine["qrUrl"].as_str().unwrap().to_string();

    // Durable store backed by a file, like the browser's persistent storage.
    let state_dir = tempfile::tempdir().unwrap();
    let state_path = state_dir.path().join("kiosk-state.json");

    let auth = Arc::new(HostedAuthProvider::new(
        Url::parse("https://auth.aquapoint.example/sign-in").unwrap(),
    ));
    auth.set_signed_out();

    let controller = FlowController::new(
        parser(),
        validator(base_url),
        auth.clone(),
        PendingIntentStore::new(FileStore::new(&state_path)),
    );

    // 1. Unauthenticated scan: validated, parked, redirected to sign-in.
    let outcome = controller.resolve(&qr_url, "/kiosk").await;
    match outcome {
        ResolveOutcome::Applied(FlowState::AwaitingAuth { sign_in_url }) => {
            assert!(sign_in_url.starts_with("https://auth.aquapoint.example/sign-in?"));
        }
        other => panic!("expected AwaitingAuth, got {:?}", other),
    }

    // 2. The redirect comes back on a fresh mount: new store instance over
    //    the same file, session now confirmed.
    auth.set_session(&token);
    assert_eq!(auth.status(), AuthStatus::SignedIn);
    let fresh_store = PendingIntentStore::new(FileStore::new(&state_path));

    let resumed = resume_pending_dispense(&auth, &fresh_store).await;
    match resumed {
        Some(FlowState::Routed {
            machine_id: resumed_id,
            location,
            from_qr,
        }) => {
            assert_eq!(resumed_id, machine_id);
            assert_eq!(location, "Terminal Oeste");
            assert!(from_qr);
        }
        other => panic!("expected resumed Routed state, got {:?}", other),
    }

    // 3. The slot is consumed: a second mount has nothing to act on.
    assert!(resume_pending_dispense(&auth, &fresh_store).await.is_none());
}
