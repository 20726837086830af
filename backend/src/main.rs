//! Main entry point for the AquaPoint backend.
//!
//! This file initializes logging, loads configuration, binds the listener,
//! and hands off to the library's server loop.

use backend::config::Config;
use tracing::info;
use tracing_subscriber::fmt::init;

#[tokio::main]
async fn main() {
    init();

    let config = Config::from_env().unwrap();

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await.unwrap();

    info!("Starting AquaPoint server on port {}", config.server_port);
    backend::run(listener, config).await.unwrap();
}
