//! AquaPoint backend library.
//!
//! Hosts the HTTP API for the water-vending kiosk service (QR resolution,
//! wallets, balance-checked dispensing, machine provisioning) and the
//! kiosk-side flow core in [`flow`]. The binary in `main.rs` is a thin
//! wrapper over [`run`]; integration tests boot the same router on an
//! ephemeral listener.

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod flow;
pub mod repositories;
pub mod services;
pub mod utils;

use crate::api::common::ApiResponse;
use crate::config::Config;
use crate::database::Database;
use anyhow::Result;
use axum::{Extension, Router, response::Json, routing::get};
use sqlx::SqlitePool;
use tracing::info;

/// Builds the full application router.
pub async fn app(config: Config, pool: SqlitePool) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .nest("/api/qr", api::qr::routes::qr_router().await)
        .nest("/api/me", api::wallet::routes::wallet_router().await)
        .nest("/api/dispense", api::dispense::routes::dispense_router().await)
        .nest("/api/machines", api::machine::routes::machine_router().await)
        .nest("/auth", auth::routes::auth_router())
        .layer(Extension(pool))
        .layer(Extension(config))
}

/// Initializes the database and serves the API on `listener`.
pub async fn run(listener: tokio::net::TcpListener, config: Config) -> Result<()> {
    let db = Database::new(&config).await?;
    db.migrate().await?;
    let pool = db.pool().clone();

    info!("Serving AquaPoint API on {}", listener.local_addr()?);
    let router = app(config, pool).await;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "AquaPoint Backend",
            "version": "0.1.0"
        }),
        "Welcome to AquaPoint API",
    ))
}
