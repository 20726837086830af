//! Defines the HTTP routes for QR resolution.

use super::handlers::resolve_qr;
use axum::{Router, routing::get};

pub async fn qr_router() -> Router {
    Router::new().route("/resolve", get(resolve_qr))
}
