//! Defines the HTTP routes for authentication.

use super::handlers::{login, refresh_token, register};
use axum::{Router, routing::post};

pub fn auth_router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
}
