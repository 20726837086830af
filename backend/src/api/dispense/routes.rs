//! Defines the HTTP routes for dispensing.

use super::handlers::{dispense, dispense_events, get_config};
use crate::auth::middleware::jwt_auth;
use axum::{
    Router, middleware,
    routing::{get, post},
};

pub async fn dispense_router() -> Router {
    Router::new()
        .route("/config", get(get_config))
        .route("/", post(dispense).layer(middleware::from_fn(jwt_auth)))
        .route(
            "/{tx_id}/events",
            get(dispense_events).layer(middleware::from_fn(jwt_auth)),
        )
}
