//! Defines the HTTP routes for machine provisioning.

use super::handlers::{deactivate_machine, get_machine, provision_machine};
use crate::auth::middleware::jwt_auth;
use axum::{
    Router, middleware,
    routing::{get, post},
};

pub async fn machine_router() -> Router {
    Router::new()
        .route(
            "/",
            post(provision_machine).layer(middleware::from_fn(jwt_auth)),
        )
        .route(
            "/{id}",
            get(get_machine).layer(middleware::from_fn(jwt_auth)),
        )
        .route(
            "/{id}/deactivate",
            post(deactivate_machine).layer(middleware::from_fn(jwt_auth)),
        )
}
