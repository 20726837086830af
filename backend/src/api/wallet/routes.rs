//! Defines the HTTP routes for wallet and transaction history.

use super::handlers::{get_transactions, get_wallet, top_up};
use crate::auth::middleware::jwt_auth;
use axum::{
    Router, middleware,
    routing::{get, post},
};

pub async fn wallet_router() -> Router {
    Router::new()
        .route(
            "/wallet",
            get(get_wallet).layer(middleware::from_fn(jwt_auth)),
        )
        .route(
            "/wallet/topup",
            post(top_up).layer(middleware::from_fn(jwt_auth)),
        )
        .route(
            "/transactions",
            get(get_transactions).layer(middleware::from_fn(jwt_auth)),
        )
}
