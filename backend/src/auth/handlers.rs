//! Handler functions for authentication endpoints.
//!
//! These functions process registration, login, and token refresh requests
//! and convert service results into API responses.

use crate::api::common::{ApiResponse, service_error_to_http};
use crate::auth::models::{LoginRequest, LoginResponse, RefreshTokenRequest, RefreshTokenResponse};
use crate::auth::service::AuthService;
use crate::config::Config;
use crate::database::models::{RegisterRequest, User};
use crate::services::user_service::UserService;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
};
use sqlx::SqlitePool;

/// Registers a new user and provisions their wallet.
#[axum::debug_handler]
pub async fn register(
    Extension(pool): Extension<SqlitePool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<User>>, (StatusCode, String)> {
    tracing::info!("Registering user: {}", payload.username);

    let service = UserService::new(&pool);
    let user = service.create_user(payload).await.map_err(|e| {
        tracing::error!("Failed to register user: {}", e);
        service_error_to_http(e)
    })?;

    tracing::info!("User registered successfully: {}", user.id);
    Ok(Json(ApiResponse::success(
        user,
        "User registered successfully",
    )))
}

/// Authenticates a user and returns access and refresh tokens.
#[axum::debug_handler]
pub async fn login(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, (StatusCode, String)> {
    tracing::info!("Login attempt for user: {}", payload.username);

    let service = AuthService::new(&pool, &config);
    let response = service.login(payload).await.map_err(|e| {
        tracing::warn!("Login failed: {}", e);
        let error_response =
            ApiResponse::<()>::error("Invalid username or password", "unauthorized", None);
        (
            StatusCode::UNAUTHORIZED,
            serde_json::to_string(&error_response).unwrap(),
        )
    })?;

    tracing::info!("Login successful for user: {}", response.user.id);
    Ok(Json(ApiResponse::success(response, "Login successful")))
}

/// Exchanges a refresh token for a new access token.
#[axum::debug_handler]
pub async fn refresh_token(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<RefreshTokenResponse>>, (StatusCode, String)> {
    let service = AuthService::new(&pool, &config);
    let response = service.refresh_token(payload).await.map_err(|e| {
        tracing::warn!("Token refresh failed: {}", e);
        let error_response =
            ApiResponse::<()>::error("Invalid refresh token", "unauthorized", None);
        (
            StatusCode::UNAUTHORIZED,
            serde_json::to_string(&error_response).unwrap(),
        )
    })?;

    Ok(Json(ApiResponse::success(response, "Token refreshed")))
}
