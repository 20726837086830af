//! Handler functions for wallet endpoints.
//!
//! These functions expose the prepaid balance, accept top-up credits, and
//! list a user's dispense history.

use crate::api::common::{
    ApiResponse, PaginationFilter, PaginationMeta, service_error_to_http,
    validation_error_response,
};
use crate::api::wallet::models::{TopUpRequest, TransactionView, WalletResponse};
use crate::repositories::dispense_repository::DispenseRepository;
use crate::services::wallet_service::WalletService;
use crate::utils::jwt::Claims;
use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
};
use sqlx::SqlitePool;
use validator::Validate;

/// Returns the caller's prepaid balance (raw contract body).
#[axum::debug_handler]
pub async fn get_wallet(
    Extension(pool): Extension<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<WalletResponse>, (StatusCode, String)> {
    let service = WalletService::new(&pool);
    let wallet = service.get_wallet_required(&claims.sub).await.map_err(|e| {
        tracing::error!("Wallet lookup failed for user {}: {}", claims.sub, e);
        service_error_to_http(e)
    })?;

    Ok(Json(WalletResponse {
        balance_cents: wallet.balance_cents,
    }))
}

/// Credits the caller's wallet after a captured payment.
#[axum::debug_handler]
pub async fn top_up(
    Extension(pool): Extension<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<TopUpRequest>,
) -> Result<Json<ApiResponse<WalletResponse>>, (StatusCode, String)> {
    if let Err(errors) = payload.validate() {
        return Err(validation_error_response(errors));
    }

    let service = WalletService::new(&pool);
    let wallet = service
        .top_up(&claims.sub, payload.amount_cents)
        .await
        .map_err(|e| {
            tracing::error!("Top-up failed for user {}: {}", claims.sub, e);
            service_error_to_http(e)
        })?;

    Ok(Json(ApiResponse::success(
        WalletResponse {
            balance_cents: wallet.balance_cents,
        },
        "Wallet credited successfully",
    )))
}

/// Lists the caller's dispense history, newest first.
#[axum::debug_handler]
pub async fn get_transactions(
    Extension(pool): Extension<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(pagination): Query<PaginationFilter>,
) -> Result<Json<ApiResponse<Vec<TransactionView>>>, (StatusCode, String)> {
    if let Err(errors) = pagination.validate() {
        return Err(validation_error_response(errors));
    }

    let repo = DispenseRepository::new(&pool);

    let records = repo
        .get_records_by_user_id(&claims.sub, &pagination)
        .await
        .map_err(|e| {
            tracing::error!("Transaction listing failed for user {}: {}", claims.sub, e);
            let error_response = ApiResponse::<()>::error(
                "Failed to list transactions",
                "transaction_list_error",
                None,
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::to_string(&error_response).unwrap(),
            )
        })?;

    let total = repo
        .get_records_count_by_user_id(&claims.sub)
        .await
        .unwrap_or(records.len() as u64);

    let views: Vec<TransactionView> = records.into_iter().map(TransactionView::from).collect();
    let meta = PaginationMeta::from_filter(&pagination, total);

    Ok(Json(ApiResponse::paginated(
        views,
        meta,
        "Transactions retrieved successfully",
    )))
}
