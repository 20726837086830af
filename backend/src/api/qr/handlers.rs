//! Handler functions for QR resolution.
//!
//! The resolve endpoint is deliberately unauthenticated: scanning happens
//! before sign-in, and the response carries nothing sensitive beyond the
//! machine's public location.

use crate::api::common::ApiResponse;
use crate::api::qr::models::{QrResolveParams, QrResolveResponse};
use crate::config::Config;
use crate::services::machine_service::MachineService;
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Json,
};
use sqlx::SqlitePool;

/// Resolves a scanned machine reference.
#[axum::debug_handler]
pub async fn resolve_qr(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Query(params): Query<QrResolveParams>,
) -> Result<Json<QrResolveResponse>, (StatusCode, String)> {
    let service = MachineService::new(&pool, &config);

    let resolution = service
        .resolve(params.machine_id(), params.sig.as_deref(), params.ts.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("QR resolution failed: {}", e);
            let error_response =
                ApiResponse::<()>::error("QR resolution failed", "resolve_error", None);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::to_string(&error_response).unwrap(),
            )
        })?;

    let response = match resolution {
        Ok(machine) => {
            tracing::info!("Resolved machine {} at {}", machine.id, machine.location);
            QrResolveResponse::verified(machine.id, machine.location)
        }
        Err(rejection) => {
            tracing::info!("Rejected QR reference: {}", rejection.code());
            QrResolveResponse::rejected(rejection.code())
        }
    };

    Ok(Json(response))
}
