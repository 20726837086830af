//! Handler functions for dispensing endpoints.
//!
//! The dispense POST returns raw contract bodies rather than the standard
//! envelope so that kiosk clients can read the shortfall and the settled
//! figures directly. Progress is streamed server-side from the machine's
//! flow rate; clients render it instead of simulating their own timers.

use crate::api::common::{ApiResponse, validation_error_response};
use crate::api::dispense::models::{
    DispenseConfigResponse, DispenseRequest, DispenseSuccessResponse, InsufficientFundsBody,
    ProgressEvent,
};
use crate::config::Config;
use crate::repositories::dispense_repository::DispenseRepository;
use crate::repositories::machine_repository::MachineRepository;
use crate::services::dispense_service::{DispenseOutcome, DispenseService, progress_at};
use crate::utils::jwt::Claims;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::Utc;
use futures::Stream;
use sqlx::SqlitePool;
use std::convert::Infallible;
use std::time::Duration;
use validator::Validate;

/// Returns the public dispensing configuration.
#[axum::debug_handler]
pub async fn get_config(
    Extension(config): Extension<Config>,
) -> Json<DispenseConfigResponse> {
    Json(DispenseConfigResponse {
        price_per_liter_cents: config.price_per_liter_cents,
        allowed_liters: config.allowed_liters.clone(),
    })
}

/// Executes one balance-checked dispense for the authenticated caller.
#[axum::debug_handler]
pub async fn dispense(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<DispenseRequest>,
) -> Result<Json<DispenseSuccessResponse>, (StatusCode, String)> {
    if let Err(errors) = payload.validate() {
        return Err(validation_error_response(errors));
    }

    tracing::info!(
        "Dispense request: user {} machine {} {} L",
        claims.sub,
        payload.machine_id,
        payload.liters
    );

    let service = DispenseService::new(&pool, &config);
    let outcome = service
        .dispense(&claims.sub, &payload.machine_id, payload.liters)
        .await
        .map_err(|e| {
            tracing::error!("Dispense failed for user {}: {}", claims.sub, e);
            crate::api::common::service_error_to_http(e)
        })?;

    match outcome {
        DispenseOutcome::Completed {
            record,
            flow_rate_lpm,
        } => Ok(Json(DispenseSuccessResponse {
            amount_cents: record.amount_cents,
            new_balance_cents: record.balance_after_cents,
            prev_balance_cents: record.balance_before_cents,
            flow_rate_lpm: Some(flow_rate_lpm),
            tx_id: record.id,
        })),
        DispenseOutcome::InsufficientFunds {
            amount_cents,
            balance_cents,
        } => {
            let body = InsufficientFundsBody::new(amount_cents, balance_cents);
            Err((
                StatusCode::BAD_REQUEST,
                serde_json::to_string(&body).unwrap(),
            ))
        }
    }
}

/// Streams dispensing progress for a settled transaction as SSE.
pub async fn dispense_events(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Extension(claims): Extension<Claims>,
    Path(tx_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let repo = DispenseRepository::new(&pool);
    let record = repo
        .get_record(&tx_id)
        .await
        .ok()
        .flatten()
        .filter(|record| record.user_id == claims.sub)
        .ok_or_else(|| {
            let error_response =
                ApiResponse::<()>::error("Dispense not found", "not_found", None);
            (
                StatusCode::NOT_FOUND,
                serde_json::to_string(&error_response).unwrap(),
            )
        })?;

    let machine_repo = MachineRepository::new(&pool);
    let flow_rate_lpm = machine_repo
        .get_machine(&record.machine_id)
        .await
        .ok()
        .flatten()
        .map(|machine| machine.flow_rate_lpm)
        .unwrap_or(config.default_flow_rate_lpm);

    let stream = async_stream::stream! {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        loop {
            ticker.tick().await;
            let elapsed = (Utc::now() - record.created_at).num_milliseconds() as f64 / 1000.0;
            let (dispensed_liters, percent) = progress_at(record.liters, flow_rate_lpm, elapsed);
            let event = ProgressEvent {
                tx_id: record.id.clone(),
                dispensed_liters,
                total_liters: record.liters,
                percent,
            };
            if dispensed_liters >= record.liters {
                yield Ok::<_, Infallible>(
                    Event::default().event("complete").json_data(&event).unwrap(),
                );
                break;
            }
            yield Ok::<_, Infallible>(
                Event::default().event("progress").json_data(&event).unwrap(),
            );
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
