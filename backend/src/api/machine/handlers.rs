//! Handler functions for machine provisioning endpoints.

use crate::api::common::{ApiResponse, service_error_to_http};
use crate::api::machine::models::ProvisionedMachine;
use crate::config::Config;
use crate::database::models::{Machine, ProvisionMachineRequest};
use crate::repositories::machine_repository::MachineRepository;
use crate::services::machine_service::MachineService;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use sqlx::SqlitePool;

/// Provisions a new machine and returns its signed QR payload.
#[axum::debug_handler]
pub async fn provision_machine(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Json(payload): Json<ProvisionMachineRequest>,
) -> Result<Json<ApiResponse<ProvisionedMachine>>, (StatusCode, String)> {
    let service = MachineService::new(&pool, &config);

    let machine = service.provision(payload).await.map_err(|e| {
        tracing::error!("Machine provisioning failed: {}", e);
        service_error_to_http(e)
    })?;

    let qr_url = service.qr_payload_url(&machine, None);

    tracing::info!("Provisioned machine {} at {}", machine.id, machine.location);
    Ok(Json(ApiResponse::success(
        ProvisionedMachine::new(machine, qr_url),
        "Machine provisioned successfully",
    )))
}

/// Retrieves a machine by its short id.
#[axum::debug_handler]
pub async fn get_machine(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Machine>>, (StatusCode, String)> {
    let service = MachineService::new(&pool, &config);

    let machine = service.get_machine_required(&id).await.map_err(|e| {
        tracing::warn!("Machine lookup failed for {}: {}", id, e);
        service_error_to_http(e)
    })?;

    Ok(Json(ApiResponse::success(
        machine,
        "Machine retrieved successfully",
    )))
}

/// Takes a machine out of service; its QR codes resolve as INACTIVE.
#[axum::debug_handler]
pub async fn deactivate_machine(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, (StatusCode, String)> {
    let repo = MachineRepository::new(&pool);

    let updated = repo.set_active(&id, false).await.map_err(|e| {
        tracing::error!("Failed to deactivate machine {}: {}", id, e);
        let error_response =
            ApiResponse::<()>::error("Failed to deactivate machine", "machine_update_error", None);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::to_string(&error_response).unwrap(),
        )
    })?;

    if !updated {
        let error_response = ApiResponse::<()>::error("Machine not found", "not_found", None);
        return Err((
            StatusCode::NOT_FOUND,
            serde_json::to_string(&error_response).unwrap(),
        ));
    }

    tracing::info!("Machine {} taken out of service", id);
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "id": id, "isActive": false }),
        "Machine deactivated successfully",
    )))
}
