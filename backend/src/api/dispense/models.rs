//! Wire types for the dispensing endpoints.
//!
//! These are the kiosk contract bodies: clients branch on the HTTP status and
//! the `error` marker, and always treat the server's figures as authoritative
//! over anything computed locally.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of `POST /api/dispense`.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DispenseRequest {
    pub liters: f64,

    #[validate(length(min = 1, message = "Machine id is required"))]
    pub machine_id: String,

    /// Display location echoed by the client; the machine record wins.
    pub location: Option<String>,
}

/// Success body of `POST /api/dispense`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseSuccessResponse {
    pub amount_cents: i64,
    pub new_balance_cents: i64,
    pub prev_balance_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_rate_lpm: Option<f64>,
    pub tx_id: String,
}

/// HTTP 400 body when the wallet cannot cover the request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsufficientFundsBody {
    /// Always `"INSUFFICIENT_FUNDS"`; the marker clients branch on.
    pub error: String,
    pub amount_cents: i64,
    pub balance_cents: i64,
}

impl InsufficientFundsBody {
    pub const MARKER: &'static str = "INSUFFICIENT_FUNDS";

    pub fn new(amount_cents: i64, balance_cents: i64) -> Self {
        Self {
            error: Self::MARKER.to_string(),
            amount_cents,
            balance_cents,
        }
    }
}

/// Body of `GET /api/dispense/config`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseConfigResponse {
    pub price_per_liter_cents: i64,
    pub allowed_liters: Vec<f64>,
}

/// One server-sent progress event for an in-flight dispense.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub tx_id: String,
    pub dispensed_liters: f64,
    pub total_liters: f64,
    pub percent: f64,
}
