//! Wire types for wallet and transaction-history endpoints.

use crate::database::models::DispenseRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of `GET /api/me/wallet` — part of the kiosk contract.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub balance_cents: i64,
}

/// Top-up credit request; capture happens in the hosted payment provider.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TopUpRequest {
    #[validate(range(min = 1, message = "Amount must be greater than zero"))]
    pub amount_cents: i64,
}

/// One row of the transaction history view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub tx_id: String,
    pub machine_id: String,
    pub location: String,
    pub liters: f64,
    pub amount_cents: i64,
    pub balance_after_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<DispenseRecord> for TransactionView {
    fn from(record: DispenseRecord) -> Self {
        Self {
            tx_id: record.id,
            machine_id: record.machine_id,
            location: record.location,
            liters: record.liters,
            amount_cents: record.amount_cents,
            balance_after_cents: record.balance_after_cents,
            created_at: record.created_at,
        }
    }
}
