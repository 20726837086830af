//! Wire types for machine provisioning.

use crate::database::models::Machine;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Provisioning response, including the secret the fleet operator needs to
/// print signed QR payloads offline. Returned exactly once.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedMachine {
    pub id: String,
    pub location: String,
    pub flow_rate_lpm: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub qr_secret: String,
    /// Static payload URL for the printed sticker.
    pub qr_url: String,
}

impl ProvisionedMachine {
    pub fn new(machine: Machine, qr_url: String) -> Self {
        Self {
            id: machine.id,
            location: machine.location,
            flow_rate_lpm: machine.flow_rate_lpm,
            is_active: machine.is_active,
            created_at: machine.created_at,
            qr_secret: machine.qr_secret,
            qr_url,
        }
    }
}
