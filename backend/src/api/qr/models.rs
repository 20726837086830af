//! Wire types for the QR resolution endpoint.
//!
//! The response shape is part of the kiosk contract: `ok` is the
//! discriminator, rejections carry a machine-readable `error` code, and both
//! are returned with HTTP 200 so clients branch on the body, not the status.

use serde::{Deserialize, Serialize};

/// Query parameters accepted by `GET /api/qr/resolve`.
#[derive(Debug, Deserialize)]
pub struct QrResolveParams {
    /// Machine id, as embedded in the QR payload.
    pub m: Option<String>,
    /// Alternate field name used by manual-entry clients.
    #[serde(rename = "machineId")]
    pub machine_id: Option<String>,
    pub sig: Option<String>,
    pub ts: Option<String>,
}

impl QrResolveParams {
    /// The machine id, preferring `m` over `machineId`.
    pub fn machine_id(&self) -> Option<&str> {
        self.m.as_deref().or(self.machine_id.as_deref())
    }
}

/// Body of the resolve response, success or rejection.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrResolveResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QrResolveResponse {
    pub fn verified(machine_id: String, machine_location: String) -> Self {
        Self {
            ok: true,
            machine_id: Some(machine_id),
            machine_location: Some(machine_location),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            machine_id: None,
            machine_location: None,
            error: Some(error.into()),
        }
    }
}
