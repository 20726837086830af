//! Server-side verification of parsed machine references.
//!
//! A reference is only a claim until the backend confirms the machine exists,
//! is dispensing, and (when signed) that the signature and timestamp check
//! out. Every expected rejection comes back as a typed failure; nothing at
//! this boundary panics or leaks a raw transport error.

use crate::api::qr::models::QrResolveResponse;
use crate::flow::parser::MachineReference;
use crate::utils::UNKNOWN_LOCATION;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const VALIDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// A machine reference confirmed authentic and eligible by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedMachine {
    pub machine_id: String,
    pub display_location: String,
}

/// Why verification did not produce a [`VerifiedMachine`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveFailure {
    /// The reference carries no machine id at all.
    #[error("scanned payload carries no machine reference")]
    MissingParameters,
    /// The backend rejected the signature or timestamp.
    #[error("machine reference rejected: {0}")]
    InvalidOrExpired(String),
    /// The backend reports the machine unknown or in maintenance.
    #[error("machine unknown or not dispensing: {0}")]
    NotFoundOrInactive(String),
    /// The verification request could not complete.
    #[error("verification request failed: {0}")]
    Network(String),
}

/// Seam for the flow controller; lets tests verify without a server.
#[async_trait]
pub trait ValidateMachine: Send + Sync {
    async fn verify(&self, reference: &MachineReference)
    -> Result<VerifiedMachine, ResolveFailure>;
}

/// HTTP validator against `GET /api/qr/resolve`.
pub struct MachineValidator {
    base_url: Url,
    client: reqwest::Client,
}

impl MachineValidator {
    pub fn new(base_url: Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(VALIDATE_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, client }
    }
}

#[async_trait]
impl ValidateMachine for MachineValidator {
    async fn verify(
        &self,
        reference: &MachineReference,
    ) -> Result<VerifiedMachine, ResolveFailure> {
        let Some(machine_id) = reference.machine_id.as_deref().filter(|id| !id.is_empty())
        else {
            return Err(ResolveFailure::MissingParameters);
        };

        let mut endpoint = self
            .base_url
            .join("/api/qr/resolve")
            .map_err(|e| ResolveFailure::Network(e.to_string()))?;

        {
            let mut query = endpoint.query_pairs_mut();
            query.append_pair("m", machine_id);
            if let Some(sig) = reference.signature.as_deref() {
                query.append_pair("sig", sig);
            }
            if let Some(ts) = reference.timestamp.as_deref() {
                query.append_pair("ts", ts);
            }
        }

        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| ResolveFailure::Network(e.to_string()))?;

        let body: QrResolveResponse = response
            .json()
            .await
            .map_err(|e| ResolveFailure::Network(format!("Malformed resolve response: {}", e)))?;

        if !body.ok {
            let code = body.error.unwrap_or_else(|| "REJECTED".to_string());
            return Err(match code.as_str() {
                "NOT_FOUND" | "INACTIVE" => ResolveFailure::NotFoundOrInactive(code),
                _ => ResolveFailure::InvalidOrExpired(code),
            });
        }

        Ok(VerifiedMachine {
            machine_id: body
                .machine_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| machine_id.to_string()),
            display_location: body
                .machine_location
                .filter(|location| !location.is_empty())
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        })
    }
}
