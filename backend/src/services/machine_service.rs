//! Machine provisioning and QR resolution logic.
//!
//! Provisioning mints a short machine id plus a per-machine HMAC secret and
//! builds the signed QR payload URL printed on the kiosk. Resolution is the
//! server half of the scan flow: it checks existence, eligibility, signature
//! authenticity, and timestamp freshness.

use crate::config::Config;
use crate::database::models::{Machine, ProvisionMachineRequest};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::machine_repository::MachineRepository;
use crate::utils::generate_random_string::generate_random_string;
use crate::utils::qr_signature;
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

const MACHINE_ID_LENGTH: usize = 6;
const QR_SECRET_LENGTH: usize = 32;

/// Why a scanned reference was rejected by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrRejection {
    MissingParameters,
    NotFound,
    Inactive,
    InvalidSignature,
    Expired,
}

impl QrRejection {
    /// Machine-readable code placed in the resolve response body.
    pub fn code(&self) -> &'static str {
        match self {
            QrRejection::MissingParameters => "MISSING_PARAMETERS",
            QrRejection::NotFound => "NOT_FOUND",
            QrRejection::Inactive => "INACTIVE",
            QrRejection::InvalidSignature => "INVALID_SIGNATURE",
            QrRejection::Expired => "EXPIRED",
        }
    }
}

pub struct MachineService<'a> {
    pool: &'a SqlitePool,
    config: &'a Config,
}

impl<'a> MachineService<'a> {
    pub fn new(pool: &'a SqlitePool, config: &'a Config) -> Self {
        Self { pool, config }
    }

    /// Provisions a new machine with a generated id and QR secret.
    pub async fn provision(&self, request: ProvisionMachineRequest) -> ServiceResult<Machine> {
        if let Err(validation_errors) = request.validate() {
            return Err(ServiceError::validation(validation_errors.to_string()));
        }

        let repo = MachineRepository::new(self.pool);
        let flow_rate = request
            .flow_rate_lpm
            .unwrap_or(self.config.default_flow_rate_lpm);

        // Short ids collide rarely; retry a few times rather than growing them.
        for _ in 0..3 {
            let id = generate_random_string(MACHINE_ID_LENGTH);
            if repo.get_machine(&id).await?.is_some() {
                continue;
            }
            let secret = generate_random_string(QR_SECRET_LENGTH);
            let machine = repo
                .create_machine(&id, &request.location, &secret, flow_rate)
                .await?;
            return Ok(machine);
        }

        Err(ServiceError::internal_error(
            "Could not allocate a unique machine id",
        ))
    }

    /// Retrieves a machine or fails with NotFound.
    pub async fn get_machine_required(&self, id: &str) -> ServiceResult<Machine> {
        let repo = MachineRepository::new(self.pool);
        let machine = repo
            .get_machine(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Machine", id))?;
        Ok(machine)
    }

    /// Builds the QR payload URL printed on a machine's sticker.
    ///
    /// A `ts` of `None` produces a static payload whose signature covers only
    /// the machine id; dynamic displays pass the current epoch seconds.
    pub fn qr_payload_url(&self, machine: &Machine, ts: Option<i64>) -> String {
        let ts_string = ts.map(|t| t.to_string());
        let signature =
            qr_signature::sign(&machine.qr_secret, &machine.id, ts_string.as_deref());
        match ts_string {
            Some(ts) => format!(
                "{}/kiosk?m={}&ts={}&sig={}",
                self.config.app_origin, machine.id, ts, signature
            ),
            None => format!(
                "{}/kiosk?m={}&sig={}",
                self.config.app_origin, machine.id, signature
            ),
        }
    }

    /// Resolves a scanned reference: the server half of `/api/qr/resolve`.
    ///
    /// Manual entries (no signature) are still checked for existence and
    /// eligibility; signed payloads additionally prove authenticity and,
    /// when stamped, freshness.
    pub async fn resolve(
        &self,
        machine_id: Option<&str>,
        signature: Option<&str>,
        ts: Option<&str>,
    ) -> ServiceResult<Result<Machine, QrRejection>> {
        let machine_id = match machine_id {
            Some(id) if !id.trim().is_empty() => id.trim(),
            _ => return Ok(Err(QrRejection::MissingParameters)),
        };

        let repo = MachineRepository::new(self.pool);
        let machine = match repo.get_machine(machine_id).await? {
            Some(machine) => machine,
            None => return Ok(Err(QrRejection::NotFound)),
        };

        if !machine.is_active {
            return Ok(Err(QrRejection::Inactive));
        }

        if let Some(signature) = signature {
            if !qr_signature::verify(&machine.qr_secret, &machine.id, ts, signature) {
                return Ok(Err(QrRejection::InvalidSignature));
            }

            if let Some(ts) = ts {
                let Ok(stamped_at) = ts.parse::<i64>() else {
                    return Ok(Err(QrRejection::Expired));
                };
                let age = Utc::now().timestamp() - stamped_at;
                if age < 0 || age > self.config.qr_max_age_seconds {
                    return Ok(Err(QrRejection::Expired));
                }
            }
        }

        Ok(Ok(machine))
    }
}
