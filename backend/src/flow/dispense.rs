//! Client for the balance-checked dispense endpoint.
//!
//! One attempt, one request: the endpoint carries no idempotency key, so the
//! client never retries on its own. Whatever the server answers is converted
//! into a typed [`DispenseSession`]; the only figures that survive into the
//! session are the server's.

use crate::api::dispense::models::{
    DispenseConfigResponse, DispenseRequest, DispenseSuccessResponse, InsufficientFundsBody,
};
use crate::api::wallet::models::WalletResponse;
use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

const DISPENSE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispenseStatus {
    Pending,
    Succeeded,
    InsufficientFunds,
    Failed,
}

/// One attempt to purchase and release a quantity of water.
#[derive(Debug, Clone)]
pub struct DispenseSession {
    pub machine_id: String,
    pub location: String,
    pub requested_liters: f64,
    pub price_per_liter_cents: i64,
    /// Advisory until the server answers; overwritten by the response.
    pub amount_cents: i64,
    pub status: DispenseStatus,
    pub balance_before_cents: Option<i64>,
    /// Set only when `status == Succeeded`.
    pub balance_after_cents: Option<i64>,
    /// Exact top-up shortfall when the balance cannot cover the request.
    pub required_additional_cents: Option<i64>,
    pub tx_id: Option<String>,
    pub flow_rate_lpm: Option<f64>,
    pub message: Option<String>,
}

impl DispenseSession {
    /// A pending session with the client's advisory amount estimate.
    pub fn pending(
        machine_id: impl Into<String>,
        location: impl Into<String>,
        requested_liters: f64,
        price_per_liter_cents: i64,
    ) -> Self {
        Self {
            machine_id: machine_id.into(),
            location: location.into(),
            requested_liters,
            price_per_liter_cents,
            amount_cents: (requested_liters * price_per_liter_cents as f64).round() as i64,
            status: DispenseStatus::Pending,
            balance_before_cents: None,
            balance_after_cents: None,
            required_additional_cents: None,
            tx_id: None,
            flow_rate_lpm: None,
            message: None,
        }
    }
}

/// HTTP client for the dispense, wallet, and config endpoints.
pub struct DispenseClient {
    base_url: Url,
    client: reqwest::Client,
}

impl DispenseClient {
    pub fn new(base_url: Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DISPENSE_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, client }
    }

    /// Fetches the public price table.
    pub async fn fetch_config(&self) -> Result<DispenseConfigResponse> {
        let endpoint = self.base_url.join("/api/dispense/config")?;
        let config = self
            .client
            .get(endpoint)
            .send()
            .await
            .context("Dispense config request failed")?
            .json()
            .await
            .context("Malformed dispense config response")?;
        Ok(config)
    }

    /// Fetches the caller's prepaid balance.
    pub async fn fetch_wallet(&self, token: &str) -> Result<WalletResponse> {
        let endpoint = self.base_url.join("/api/me/wallet")?;
        let wallet = self
            .client
            .get(endpoint)
            .bearer_auth(token)
            .send()
            .await
            .context("Wallet request failed")?
            .json()
            .await
            .context("Malformed wallet response")?;
        Ok(wallet)
    }

    /// Executes exactly one dispense attempt.
    ///
    /// Never returns an error: transport failures and unexpected responses
    /// both land in a session with `status == Failed` and a displayable
    /// message.
    pub async fn dispense(
        &self,
        token: &str,
        machine_id: &str,
        location: &str,
        requested_liters: f64,
        price_per_liter_cents: i64,
    ) -> DispenseSession {
        let mut session = DispenseSession::pending(
            machine_id,
            location,
            requested_liters,
            price_per_liter_cents,
        );

        if !(requested_liters > 0.0) {
            session.status = DispenseStatus::Failed;
            session.message = Some("Requested liters must be greater than zero".to_string());
            return session;
        }

        let endpoint = match self.base_url.join("/api/dispense") {
            Ok(endpoint) => endpoint,
            Err(error) => {
                session.status = DispenseStatus::Failed;
                session.message = Some(error.to_string());
                return session;
            }
        };

        let request = DispenseRequest {
            liters: requested_liters,
            machine_id: machine_id.to_string(),
            location: Some(location.to_string()),
        };

        let response = match self
            .client
            .post(endpoint)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                session.status = DispenseStatus::Failed;
                session.message = Some(format!("Dispense request failed: {}", error));
                return session;
            }
        };

        let http_status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        apply_outcome(&mut session, http_status, &body);
        session
    }
}

/// Folds one HTTP response into the session. Server figures are
/// authoritative; the advisory amount is overwritten on every settled path.
fn apply_outcome(session: &mut DispenseSession, http_status: u16, body: &str) {
    if (200..300).contains(&http_status) {
        match serde_json::from_str::<DispenseSuccessResponse>(body) {
            Ok(success) => {
                session.status = DispenseStatus::Succeeded;
                session.amount_cents = success.amount_cents;
                session.balance_before_cents = Some(success.prev_balance_cents);
                session.balance_after_cents = Some(success.new_balance_cents);
                session.tx_id = Some(success.tx_id);
                session.flow_rate_lpm = success.flow_rate_lpm;
            }
            Err(error) => {
                session.status = DispenseStatus::Failed;
                session.message = Some(format!("Malformed dispense response: {}", error));
            }
        }
        return;
    }

    if http_status == 400 {
        if let Ok(shortfall) = serde_json::from_str::<InsufficientFundsBody>(body) {
            if shortfall.error == InsufficientFundsBody::MARKER {
                session.status = DispenseStatus::InsufficientFunds;
                session.amount_cents = shortfall.amount_cents;
                session.balance_before_cents = Some(shortfall.balance_cents);
                session.required_additional_cents =
                    Some(shortfall.amount_cents - shortfall.balance_cents);
                return;
            }
        }
    }

    session.status = DispenseStatus::Failed;
    session.message = Some(
        extract_error_message(body)
            .unwrap_or_else(|| "Dispensing failed, please try again".to_string()),
    );
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| value.get("error").and_then(|v| v.as_str()).map(str::to_string))
}
