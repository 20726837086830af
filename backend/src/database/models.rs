//! Persistent entity models and request DTOs.
//!
//! These structs mirror the SQLite schema (users, wallets, machines, dispense
//! ledger) and carry the validated request payloads used to create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A registered kiosk user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Prepaid balance attached to a user, integer cents.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub user_id: String,
    pub balance_cents: i64,
    pub updated_at: DateTime<Utc>,
}

/// A provisioned water vending machine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Machine {
    pub id: String,
    pub location: String,
    #[serde(skip_serializing)]
    pub qr_secret: String,
    pub flow_rate_lpm: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// One settled dispense: the authoritative ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DispenseRecord {
    pub id: String,
    pub user_id: String,
    pub machine_id: String,
    pub location: String,
    pub liters: f64,
    pub amount_cents: i64,
    pub balance_before_cents: i64,
    pub balance_after_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Registration payload for a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters"))]
    pub username: String,

    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Internal creation DTO with the password already hashed.
#[derive(Debug)]
pub struct CreateUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Provisioning payload for a new machine.
#[derive(Debug, Deserialize, Validate)]
pub struct ProvisionMachineRequest {
    #[validate(length(min = 1, max = 120, message = "Location is required"))]
    pub location: String,

    /// Liters per minute; falls back to the configured default when absent.
    #[validate(range(min = 0.1, max = 60.0, message = "Flow rate must be 0.1-60 L/min"))]
    pub flow_rate_lpm: Option<f64>,
}
