//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, server port, JWT secrets, QR signature policy, and the
//! dispensing price table.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expires_in_seconds: u64,
    pub server_port: u16,
    /// Maximum accepted age of a `ts`-stamped QR payload, in seconds.
    pub qr_max_age_seconds: i64,
    pub price_per_liter_cents: i64,
    /// Quick-select quantities offered to kiosk clients.
    pub allowed_liters: Vec<f64>,
    pub max_liters_per_dispense: f64,
    /// Flow rate assigned to newly provisioned machines, liters per minute.
    pub default_flow_rate_lpm: f64,
    /// Origin of the kiosk web client; printed QR payloads resolve against it.
    pub app_origin: String,
    /// Hosted sign-in entry point; receives a `return_url` query parameter.
    pub sign_in_url: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;

        let jwt_expires_in_seconds = env::var("JWT_EXPIRES_IN_SECONDS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse::<u64>()
            .context("JWT_EXPIRES_IN_SECONDS must be a valid number")?;

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid number")?;

        let qr_max_age_seconds = env::var("QR_MAX_AGE_SECONDS")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<i64>()
            .context("QR_MAX_AGE_SECONDS must be a valid number")?;

        let price_per_liter_cents = env::var("PRICE_PER_LITER_CENTS")
            .unwrap_or_else(|_| "175".to_string())
            .parse::<i64>()
            .context("PRICE_PER_LITER_CENTS must be a valid number")?;

        let allowed_liters = Self::parse_liters_list(
            &env::var("ALLOWED_LITERS").unwrap_or_else(|_| "1,5,10,20".to_string()),
        )?;

        let max_liters_per_dispense = env::var("MAX_LITERS_PER_DISPENSE")
            .unwrap_or_else(|_| "50".to_string())
            .parse::<f64>()
            .context("MAX_LITERS_PER_DISPENSE must be a valid number")?;

        let default_flow_rate_lpm = env::var("DEFAULT_FLOW_RATE_LPM")
            .unwrap_or_else(|_| "2.0".to_string())
            .parse::<f64>()
            .context("DEFAULT_FLOW_RATE_LPM must be a valid number")?;

        let app_origin =
            env::var("APP_ORIGIN").unwrap_or_else(|_| "https://kiosk.aquapoint.example".to_string());

        let sign_in_url = env::var("SIGN_IN_URL")
            .unwrap_or_else(|_| "https://auth.aquapoint.example/sign-in".to_string());

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            jwt_secret,
            jwt_expires_in_seconds,
            server_port,
            qr_max_age_seconds,
            price_per_liter_cents,
            allowed_liters,
            max_liters_per_dispense,
            default_flow_rate_lpm,
            app_origin,
            sign_in_url,
        })
    }

    fn parse_liters_list(raw: &str) -> Result<Vec<f64>> {
        raw.split(',')
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<f64>()
                    .with_context(|| format!("ALLOWED_LITERS entry '{}' is not a number", part))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_liters_list() {
        let liters = Config::parse_liters_list("1, 5,10,20").unwrap();
        assert_eq!(liters, vec![1.0, 5.0, 10.0, 20.0]);
    }

    #[test]
    fn rejects_non_numeric_liters() {
        assert!(Config::parse_liters_list("1,abc").is_err());
    }
}
