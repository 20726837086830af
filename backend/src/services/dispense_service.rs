//! Balance-checked dispensing: the core billing operation.
//!
//! A dispense debits the prepaid wallet and appends a ledger entry in one
//! SQLite transaction. The server-computed amount is authoritative; clients
//! may display their own estimate but never persist it. Insufficient funds is
//! an expected outcome, not an error.

use crate::config::Config;
use crate::database::models::{DispenseRecord, Machine};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::machine_repository::MachineRepository;
use chrono::Utc;
use sqlx::SqlitePool;

/// Result of one dispense attempt.
#[derive(Debug)]
pub enum DispenseOutcome {
    Completed {
        record: DispenseRecord,
        flow_rate_lpm: f64,
    },
    InsufficientFunds {
        amount_cents: i64,
        balance_cents: i64,
    },
}

pub struct DispenseService<'a> {
    pool: &'a SqlitePool,
    config: &'a Config,
}

impl<'a> DispenseService<'a> {
    pub fn new(pool: &'a SqlitePool, config: &'a Config) -> Self {
        Self { pool, config }
    }

    /// Executes one balance-checked dispense for `user_id`.
    pub async fn dispense(
        &self,
        user_id: &str,
        machine_id: &str,
        liters: f64,
    ) -> ServiceResult<DispenseOutcome> {
        if !liters.is_finite() || liters <= 0.0 {
            return Err(ServiceError::validation(
                "Requested liters must be greater than zero",
            ));
        }
        if liters > self.config.max_liters_per_dispense {
            return Err(ServiceError::invalid_operation(format!(
                "Requested liters exceed the {} liter limit",
                self.config.max_liters_per_dispense
            )));
        }

        let machine_repo = MachineRepository::new(self.pool);
        let machine: Machine = machine_repo
            .get_machine(machine_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Machine", machine_id))?;

        if !machine.is_active {
            return Err(ServiceError::invalid_operation(format!(
                "Machine {} is not currently dispensing",
                machine_id
            )));
        }

        let amount_cents = compute_amount_cents(liters, self.config.price_per_liter_cents);

        // Balance read, debit, and ledger append must be one atomic unit.
        let mut tx = self.pool.begin().await.map_err(anyhow::Error::from)?;

        let balance_cents: Option<i64> =
            sqlx::query_scalar("SELECT balance_cents FROM wallets WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(anyhow::Error::from)?;

        let balance_cents =
            balance_cents.ok_or_else(|| ServiceError::not_found("Wallet", user_id))?;

        if balance_cents < amount_cents {
            tracing::info!(
                "Dispense rejected for user {}: requires {} cents, balance {} cents",
                user_id,
                amount_cents,
                balance_cents
            );
            return Ok(DispenseOutcome::InsufficientFunds {
                amount_cents,
                balance_cents,
            });
        }

        let balance_after = balance_cents - amount_cents;
        let now = Utc::now();

        sqlx::query("UPDATE wallets SET balance_cents = ?, updated_at = ? WHERE user_id = ?")
            .bind(balance_after)
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(anyhow::Error::from)?;

        let tx_id = uuid::Uuid::now_v7().to_string();

        sqlx::query(
            r#"
            INSERT INTO dispense_records
                (id, user_id, machine_id, location, liters, amount_cents,
                 balance_before_cents, balance_after_cents, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tx_id)
        .bind(user_id)
        .bind(&machine.id)
        .bind(&machine.location)
        .bind(liters)
        .bind(amount_cents)
        .bind(balance_cents)
        .bind(balance_after)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(anyhow::Error::from)?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        tracing::info!(
            "Dispense {} settled: user {} machine {} {} L for {} cents",
            tx_id,
            user_id,
            machine.id,
            liters,
            amount_cents
        );

        Ok(DispenseOutcome::Completed {
            record: DispenseRecord {
                id: tx_id,
                user_id: user_id.to_string(),
                machine_id: machine.id,
                location: machine.location,
                liters,
                amount_cents,
                balance_before_cents: balance_cents,
                balance_after_cents: balance_after,
                created_at: now,
            },
            flow_rate_lpm: machine.flow_rate_lpm,
        })
    }
}

/// Server-side price computation, rounded to whole cents.
pub fn compute_amount_cents(liters: f64, price_per_liter_cents: i64) -> i64 {
    (liters * price_per_liter_cents as f64).round() as i64
}

/// Dispensed liters and completion percentage after `elapsed_seconds` of flow.
pub fn progress_at(total_liters: f64, flow_rate_lpm: f64, elapsed_seconds: f64) -> (f64, f64) {
    let flow_lps = flow_rate_lpm / 60.0;
    let dispensed = (elapsed_seconds.max(0.0) * flow_lps).min(total_liters);
    let percent = if total_liters > 0.0 {
        (dispensed / total_liters * 100.0).min(100.0)
    } else {
        100.0
    };
    (dispensed, percent)
}
