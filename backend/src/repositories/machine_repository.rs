//! Database repository for vending machine records.

use crate::database::models::Machine;
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

pub struct MachineRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> MachineRepository<'a> {
    /// Creates a new MachineRepository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a freshly provisioned machine.
    pub async fn create_machine(
        &self,
        id: &str,
        location: &str,
        qr_secret: &str,
        flow_rate_lpm: f64,
    ) -> Result<Machine> {
        let machine = sqlx::query_as::<_, Machine>(
            r#"
            INSERT INTO machines (id, location, qr_secret, flow_rate_lpm, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, location, qr_secret, flow_rate_lpm, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(location)
        .bind(qr_secret)
        .bind(flow_rate_lpm)
        .bind(true)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(machine)
    }

    /// Retrieves a machine by its short id.
    pub async fn get_machine(&self, id: &str) -> Result<Option<Machine>> {
        let machine = sqlx::query_as::<_, Machine>(
            r#"
            SELECT id, location, qr_secret, flow_rate_lpm, is_active, created_at
            FROM machines WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(machine)
    }

    /// Marks a machine inactive (maintenance) without deleting its history.
    pub async fn set_active(&self, id: &str, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE machines SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
