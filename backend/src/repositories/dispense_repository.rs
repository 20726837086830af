//! Database repository for the dispense ledger.
//!
//! Ledger inserts happen inside the dispense service's transaction; reads for
//! history and progress streaming live here.

use crate::api::common::PaginationFilter;
use crate::database::models::DispenseRecord;
use anyhow::Result;
use sqlx::SqlitePool;

pub struct DispenseRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> DispenseRepository<'a> {
    /// Creates a new DispenseRepository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Retrieves a single ledger entry by transaction id.
    pub async fn get_record(&self, id: &str) -> Result<Option<DispenseRecord>> {
        let record = sqlx::query_as::<_, DispenseRecord>(
            r#"
            SELECT id, user_id, machine_id, location, liters, amount_cents,
                   balance_before_cents, balance_after_cents, created_at
            FROM dispense_records WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Retrieves a user's dispense history, newest first.
    pub async fn get_records_by_user_id(
        &self,
        user_id: &str,
        pagination: &PaginationFilter,
    ) -> Result<Vec<DispenseRecord>> {
        let limit = pagination.limit() as i64;
        let offset = pagination.offset() as i64;

        let records = sqlx::query_as::<_, DispenseRecord>(
            r#"
            SELECT id, user_id, machine_id, location, liters, amount_cents,
                   balance_before_cents, balance_after_cents, created_at
            FROM dispense_records
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    /// Get total count of ledger entries for a user
    pub async fn get_records_count_by_user_id(&self, user_id: &str) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM dispense_records WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;

        Ok(count as u64)
    }
}
