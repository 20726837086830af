//! Database repository for prepaid wallet balances.
//!
//! Balance mutations for dispensing happen inside the dispense service's
//! transaction; this repository covers reads and top-up credits.

use crate::database::models::Wallet;
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

pub struct WalletRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> WalletRepository<'a> {
    /// Creates a new WalletRepository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a zero-balance wallet for a freshly registered user.
    pub async fn create_wallet(&self, user_id: &str) -> Result<Wallet> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (user_id, balance_cents, updated_at)
            VALUES (?, 0, ?)
            RETURNING user_id, balance_cents, updated_at
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(wallet)
    }

    /// Retrieves a user's wallet.
    pub async fn get_wallet(&self, user_id: &str) -> Result<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(
            "SELECT user_id, balance_cents, updated_at FROM wallets WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(wallet)
    }

    /// Credits a wallet and returns the updated row.
    pub async fn credit(&self, user_id: &str, amount_cents: i64) -> Result<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            UPDATE wallets
            SET balance_cents = balance_cents + ?, updated_at = ?
            WHERE user_id = ?
            RETURNING user_id, balance_cents, updated_at
            "#,
        )
        .bind(amount_cents)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(wallet)
    }
}
