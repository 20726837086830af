//! Wallet business logic: balance reads and top-up credits.
//!
//! Real payment capture happens in the hosted payment provider; this service
//! only maintains the prepaid ledger the dispense flow debits against.

use crate::database::models::Wallet;
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::wallet_repository::WalletRepository;
use sqlx::SqlitePool;

/// Upper bound on a single top-up credit, in cents.
const MAX_TOPUP_CENTS: i64 = 500_000;

pub struct WalletService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> WalletService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Retrieves a user's wallet or fails with NotFound.
    pub async fn get_wallet_required(&self, user_id: &str) -> ServiceResult<Wallet> {
        let repo = WalletRepository::new(self.pool);
        let wallet = repo
            .get_wallet(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Wallet", user_id))?;
        Ok(wallet)
    }

    /// Credits a wallet after a captured payment.
    pub async fn top_up(&self, user_id: &str, amount_cents: i64) -> ServiceResult<Wallet> {
        if amount_cents <= 0 {
            return Err(ServiceError::validation(
                "Top-up amount must be greater than zero",
            ));
        }
        if amount_cents > MAX_TOPUP_CENTS {
            return Err(ServiceError::invalid_operation(format!(
                "Top-up amount exceeds the {} cent limit",
                MAX_TOPUP_CENTS
            )));
        }

        let repo = WalletRepository::new(self.pool);
        let wallet = repo
            .credit(user_id, amount_cents)
            .await?
            .ok_or_else(|| ServiceError::not_found("Wallet", user_id))?;

        tracing::info!(
            "Credited {} cents to wallet of user {}, new balance {}",
            amount_cents,
            user_id,
            wallet.balance_cents
        );

        Ok(wallet)
    }
}
