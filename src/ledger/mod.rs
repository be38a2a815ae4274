use crate::db::Database;
use crate::errors::LinkshieldError;
use crate::models::{Reservation, Transaction, TransactionType, Wallet};

/// The credit ledger: per-user balances with an append-only transaction
/// history. Reservations hold credit for one in-flight scan and are
/// always settled or refunded when the job reaches a terminal state.
///
/// The wallet balance column is canonical; history is stored for audit
/// and replays to the balance, but is never summed at read time.
#[derive(Clone)]
pub struct WalletLedger {
    db: Database,
}

impl WalletLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Hold `amount` credits for the given job. Fails with
    /// `InsufficientCredit` before any state changes when the balance
    /// is short.
    pub fn reserve(&self, user_id: &str, amount: i64, job_id: &str) -> Result<Reservation, LinkshieldError> {
        self.db.reserve_credits(user_id, amount, job_id)
    }

    /// Permanently consume a held reservation. Idempotent: settling a
    /// settled reservation is a no-op.
    pub fn settle(&self, reservation_id: &str) -> Result<(), LinkshieldError> {
        self.db.settle_reservation(reservation_id)
    }

    /// Return the held amount to the wallet. Idempotent on repeat;
    /// fails with `AlreadySettled` if the reservation was consumed.
    pub fn refund(&self, reservation_id: &str) -> Result<Option<Transaction>, LinkshieldError> {
        self.db.refund_reservation(reservation_id)
    }

    /// Add credits (confirmed purchase or manual adjustment).
    pub fn credit(
        &self,
        user_id: &str,
        amount: i64,
        transaction_type: TransactionType,
        description: Option<&str>,
        purchase_id: Option<&str>,
    ) -> Result<Transaction, LinkshieldError> {
        self.db.credit_wallet(user_id, amount, transaction_type, description, purchase_id)
    }

    pub fn balance(&self, user_id: &str) -> Result<i64, LinkshieldError> {
        self.db.get_balance(user_id)
    }

    pub fn wallet(&self, user_id: &str) -> Result<Option<Wallet>, LinkshieldError> {
        self.db.get_wallet(user_id)
    }

    pub fn transactions(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>, LinkshieldError> {
        self.db.list_transactions(user_id, limit, offset)
    }
}
