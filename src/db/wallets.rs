use chrono::Utc;
use rusqlite::TransactionBehavior;

use super::{parse_timestamp, Database};
use crate::errors::LinkshieldError;
use crate::models::{Reservation, ReservationStatus, Transaction, TransactionType, Wallet};

impl Database {
    pub fn get_wallet(&self, user_id: &str) -> Result<Option<Wallet>, LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT user_id, credit_balance, created_at, updated_at FROM wallets WHERE user_id = ?1")
            .map_err(|e| LinkshieldError::Database(format!("Query failed: {}", e)))?;

        let result = stmt.query_row(rusqlite::params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        });
        match result {
            Ok((user_id, balance, created, updated)) => Ok(Some(Wallet {
                user_id,
                credit_balance: balance,
                created_at: parse_timestamp(&created)?,
                updated_at: parse_timestamp(&updated)?,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(LinkshieldError::Database(format!("Query error: {}", e))),
        }
    }

    /// Current balance; a user without a wallet row has balance 0.
    pub fn get_balance(&self, user_id: &str) -> Result<i64, LinkshieldError> {
        Ok(self.get_wallet(user_id)?.map(|w| w.credit_balance).unwrap_or(0))
    }

    /// Atomically hold `amount` credits for one job: read the balance,
    /// reject if short, decrement, append a `scan` transaction with the
    /// negative amount, and insert the pending reservation. All one
    /// sqlite transaction; no concurrent reserve/credit on the same
    /// user observes an intermediate state.
    pub fn reserve_credits(
        &self,
        user_id: &str,
        amount: i64,
        job_id: &str,
    ) -> Result<Reservation, LinkshieldError> {
        if amount <= 0 {
            return Err(LinkshieldError::Validation(format!(
                "reservation amount must be positive, got {}",
                amount
            )));
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| LinkshieldError::Database(format!("Transaction failed: {}", e)))?;
        let now = Utc::now();

        let balance: i64 = match tx.query_row(
            "SELECT credit_balance FROM wallets WHERE user_id = ?1",
            rusqlite::params![user_id],
            |row| row.get(0),
        ) {
            Ok(b) => b,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                tx.execute(
                    "INSERT INTO wallets (user_id, credit_balance, created_at, updated_at) VALUES (?1, 0, ?2, ?2)",
                    rusqlite::params![user_id, now.to_rfc3339()],
                )
                .map_err(|e| LinkshieldError::Database(format!("Insert failed: {}", e)))?;
                0
            }
            Err(e) => return Err(LinkshieldError::Database(format!("Query error: {}", e))),
        };

        if balance < amount {
            return Err(LinkshieldError::InsufficientCredit {
                required: amount,
                available: balance,
            });
        }

        let balance_after = balance - amount;
        tx.execute(
            "UPDATE wallets SET credit_balance = ?2, updated_at = ?3 WHERE user_id = ?1",
            rusqlite::params![user_id, balance_after, now.to_rfc3339()],
        )
        .map_err(|e| LinkshieldError::Database(format!("Update failed: {}", e)))?;

        tx.execute(
            "INSERT INTO transactions (id, user_id, amount, type, job_id, balance_after, description, created_at)
             VALUES (?1, ?2, ?3, 'scan', ?4, ?5, ?6, ?7)",
            rusqlite::params![
                uuid::Uuid::new_v4().to_string(),
                user_id,
                -amount,
                job_id,
                balance_after,
                format!("Credit hold for scan {}", job_id),
                now.to_rfc3339()
            ],
        )
        .map_err(|e| LinkshieldError::Database(format!("Insert failed: {}", e)))?;

        let reservation_id = uuid::Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO reservations (id, user_id, amount, job_id, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)",
            rusqlite::params![reservation_id, user_id, amount, job_id, now.to_rfc3339()],
        )
        .map_err(|e| LinkshieldError::Database(format!("Insert failed: {}", e)))?;

        tx.commit()
            .map_err(|e| LinkshieldError::Database(format!("Commit failed: {}", e)))?;

        Ok(Reservation {
            id: reservation_id,
            user_id: user_id.to_string(),
            amount,
            job_id: job_id.to_string(),
            status: ReservationStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Consume a pending hold permanently. Settling an already settled
    /// reservation is a no-op; settling a refunded one fails.
    pub fn settle_reservation(&self, reservation_id: &str) -> Result<(), LinkshieldError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| LinkshieldError::Database(format!("Transaction failed: {}", e)))?;

        let status: String = match tx.query_row(
            "SELECT status FROM reservations WHERE id = ?1",
            rusqlite::params![reservation_id],
            |row| row.get(0),
        ) {
            Ok(s) => s,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(LinkshieldError::NotFound(format!("reservation {}", reservation_id)))
            }
            Err(e) => return Err(LinkshieldError::Database(format!("Query error: {}", e))),
        };

        match status.as_str() {
            "settled" => return Ok(()),
            "refunded" => {
                return Err(LinkshieldError::AlreadySettled(format!(
                    "reservation {} was refunded",
                    reservation_id
                )))
            }
            _ => {}
        }

        tx.execute(
            "UPDATE reservations SET status = 'settled', updated_at = ?2 WHERE id = ?1",
            rusqlite::params![reservation_id, Utc::now().to_rfc3339()],
        )
        .map_err(|e| LinkshieldError::Database(format!("Update failed: {}", e)))?;

        tx.commit()
            .map_err(|e| LinkshieldError::Database(format!("Commit failed: {}", e)))
    }

    /// Reverse a pending hold: restore the exact reserved amount and
    /// append a `refund` transaction. A repeated refund is a no-op
    /// (returns None); refunding a settled reservation fails.
    pub fn refund_reservation(
        &self,
        reservation_id: &str,
    ) -> Result<Option<Transaction>, LinkshieldError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| LinkshieldError::Database(format!("Transaction failed: {}", e)))?;
        let now = Utc::now();

        let (status, user_id, amount, job_id): (String, String, i64, String) = match tx.query_row(
            "SELECT status, user_id, amount, job_id FROM reservations WHERE id = ?1",
            rusqlite::params![reservation_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        ) {
            Ok(r) => r,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(LinkshieldError::NotFound(format!("reservation {}", reservation_id)))
            }
            Err(e) => return Err(LinkshieldError::Database(format!("Query error: {}", e))),
        };

        match status.as_str() {
            "refunded" => return Ok(None),
            "settled" => {
                return Err(LinkshieldError::AlreadySettled(format!(
                    "reservation {} was settled",
                    reservation_id
                )))
            }
            _ => {}
        }

        let balance: i64 = tx
            .query_row(
                "SELECT credit_balance FROM wallets WHERE user_id = ?1",
                rusqlite::params![user_id],
                |row| row.get(0),
            )
            .map_err(|e| LinkshieldError::Database(format!("Query error: {}", e)))?;
        let balance_after = balance + amount;

        tx.execute(
            "UPDATE wallets SET credit_balance = ?2, updated_at = ?3 WHERE user_id = ?1",
            rusqlite::params![user_id, balance_after, now.to_rfc3339()],
        )
        .map_err(|e| LinkshieldError::Database(format!("Update failed: {}", e)))?;

        let txn_id = uuid::Uuid::new_v4().to_string();
        let description = format!("Refund for scan {}", job_id);
        tx.execute(
            "INSERT INTO transactions (id, user_id, amount, type, job_id, balance_after, description, created_at)
             VALUES (?1, ?2, ?3, 'refund', ?4, ?5, ?6, ?7)",
            rusqlite::params![txn_id, user_id, amount, job_id, balance_after, description, now.to_rfc3339()],
        )
        .map_err(|e| LinkshieldError::Database(format!("Insert failed: {}", e)))?;

        tx.execute(
            "UPDATE reservations SET status = 'refunded', updated_at = ?2 WHERE id = ?1",
            rusqlite::params![reservation_id, now.to_rfc3339()],
        )
        .map_err(|e| LinkshieldError::Database(format!("Update failed: {}", e)))?;

        tx.commit()
            .map_err(|e| LinkshieldError::Database(format!("Commit failed: {}", e)))?;

        Ok(Some(Transaction {
            id: txn_id,
            user_id,
            amount,
            transaction_type: TransactionType::Refund,
            job_id: Some(job_id),
            purchase_id: None,
            balance_after,
            description: Some(description),
            created_at: now,
        }))
    }

    /// Add credits to a wallet (purchase settlement or manual
    /// adjustment), creating the wallet row if needed.
    pub fn credit_wallet(
        &self,
        user_id: &str,
        amount: i64,
        transaction_type: TransactionType,
        description: Option<&str>,
        purchase_id: Option<&str>,
    ) -> Result<Transaction, LinkshieldError> {
        if amount <= 0 {
            return Err(LinkshieldError::Validation(format!(
                "credit amount must be positive, got {}",
                amount
            )));
        }
        if !matches!(transaction_type, TransactionType::Purchase | TransactionType::Adjustment) {
            return Err(LinkshieldError::Validation(format!(
                "credit type must be purchase or adjustment, got {}",
                transaction_type.as_str()
            )));
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| LinkshieldError::Database(format!("Transaction failed: {}", e)))?;
        let now = Utc::now();

        let balance: i64 = match tx.query_row(
            "SELECT credit_balance FROM wallets WHERE user_id = ?1",
            rusqlite::params![user_id],
            |row| row.get(0),
        ) {
            Ok(b) => b,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                tx.execute(
                    "INSERT INTO wallets (user_id, credit_balance, created_at, updated_at) VALUES (?1, 0, ?2, ?2)",
                    rusqlite::params![user_id, now.to_rfc3339()],
                )
                .map_err(|e| LinkshieldError::Database(format!("Insert failed: {}", e)))?;
                0
            }
            Err(e) => return Err(LinkshieldError::Database(format!("Query error: {}", e))),
        };

        let balance_after = balance + amount;
        tx.execute(
            "UPDATE wallets SET credit_balance = ?2, updated_at = ?3 WHERE user_id = ?1",
            rusqlite::params![user_id, balance_after, now.to_rfc3339()],
        )
        .map_err(|e| LinkshieldError::Database(format!("Update failed: {}", e)))?;

        let txn_id = uuid::Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO transactions (id, user_id, amount, type, purchase_id, balance_after, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                txn_id,
                user_id,
                amount,
                transaction_type.as_str(),
                purchase_id,
                balance_after,
                description,
                now.to_rfc3339()
            ],
        )
        .map_err(|e| LinkshieldError::Database(format!("Insert failed: {}", e)))?;

        tx.commit()
            .map_err(|e| LinkshieldError::Database(format!("Commit failed: {}", e)))?;

        Ok(Transaction {
            id: txn_id,
            user_id: user_id.to_string(),
            amount,
            transaction_type,
            job_id: None,
            purchase_id: purchase_id.map(|s| s.to_string()),
            balance_after,
            description: description.map(|s| s.to_string()),
            created_at: now,
        })
    }

    pub fn get_reservation(&self, id: &str) -> Result<Option<Reservation>, LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, user_id, amount, job_id, status, created_at, updated_at FROM reservations WHERE id = ?1")
            .map_err(|e| LinkshieldError::Database(format!("Query failed: {}", e)))?;

        let result = stmt.query_row(rusqlite::params![id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        });
        match result {
            Ok((id, user_id, amount, job_id, status, created, updated)) => Ok(Some(Reservation {
                id,
                user_id,
                amount,
                job_id,
                status: ReservationStatus::parse(&status)
                    .ok_or_else(|| LinkshieldError::Database(format!("Unknown reservation status '{}'", status)))?,
                created_at: parse_timestamp(&created)?,
                updated_at: parse_timestamp(&updated)?,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(LinkshieldError::Database(format!("Query error: {}", e))),
        }
    }

    /// Transaction history for a user, oldest first.
    pub fn list_transactions(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>, LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, amount, type, job_id, purchase_id, balance_after, description, created_at
                 FROM transactions WHERE user_id = ?1 ORDER BY created_at ASC, rowid ASC LIMIT ?2 OFFSET ?3",
            )
            .map_err(|e| LinkshieldError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt
            .query_map(
                rusqlite::params![user_id, limit as i64, offset as i64],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .map_err(|e| LinkshieldError::Database(format!("Query error: {}", e)))?;

        let mut transactions = Vec::new();
        for row in rows {
            let (id, user_id, amount, type_str, job_id, purchase_id, balance_after, description, created) =
                row.map_err(|e| LinkshieldError::Database(format!("Row error: {}", e)))?;
            transactions.push(Transaction {
                id,
                user_id,
                amount,
                transaction_type: TransactionType::parse(&type_str).ok_or_else(|| {
                    LinkshieldError::Database(format!("Unknown transaction type '{}'", type_str))
                })?,
                job_id,
                purchase_id,
                balance_after,
                description,
                created_at: parse_timestamp(&created)?,
            });
        }
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded_db(user: &str, credits: i64) -> Database {
        let db = Database::in_memory().unwrap();
        db.credit_wallet(user, credits, TransactionType::Purchase, Some("starter pack"), None)
            .unwrap();
        db
    }

    #[test]
    fn test_credit_creates_wallet() {
        let db = Database::in_memory().unwrap();
        let txn = db
            .credit_wallet("alice", 10, TransactionType::Purchase, None, Some("purchase-1"))
            .unwrap();
        assert_eq!(txn.amount, 10);
        assert_eq!(txn.balance_after, 10);
        assert_eq!(txn.purchase_id.as_deref(), Some("purchase-1"));
        assert_eq!(db.get_balance("alice").unwrap(), 10);
    }

    #[test]
    fn test_credit_rejects_non_positive() {
        let db = Database::in_memory().unwrap();
        assert!(db
            .credit_wallet("alice", 0, TransactionType::Purchase, None, None)
            .is_err());
        assert!(db
            .credit_wallet("alice", -5, TransactionType::Purchase, None, None)
            .is_err());
    }

    #[test]
    fn test_credit_rejects_scan_type() {
        let db = Database::in_memory().unwrap();
        assert!(db
            .credit_wallet("alice", 5, TransactionType::Scan, None, None)
            .is_err());
    }

    #[test]
    fn test_reserve_decrements_and_records() {
        let db = funded_db("alice", 3);
        let res = db.reserve_credits("alice", 1, "job-1").unwrap();
        assert_eq!(res.amount, 1);
        assert_eq!(res.status, ReservationStatus::Pending);
        assert_eq!(db.get_balance("alice").unwrap(), 2);

        let history = db.list_transactions("alice", 10, 0).unwrap();
        assert_eq!(history.len(), 2);
        let scan_txn = &history[1];
        assert_eq!(scan_txn.transaction_type, TransactionType::Scan);
        assert_eq!(scan_txn.amount, -1);
        assert_eq!(scan_txn.balance_after, 2);
        assert_eq!(scan_txn.job_id.as_deref(), Some("job-1"));
    }

    #[test]
    fn test_reserve_insufficient_credit() {
        let db = Database::in_memory().unwrap();
        let err = db.reserve_credits("broke", 1, "job-1").unwrap_err();
        assert!(matches!(
            err,
            LinkshieldError::InsufficientCredit { required: 1, available: 0 }
        ));
        // No partial state: no transaction was recorded
        assert!(db.list_transactions("broke", 10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_balance_never_negative() {
        let db = funded_db("alice", 1);
        db.reserve_credits("alice", 1, "job-1").unwrap();
        let err = db.reserve_credits("alice", 1, "job-2").unwrap_err();
        assert!(matches!(err, LinkshieldError::InsufficientCredit { .. }));
        assert_eq!(db.get_balance("alice").unwrap(), 0);
    }

    #[test]
    fn test_settle_is_idempotent() {
        let db = funded_db("alice", 2);
        let res = db.reserve_credits("alice", 1, "job-1").unwrap();
        db.settle_reservation(&res.id).unwrap();
        db.settle_reservation(&res.id).unwrap();
        assert_eq!(db.get_balance("alice").unwrap(), 1);
        let loaded = db.get_reservation(&res.id).unwrap().unwrap();
        assert_eq!(loaded.status, ReservationStatus::Settled);
    }

    #[test]
    fn test_refund_restores_exact_amount() {
        let db = funded_db("alice", 2);
        let res = db.reserve_credits("alice", 1, "job-1").unwrap();
        assert_eq!(db.get_balance("alice").unwrap(), 1);

        let txn = db.refund_reservation(&res.id).unwrap().unwrap();
        assert_eq!(txn.amount, 1);
        assert_eq!(txn.transaction_type, TransactionType::Refund);
        assert_eq!(txn.balance_after, 2);
        assert_eq!(db.get_balance("alice").unwrap(), 2);
    }

    #[test]
    fn test_refund_twice_changes_balance_once() {
        let db = funded_db("alice", 2);
        let res = db.reserve_credits("alice", 1, "job-1").unwrap();
        assert!(db.refund_reservation(&res.id).unwrap().is_some());
        assert!(db.refund_reservation(&res.id).unwrap().is_none());
        assert_eq!(db.get_balance("alice").unwrap(), 2);
    }

    #[test]
    fn test_refund_after_settle_rejected() {
        let db = funded_db("alice", 2);
        let res = db.reserve_credits("alice", 1, "job-1").unwrap();
        db.settle_reservation(&res.id).unwrap();
        let err = db.refund_reservation(&res.id).unwrap_err();
        assert!(matches!(err, LinkshieldError::AlreadySettled(_)));
        assert_eq!(db.get_balance("alice").unwrap(), 1);
    }

    #[test]
    fn test_settle_after_refund_rejected() {
        let db = funded_db("alice", 2);
        let res = db.reserve_credits("alice", 1, "job-1").unwrap();
        db.refund_reservation(&res.id).unwrap();
        let err = db.settle_reservation(&res.id).unwrap_err();
        assert!(matches!(err, LinkshieldError::AlreadySettled(_)));
    }

    #[test]
    fn test_settle_unknown_reservation() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.settle_reservation("ghost").unwrap_err(),
            LinkshieldError::NotFound(_)
        ));
    }

    #[test]
    fn test_history_replays_to_balance() {
        let db = funded_db("alice", 5);
        let r1 = db.reserve_credits("alice", 1, "job-1").unwrap();
        let r2 = db.reserve_credits("alice", 1, "job-2").unwrap();
        db.settle_reservation(&r1.id).unwrap();
        db.refund_reservation(&r2.id).unwrap();
        db.credit_wallet("alice", 3, TransactionType::Adjustment, Some("goodwill"), None)
            .unwrap();

        let history = db.list_transactions("alice", 100, 0).unwrap();
        let replayed: i64 = history.iter().map(|t| t.amount).sum();
        assert_eq!(replayed, db.get_balance("alice").unwrap());

        // Each entry's balance_after chains from the previous one
        let mut running = 0;
        for txn in &history {
            running += txn.amount;
            assert_eq!(txn.balance_after, running);
            assert!(txn.balance_after >= 0);
        }
    }

    #[test]
    fn test_wallets_are_independent() {
        let db = funded_db("alice", 2);
        db.credit_wallet("bob", 7, TransactionType::Purchase, None, None).unwrap();
        db.reserve_credits("alice", 1, "job-1").unwrap();
        assert_eq!(db.get_balance("alice").unwrap(), 1);
        assert_eq!(db.get_balance("bob").unwrap(), 7);
    }
}
