//! SQLite storage for pending transactions
//!
//! Terminal transactions stay in the table with their final status; nothing
//! is ever deleted.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use quorum_core::AccountId;
use quorum_policy::sql::{decimal_col, enum_col, json_col, opt_ts_col, to_sql_int, ts_col, weight_col};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::AuthorizationResult;
use crate::pending::{PendingTransaction, TransactionStatus};

const COLUMNS: &str = "id, account_id, proposer, target, value, payload, payload_hash, status,
     created_at, expires_at, approved_at, executed_at, approvals_json, approved_weight,
     rejected_by, rejection_reason, execution_reference";

/// SQLite storage for pending transactions
pub struct TransactionStore {
    conn: Mutex<Connection>,
}

impl TransactionStore {
    /// Open (creating if needed) a store at the given database path
    pub fn open<P: AsRef<Path>>(path: P) -> AuthorizationResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> AuthorizationResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> AuthorizationResult<()> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                proposer TEXT NOT NULL,
                target TEXT NOT NULL,
                value TEXT NOT NULL,
                payload TEXT NOT NULL,
                payload_hash TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                approved_at TEXT,
                executed_at TEXT,
                approvals_json TEXT NOT NULL,
                approved_weight INTEGER NOT NULL,
                rejected_by TEXT,
                rejection_reason TEXT,
                execution_reference TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_account_status
                ON transactions(account_id, status);",
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite a transaction
    pub fn save(&self, tx: &PendingTransaction) -> AuthorizationResult<()> {
        let approvals_json = serde_json::to_string(&tx.approvals)?;

        self.conn().execute(
            &format!(
                "INSERT OR REPLACE INTO transactions ({})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                COLUMNS
            ),
            params![
                tx.id,
                tx.account_id.as_str(),
                tx.proposer.as_str(),
                tx.target,
                tx.value.to_string(),
                tx.payload,
                tx.payload_hash,
                tx.status.as_ref(),
                tx.created_at.to_rfc3339(),
                tx.expires_at.to_rfc3339(),
                tx.approved_at.map(|t| t.to_rfc3339()),
                tx.executed_at.map(|t| t.to_rfc3339()),
                approvals_json,
                to_sql_int(tx.approved_weight),
                tx.rejected_by.as_ref().map(|p| p.as_str()),
                tx.rejection_reason,
                tx.execution_reference,
            ],
        )?;

        Ok(())
    }

    /// Get a transaction by ID
    pub fn get(&self, id: &str) -> AuthorizationResult<Option<PendingTransaction>> {
        let tx = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM transactions WHERE id = ?1", COLUMNS),
                params![id],
                transaction_from_row,
            )
            .optional()?;
        Ok(tx)
    }

    /// Transactions of an account, newest first, optionally by status
    pub fn list(
        &self,
        account: &AccountId,
        status: Option<TransactionStatus>,
    ) -> AuthorizationResult<Vec<PendingTransaction>> {
        let conn = self.conn();
        let txs = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM transactions WHERE account_id = ?1 AND status = ?2
                     ORDER BY created_at DESC, id",
                    COLUMNS
                ))?;
                let rows = stmt.query_map(params![account.as_str(), status.as_ref()], transaction_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM transactions WHERE account_id = ?1 ORDER BY created_at DESC, id",
                    COLUMNS
                ))?;
                let rows = stmt.query_map(params![account.as_str()], transaction_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(txs)
    }

    /// Number of transactions ever proposed on an account
    pub fn count_for_account(&self, account: &AccountId) -> AuthorizationResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM transactions WHERE account_id = ?1",
            params![account.as_str()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Count an account's transactions by status
    pub fn count_by_status(&self, account: &AccountId, status: TransactionStatus) -> AuthorizationResult<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM transactions WHERE account_id = ?1 AND status = ?2",
            params![account.as_str(), status.as_ref()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<PendingTransaction> {
    Ok(PendingTransaction {
        id: row.get(0)?,
        account_id: AccountId::new(row.get::<_, String>(1)?),
        proposer: row.get::<_, String>(2)?.into(),
        target: row.get(3)?,
        value: decimal_col(row, 4)?,
        payload: row.get(5)?,
        payload_hash: row.get(6)?,
        status: enum_col(row, 7)?,
        created_at: ts_col(row, 8)?,
        expires_at: ts_col(row, 9)?,
        approved_at: opt_ts_col(row, 10)?,
        executed_at: opt_ts_col(row, 11)?,
        approvals: json_col(row, 12)?,
        approved_weight: weight_col(row, 13)?,
        rejected_by: row.get::<_, Option<String>>(14)?.map(Into::into),
        rejection_reason: row.get(15)?,
        execution_reference: row.get(16)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use quorum_core::{Approval, PrincipalId};
    use rust_decimal_macros::dec;

    fn pending(account: &str, nonce: u64) -> PendingTransaction {
        let now = Utc::now();
        PendingTransaction::new(
            AccountId::from(account),
            PrincipalId::from("A"),
            "bob".to_string(),
            dec!(1500.25),
            r#"{"memo":"invoice 7"}"#.to_string(),
            now,
            now + Duration::hours(24),
            nonce,
        )
    }

    #[test]
    fn test_store_save_and_get() {
        let store = TransactionStore::in_memory().unwrap();
        let mut tx = pending("ACC-1", 0);
        tx.approvals.insert(Approval {
            principal: PrincipalId::from("B"),
            weight: 150,
            approved_at: tx.created_at,
        });
        tx.approved_weight = 150;
        store.save(&tx).unwrap();

        let retrieved = store.get(&tx.id).unwrap().unwrap();
        assert_eq!(retrieved, tx);
        assert!(store.get("TX-missing").unwrap().is_none());
    }

    #[test]
    fn test_store_list_and_counts() {
        let store = TransactionStore::in_memory().unwrap();
        for i in 0..3 {
            store.save(&pending("ACC-1", i)).unwrap();
        }
        let mut rejected = pending("ACC-1", 3);
        rejected.status = TransactionStatus::Rejected;
        store.save(&rejected).unwrap();
        store.save(&pending("ACC-2", 0)).unwrap();

        let account = AccountId::from("ACC-1");
        assert_eq!(store.count_for_account(&account).unwrap(), 4);
        assert_eq!(store.list(&account, None).unwrap().len(), 4);
        assert_eq!(
            store.list(&account, Some(TransactionStatus::Pending)).unwrap().len(),
            3
        );
        assert_eq!(
            store.count_by_status(&account, TransactionStatus::Rejected).unwrap(),
            1
        );
    }
}
