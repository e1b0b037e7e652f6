//! SQLite storage for recovery requests and per-account execution times

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use quorum_core::{AccountId, Timestamp};
use quorum_policy::sql::{count_col, enum_col, json_col, opt_ts_col, to_sql_int, ts_col, weight_col};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::RecoveryResult;
use crate::request::{RecoveryRequest, RecoveryStatus};

const COLUMNS: &str = "id, account_id, proposed_new_owner, initiator, status, created_at,
     approved_at, executed_at, approvals_json, valid_approvals, approved_weight,
     rejected_by, rejection_reason, execution_reference, emergency";

/// SQLite storage for recovery requests
pub struct RecoveryStore {
    conn: Mutex<Connection>,
}

impl RecoveryStore {
    /// Open (creating if needed) a store at the given database path
    pub fn open<P: AsRef<Path>>(path: P) -> RecoveryResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> RecoveryResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> RecoveryResult<()> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS recovery_requests (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                proposed_new_owner TEXT NOT NULL,
                initiator TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                approved_at TEXT,
                executed_at TEXT,
                approvals_json TEXT NOT NULL,
                valid_approvals INTEGER NOT NULL,
                approved_weight INTEGER NOT NULL,
                rejected_by TEXT,
                rejection_reason TEXT,
                execution_reference TEXT,
                emergency INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_recovery_requests_account
                ON recovery_requests(account_id, status);

            CREATE TABLE IF NOT EXISTS account_executions (
                account_id TEXT PRIMARY KEY,
                last_execution_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite a request
    pub fn save(&self, request: &RecoveryRequest) -> RecoveryResult<()> {
        save_request(&self.conn(), request)
    }

    /// Save several requests in one transaction
    pub fn save_all(&self, requests: &[RecoveryRequest]) -> RecoveryResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for request in requests {
            save_request(&tx, request)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Save an executed request and start its account's cooldown, atomically
    pub fn record_execution(&self, request: &RecoveryRequest, at: Timestamp) -> RecoveryResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        save_request(&tx, request)?;
        tx.execute(
            "INSERT OR REPLACE INTO account_executions (account_id, last_execution_at)
             VALUES (?1, ?2)",
            params![request.account_id.as_str(), at.to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> RecoveryResult<Option<RecoveryRequest>> {
        let request = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM recovery_requests WHERE id = ?1", COLUMNS),
                params![id],
                request_from_row,
            )
            .optional()?;
        Ok(request)
    }

    /// Requests of an account, newest first, optionally by status
    pub fn list(&self, account: &AccountId, status: Option<RecoveryStatus>) -> RecoveryResult<Vec<RecoveryRequest>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM recovery_requests
             WHERE account_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC, id",
            COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![account.as_str(), status.map(|s| s.to_string())],
            request_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Number of requests ever created on an account
    pub fn count_for_account(&self, account: &AccountId) -> RecoveryResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM recovery_requests WHERE account_id = ?1",
            params![account.as_str()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// When a guardian-approved recovery last executed on the account
    pub fn last_execution_at(&self, account: &AccountId) -> RecoveryResult<Option<Timestamp>> {
        let at = self
            .conn()
            .query_row(
                "SELECT last_execution_at FROM account_executions WHERE account_id = ?1",
                params![account.as_str()],
                |row| ts_col(row, 0),
            )
            .optional()?;
        Ok(at)
    }
}

fn save_request(conn: &Connection, request: &RecoveryRequest) -> RecoveryResult<()> {
    let approvals_json = serde_json::to_string(&request.approvals)?;
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO recovery_requests ({})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            COLUMNS
        ),
        params![
            request.id,
            request.account_id.as_str(),
            request.proposed_new_owner.as_str(),
            request.initiator.as_str(),
            request.status.as_ref(),
            request.created_at.to_rfc3339(),
            request.approved_at.map(|t| t.to_rfc3339()),
            request.executed_at.map(|t| t.to_rfc3339()),
            approvals_json,
            request.valid_approvals,
            to_sql_int(request.approved_weight),
            request.rejected_by.as_ref().map(|p| p.as_str()),
            request.rejection_reason,
            request.execution_reference,
            request.emergency,
        ],
    )?;
    Ok(())
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<RecoveryRequest> {
    Ok(RecoveryRequest {
        id: row.get(0)?,
        account_id: AccountId::new(row.get::<_, String>(1)?),
        proposed_new_owner: row.get::<_, String>(2)?.into(),
        initiator: row.get::<_, String>(3)?.into(),
        status: enum_col(row, 4)?,
        created_at: ts_col(row, 5)?,
        approved_at: opt_ts_col(row, 6)?,
        executed_at: opt_ts_col(row, 7)?,
        approvals: json_col(row, 8)?,
        valid_approvals: count_col(row, 9)?,
        approved_weight: weight_col(row, 10)?,
        rejected_by: row.get::<_, Option<String>>(11)?.map(Into::into),
        rejection_reason: row.get(12)?,
        execution_reference: row.get(13)?,
        emergency: row.get(14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use quorum_core::{Approval, PrincipalId};
    use tempfile::tempdir;

    fn request(account: &str, nonce: u64) -> RecoveryRequest {
        RecoveryRequest::new(
            AccountId::from(account),
            PrincipalId::from("new-owner"),
            PrincipalId::from("G1"),
            Utc::now(),
            nonce,
        )
    }

    #[test]
    fn test_store_save_and_get() {
        let store = RecoveryStore::in_memory().unwrap();
        let mut r = request("ACC-1", 0);
        r.approvals.insert(Approval {
            principal: PrincipalId::from("G1"),
            weight: 100,
            approved_at: r.created_at,
        });
        r.valid_approvals = 1;
        r.approved_weight = 100;
        store.save(&r).unwrap();

        assert_eq!(store.get(&r.id).unwrap().unwrap(), r);
        assert!(store.get("RCV-missing").unwrap().is_none());
    }

    #[test]
    fn test_store_list_by_status() {
        let store = RecoveryStore::in_memory().unwrap();
        store.save(&request("ACC-1", 0)).unwrap();
        let mut rejected = request("ACC-1", 1);
        rejected.status = RecoveryStatus::Rejected;
        store.save(&rejected).unwrap();
        store.save(&request("ACC-2", 0)).unwrap();

        let account = AccountId::from("ACC-1");
        assert_eq!(store.list(&account, None).unwrap().len(), 2);
        let only_rejected = store.list(&account, Some(RecoveryStatus::Rejected)).unwrap();
        assert_eq!(only_rejected.len(), 1);
        assert_eq!(only_rejected[0].id, rejected.id);
        assert_eq!(store.count_for_account(&account).unwrap(), 2);
    }

    #[test]
    fn test_save_all() {
        let store = RecoveryStore::in_memory().unwrap();
        let mut first = request("ACC-1", 0);
        store.save(&first).unwrap();

        first.status = RecoveryStatus::Rejected;
        let second = request("ACC-1", 1);
        store.save_all(&[first.clone(), second.clone()]).unwrap();

        assert_eq!(store.get(&first.id).unwrap().unwrap().status, RecoveryStatus::Rejected);
        assert!(store.get(&second.id).unwrap().is_some());
    }

    #[test]
    fn test_record_execution_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recovery.db");
        let account = AccountId::from("ACC-1");
        let at = Utc::now() - Duration::minutes(5);

        {
            let store = RecoveryStore::open(&path).unwrap();
            assert!(store.last_execution_at(&account).unwrap().is_none());
            let mut r = request("ACC-1", 0);
            r.status = RecoveryStatus::Executed;
            r.executed_at = Some(at);
            store.record_execution(&r, at).unwrap();
        }

        let store = RecoveryStore::open(&path).unwrap();
        let last = store.last_execution_at(&account).unwrap().unwrap();
        assert_eq!(last.to_rfc3339(), at.to_rfc3339());
        assert_eq!(store.list(&account, Some(RecoveryStatus::Executed)).unwrap().len(), 1);
    }
}
