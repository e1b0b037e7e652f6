//! SQLite storage for sanction lists and assessment history
//!
//! The engine keeps both in memory for screening and writes every change
//! here first, then loads them back when it starts.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use quorum_policy::sql::{json_col, to_sql_int, ts_col};
use rusqlite::{params, Connection};

use crate::assessment::RiskAssessment;
use crate::error::ComplianceResult;
use crate::sanctions::SanctionList;

/// SQLite storage for compliance state
pub struct ComplianceStore {
    conn: Mutex<Connection>,
}

impl ComplianceStore {
    /// Open (creating if needed) a store at the given database path
    pub fn open<P: AsRef<Path>>(path: P) -> ComplianceResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> ComplianceResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> ComplianceResult<()> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS sanction_lists (
                name TEXT PRIMARY KEY,
                active INTEGER NOT NULL,
                entries_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS risk_assessments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                principal_id TEXT NOT NULL,
                checked_at TEXT NOT NULL,
                assessment_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_risk_assessments_principal
                ON risk_assessments(principal_id, id);",
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a whole list
    pub fn save_list(&self, list: &SanctionList) -> ComplianceResult<()> {
        let entries_json = serde_json::to_string(&list.entries)?;
        self.conn().execute(
            "INSERT OR REPLACE INTO sanction_lists (name, active, entries_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![list.name, list.active, entries_json, list.updated_at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load_lists(&self) -> ComplianceResult<Vec<SanctionList>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name, active, entries_json, updated_at FROM sanction_lists ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SanctionList {
                name: row.get(0)?,
                active: row.get(1)?,
                entries: json_col(row, 2)?,
                updated_at: ts_col(row, 3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Append an assessment, keeping only the newest `keep` per principal
    pub fn record_assessment(&self, assessment: &RiskAssessment, keep: usize) -> ComplianceResult<()> {
        let assessment_json = serde_json::to_string(assessment)?;
        let principal = assessment.principal_id.as_str();

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO risk_assessments (principal_id, checked_at, assessment_json)
             VALUES (?1, ?2, ?3)",
            params![principal, assessment.checked_at.to_rfc3339(), assessment_json],
        )?;
        tx.execute(
            "DELETE FROM risk_assessments
             WHERE principal_id = ?1 AND id NOT IN (
                SELECT id FROM risk_assessments WHERE principal_id = ?1
                ORDER BY id DESC LIMIT ?2
             )",
            params![principal, to_sql_int(keep as u64)],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Every stored assessment, oldest first
    pub fn load_assessments(&self) -> ComplianceResult<Vec<RiskAssessment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT assessment_json FROM risk_assessments ORDER BY id")?;
        let rows = stmt.query_map([], |row| json_col(row, 0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
