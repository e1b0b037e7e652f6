//! Journal backend - records carried-out actions as append-only JSONL
//!
//! One file per UTC day (`YYYY-MM-DD.jsonl`) under the base directory.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quorum_core::{Clock, Timestamp};

use crate::error::{BackendError, BackendResult};
use crate::types::{ActionRequest, ExecutionBackend, JournalRecord, OwnershipTransfer, Receipt};

struct JournalState {
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
    next_sequence: u64,
}

/// Date-rotated JSONL journal of every action carried out
pub struct JournalBackend {
    base_path: PathBuf,
    clock: Arc<dyn Clock>,
    state: Mutex<JournalState>,
}

impl JournalBackend {
    /// Open a journal directory, creating it if needed
    pub fn open(base_path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> BackendResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let existing = read_dir_records(&base_path)?.len() as u64;

        Ok(Self {
            base_path,
            clock,
            state: Mutex::new(JournalState {
                current_file: None,
                current_date: None,
                next_sequence: existing + 1,
            }),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Every record in the journal, oldest file first
    pub fn records(&self) -> BackendResult<Vec<JournalRecord>> {
        let mut state = self.state();
        if let Some(writer) = state.current_file.as_mut() {
            writer.flush()?;
        }
        read_dir_records(&self.base_path)
    }

    fn state(&self) -> MutexGuard<'_, JournalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(&self, build: impl FnOnce(String, Timestamp) -> JournalRecord) -> BackendResult<Receipt> {
        let now = self.clock.now();
        let date = now.format("%Y-%m-%d").to_string();

        let mut state = self.state();
        if state.current_date.as_ref() != Some(&date) {
            rotate_file(&self.base_path, &mut state, &date)?;
        }

        let reference = format!("JRN-{}-{:06}", now.format("%Y%m%d"), state.next_sequence);
        let record = build(reference.clone(), now);
        let json = serde_json::to_string(&record)?;

        let writer = state
            .current_file
            .as_mut()
            .ok_or_else(|| BackendError::Unavailable("journal file not open".to_string()))?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        state.next_sequence += 1;
        tracing::debug!(reference = %reference, request = record.request_id(), "Journal record written");
        Ok(Receipt { reference })
    }
}

fn rotate_file(base_path: &Path, state: &mut JournalState, date: &str) -> BackendResult<()> {
    if let Some(writer) = state.current_file.as_mut() {
        writer.flush()?;
    }

    let file_path = base_path.join(format!("{}.jsonl", date));
    let file = OpenOptions::new().create(true).append(true).open(&file_path)?;

    state.current_file = Some(BufWriter::new(file));
    state.current_date = Some(date.to_string());
    Ok(())
}

fn read_dir_records(base_path: &Path) -> BackendResult<Vec<JournalRecord>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(base_path)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "jsonl") {
            files.push(path);
        }
    }
    files.sort();

    let mut records = Vec::new();
    for path in files {
        let reader = BufReader::new(File::open(&path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
    }
    Ok(records)
}

impl ExecutionBackend for JournalBackend {
    fn execute_action(&self, action: &ActionRequest) -> BackendResult<Receipt> {
        self.append(|reference, recorded_at| JournalRecord::Action {
            reference,
            action: action.clone(),
            recorded_at,
        })
    }

    fn transfer_ownership(&self, transfer: &OwnershipTransfer) -> BackendResult<Receipt> {
        self.append(|reference, recorded_at| JournalRecord::OwnershipTransfer {
            reference,
            transfer: transfer.clone(),
            recorded_at,
        })
    }
}

impl Drop for JournalBackend {
    fn drop(&mut self) {
        if let Some(writer) = self.state().current_file.as_mut() {
            let _ = writer.flush();
        }
    }
}
