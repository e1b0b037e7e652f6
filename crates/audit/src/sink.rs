//! Audit sinks
//!
//! Sinks assign the sequence number and persist the event. A sink failure
//! never undoes the operation being audited: engines go through [`record`],
//! which logs the failure and carries on.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::AuditResult;
use crate::event::AuditEvent;

/// Destination for audit events
pub trait AuditSink: Send + Sync {
    /// Append an event, returning it with its assigned sequence number
    fn append(&self, event: AuditEvent) -> AuditResult<AuditEvent>;

    /// Every event recorded so far, in append order
    fn events(&self) -> AuditResult<Vec<AuditEvent>>;

    /// Events about one subject (request id, account or principal)
    fn events_for(&self, subject: &str) -> AuditResult<Vec<AuditEvent>> {
        Ok(self
            .events()?
            .into_iter()
            .filter(|e| e.subject == subject || e.account.as_ref().is_some_and(|a| a.as_str() == subject))
            .collect())
    }
}

/// Append to a sink, logging instead of failing when the sink is down
pub fn record(sink: &dyn AuditSink, event: AuditEvent) -> Option<AuditEvent> {
    let action = event.action;
    let subject = event.subject.clone();
    match sink.append(event) {
        Ok(recorded) => Some(recorded),
        Err(e) => {
            tracing::error!(error = %e, action = %action, subject = %subject, "Failed to write audit event");
            None
        }
    }
}

struct JsonlState {
    file: File,
    next_sequence: u64,
}

/// Append-only JSONL audit log
///
/// Each line is one JSON-serialized [`AuditEvent`]. The file is opened in
/// append mode and never rewritten.
pub struct JsonlAuditLog {
    path: PathBuf,
    state: Mutex<JsonlState>,
}

impl JsonlAuditLog {
    /// Open (creating if needed) a log at the given path
    ///
    /// Sequence numbering resumes after the last event already on disk.
    pub fn open(path: impl AsRef<Path>) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let last = read_events(&path)?.last().map(|e| e.sequence).unwrap_or(0);

        Ok(Self {
            path,
            state: Mutex::new(JsonlState {
                file,
                next_sequence: last + 1,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> MutexGuard<'_, JsonlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuditSink for JsonlAuditLog {
    fn append(&self, mut event: AuditEvent) -> AuditResult<AuditEvent> {
        let mut state = self.state();
        event.sequence = state.next_sequence;

        let json = serde_json::to_string(&event)?;
        writeln!(state.file, "{}", json)?;
        state.file.flush()?;

        state.next_sequence += 1;
        Ok(event)
    }

    fn events(&self) -> AuditResult<Vec<AuditEvent>> {
        // Hold the writer so a read never sees a half-written line
        let _state = self.state();
        read_events(&self.path)
    }
}

fn read_events(path: &Path) -> AuditResult<Vec<AuditEvent>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }

    Ok(events)
}

/// In-memory audit sink
#[derive(Default)]
pub struct MemoryAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, mut event: AuditEvent) -> AuditResult<AuditEvent> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        event.sequence = events.len() as u64 + 1;
        events.push(event.clone());
        Ok(event)
    }

    fn events(&self) -> AuditResult<Vec<AuditEvent>> {
        Ok(self.events.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}
