//! Append-only audit trail.
//!
//! Records every derivation, encryption and decryption a lineage tree
//! performs, plus every rejected ascent or failed decryption. Records carry
//! rungs and timestamps only: no key bytes, no plaintext, no tokens.
//! Supports pluggable sinks for forwarding records to files or other stores.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Rung;

/// A sink that receives audit records. Implement this to forward records
/// to a file, database, or other persistent store.
pub trait AuditSink: Send {
    /// Append a record. Called once per audited operation.
    ///
    /// A failure does not stop the operation being audited; the log counts
    /// it (see [`AuditLog::sink_failures`]).
    fn append(&mut self, record: AuditRecord) -> io::Result<()>;
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    /// A node materialised a new sublineage (cache miss).
    Derived,
    /// A node sealed a payload at its own rung.
    Encrypted,
    /// A node opened a payload at its own rung.
    Decrypted,
    /// A token failed authentication.
    DecryptRejected,
    /// A caller asked a node for a rung above its max rung.
    AscentRejected,
}

/// A permanent record of one lineage operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event: AuditEvent,
    /// Max rung of the node that performed the operation.
    pub max_rung: Rung,
    /// The rung the operation targeted.
    pub rung: Rung,
    /// When the operation occurred.
    pub timestamp: DateTime<Utc>,
}

/// An append-only log shared by every node of one lineage tree.
pub type SharedAuditLog = Arc<Mutex<AuditLog>>;

/// An append-only log of lineage operations.
/// Can forward records to additional sinks via `add_forward_sink`.
///
/// Records accumulate in memory until drained with
/// [`take_records`](Self::take_records); a long-lived audited lineage should
/// drain periodically or rely on forward sinks.
#[derive(Default, Serialize, Deserialize)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
    #[serde(skip)]
    forward_sinks: Vec<Box<dyn AuditSink>>,
    #[serde(skip)]
    sink_failures: usize,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("records", &self.records)
            .field("forward_sinks", &self.forward_sinks.len())
            .field("sink_failures", &self.sink_failures)
            .finish()
    }
}

impl Clone for AuditLog {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            forward_sinks: Vec::new(), // Forward sinks are not cloned
            sink_failures: self.sink_failures,
        }
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh, empty log ready to hand to [`LineageOptions`](crate::LineageOptions).
    pub fn shared() -> SharedAuditLog {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Add a sink to receive a copy of every record. Useful for persisting
    /// to a file without replacing the in-memory log.
    pub fn add_forward_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.forward_sinks.push(sink);
    }

    /// Append a new record to the log and forward to any attached sinks.
    pub fn append(&mut self, record: AuditRecord) {
        for sink in self.forward_sinks.iter_mut() {
            if sink.append(record.clone()).is_err() {
                self.sink_failures += 1;
            }
        }
        self.records.push(record);
    }

    /// Number of records a forward sink failed to accept.
    pub fn sink_failures(&self) -> usize {
        self.sink_failures
    }

    /// Remove and return every record held in memory.
    pub fn take_records(&mut self) -> Vec<AuditRecord> {
        std::mem::take(&mut self.records)
    }

    /// Return the number of records in the log.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, AuditRecord> {
        self.records.iter()
    }
}

/// Append a record to `log`, if there is one.
///
/// A poisoned lock still accepts records: appends never leave the log
/// half-written.
pub(crate) fn record(log: Option<&SharedAuditLog>, event: AuditEvent, max_rung: Rung, rung: Rung) {
    if let Some(log) = log {
        log.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .append(AuditRecord {
                event,
                max_rung,
                rung,
                timestamp: Utc::now(),
            });
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes audit records as JSON lines (one per record) to a file.
/// Creates the file if it doesn't exist; appends if it does.
pub struct FileAuditSink {
    file: std::fs::File,
}

impl FileAuditSink {
    /// Open or create a file for append-only audit logging.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&mut self, record: AuditRecord) -> io::Result<()> {
        let line = serde_json::to_string(&record)?;
        writeln!(self.file, "{line}")?;
        self.file.flush()
    }
}
