//! Audit journal for logger lifecycle events.
//!
//! Records startup, sink selection, connectivity transitions and write
//! failures as JSON lines, so an unattended run can be reviewed afterwards
//! without scraping the console log.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// Types of events that are logged in the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Logger started with the given configuration
    SystemStart,
    /// A sink was opened and its schema/header ensured
    SinkOpened,
    /// Connectivity probe result changed
    ConnectivityChanged,
    /// Remote write failed and the sample went to the local sink
    SinkFallback,
    /// No sink accepted the sample
    PersistenceFailure,
    /// Logger stopped
    SystemShutdown,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Local wall-clock time, RFC 3339
    pub recorded_at: String,
    /// Tick the event belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    pub event_type: AuditEventType,
    /// Additional event-specific details
    pub details: serde_json::Value,
}

/// Thread-safe audit logger that writes to a JSONL file
pub struct AuditLogger {
    writer: Mutex<BufWriter<File>>,
}

impl AuditLogger {
    /// Create a new audit logger writing to the specified path.
    /// The file is opened in append mode to preserve existing logs.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
        })
    }

    pub fn log(&self, entry: AuditEntry) -> std::io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("audit writer poisoned"))?;
        serde_json::to_writer(&mut *writer, &entry)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    /// Convenience method stamping the entry with the current local time
    pub fn log_event(
        &self,
        tick: Option<u64>,
        event_type: AuditEventType,
        details: serde_json::Value,
    ) -> std::io::Result<()> {
        self.log(AuditEntry {
            recorded_at: Local::now().to_rfc3339(),
            tick,
            event_type,
            details,
        })
    }
}
