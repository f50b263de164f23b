//! ==============================================================================
//! log_sink.rs - bounded operator log
//! ==============================================================================
//!
//! purpose:
//!     the visible event log of the dashboard. newest entry first, capped so
//!     a dashboard left open for days keeps a constant footprint.
//!
//! relationships:
//!     - used by: dashboard.rs (every tick outcome lands here)
//!     - used by: view.rs (rendered top to bottom)
//!
//! ==============================================================================

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

/// default number of entries kept visible
pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Clone, Debug, Serialize)]
pub struct LogEntry {
    /// wall-clock time the entry was appended
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    /// `[HH:MM:SS] message`, the way the entry is shown
    pub fn line(&self) -> String {
        format!("[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct LogSink {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl LogSink {
    /// a capacity of zero is bumped to one so an append is always visible
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// prepend a timestamped entry, then trim the oldest ones
    pub fn append(&mut self, text: impl Into<String>) {
        self.append_at(Local::now(), text);
    }

    pub fn append_at(&mut self, timestamp: DateTime<Local>, text: impl Into<String>) {
        self.entries.push_front(LogEntry {
            timestamp,
            message: text.into(),
        });
        self.entries.truncate(self.capacity);
    }

    /// entries newest first
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    #[allow(dead_code)]
    pub fn newest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
