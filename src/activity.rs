//! User-visible activity log for export attempts
//!
//! Entries are collected in memory and timestamped by the caller, so the log
//! can be replayed or asserted on without depending on the wall clock.
//! Diagnostics for operators go through `tracing` instead.

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use crate::types::{ConfigHash, ExportKind};

/// Severity of an activity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActivityLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub level: ActivityLevel,
    pub timestamp: DateTime<Utc>,
    /// Export kind if the event concerns an export
    pub kind: Option<ExportKind>,
    pub config_hash: Option<ConfigHash>,
    pub artifact_id: Option<String>,
    pub message: String,
}

impl ActivityEntry {
    pub fn new(level: ActivityLevel, timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp,
            kind: None,
            config_hash: None,
            artifact_id: None,
            message: message.into(),
        }
    }

    pub fn with_kind(mut self, kind: ExportKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_config_hash(mut self, hash: ConfigHash) -> Self {
        self.config_hash = Some(hash);
        self
    }

    pub fn with_artifact(mut self, artifact_id: impl Into<String>) -> Self {
        self.artifact_id = Some(artifact_id.into());
        self
    }
}

/// Bounded-by-level collection of activity entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    entries: Vec<ActivityEntry>,
    min_level: ActivityLevel,
}

impl ActivityLog {
    pub fn new(min_level: ActivityLevel) -> Self {
        Self {
            entries: Vec::new(),
            min_level,
        }
    }

    /// Record every level
    pub fn all() -> Self {
        Self::new(ActivityLevel::Debug)
    }

    pub fn with_info_level() -> Self {
        Self::new(ActivityLevel::Info)
    }

    /// Append an entry if it meets the minimum level
    pub fn log(&mut self, entry: ActivityEntry) {
        if entry.level >= self.min_level {
            self.entries.push(entry);
        }
    }

    pub fn debug(&mut self, timestamp: DateTime<Utc>, message: impl Into<String>) {
        self.log(ActivityEntry::new(ActivityLevel::Debug, timestamp, message));
    }

    pub fn info(&mut self, timestamp: DateTime<Utc>, message: impl Into<String>) {
        self.log(ActivityEntry::new(ActivityLevel::Info, timestamp, message));
    }

    pub fn warn(&mut self, timestamp: DateTime<Utc>, message: impl Into<String>) {
        self.log(ActivityEntry::new(ActivityLevel::Warn, timestamp, message));
    }

    pub fn error(&mut self, timestamp: DateTime<Utc>, message: impl Into<String>) {
        self.log(ActivityEntry::new(ActivityLevel::Error, timestamp, message));
    }

    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&ActivityEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn filter_by_level(&self, level: ActivityLevel) -> Vec<&ActivityEntry> {
        self.entries.iter().filter(|e| e.level == level).collect()
    }

    pub fn filter_by_kind(&self, kind: ExportKind) -> Vec<&ActivityEntry> {
        self.entries.iter().filter(|e| e.kind == Some(kind)).collect()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_info_level()
    }
}
