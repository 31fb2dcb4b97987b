//! Audit trail for moderation actions.
//!
//! The ledger hands one [`AuditEntry`] to its [`AuditSink`] after every
//! successful mutation. Where the entry ends up (log file, staff chat) is the
//! sink's business.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::rank::Rank;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Mute,
    Unmute,
    Ban,
    Unban,
    SetRank(Rank),
}

impl AuditAction {
    /// Name stored in the `punishment_log.action` column.
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Mute => "mute",
            AuditAction::Unmute => "unmute",
            AuditAction::Ban => "ban",
            AuditAction::Unban => "unban",
            AuditAction::SetRank(_) => "set_rank",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::SetRank(rank) => write!(f, "set_rank({rank})"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub initiator: String,
    pub target_xuid: String,
    pub target_name: String,
    pub action: AuditAction,
    pub reason: String,
    /// `None` for permanent actions and for actions without an expiry.
    pub expiration: Option<i64>,
    pub timestamp: i64,
}

pub trait AuditSink: Send {
    fn record(&mut self, entry: &AuditEntry);
}

/// Writes each entry as a structured `tracing` event.
#[derive(Debug, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&mut self, entry: &AuditEntry) {
        info!(
            target: "primebds::audit",
            initiator = %entry.initiator,
            xuid = %entry.target_xuid,
            action = %entry.action,
            expiration = ?entry.expiration,
            "{} -> {}: {}",
            entry.initiator,
            entry.target_name,
            entry.reason
        );
    }
}

/// Collects entries so the plugin can relay them to staff after a command.
#[derive(Debug, Clone, Default)]
pub struct AuditBuffer {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl AuditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every buffered entry, oldest first.
    pub fn drain(&self) -> Vec<AuditEntry> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for AuditBuffer {
    fn record(&mut self, entry: &AuditEntry) {
        TracingAudit.record(entry);
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry.clone()),
            Err(poisoned) => poisoned.into_inner().push(entry.clone()),
        }
    }
}
