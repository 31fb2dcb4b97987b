//! Persistent state for PrimeBDS: ranks, the moderation ledger and the grief log.
//!
//! Both databases are SQLite files. Each operation opens a fresh connection;
//! nothing holds a connection between calls.

pub mod audit;
pub mod clock;
pub mod duration;
pub mod error;
pub mod grieflog;
pub mod ledger;
pub mod rank;
pub mod store;

pub use audit::{AuditAction, AuditBuffer, AuditEntry, AuditSink, TracingAudit};
pub use clock::{Clock, ManualClock, SystemClock};
pub use duration::{parse_length, Length, TimeUnit};
pub use error::{LedgerError, LedgerResult};
pub use grieflog::{is_logged_container, GriefAction, GriefLogEntry, GriefLogStore};
pub use ledger::{Identity, ModerationLedger, RankChange, Sanction};
pub use rank::{check_internal_rank, has_log_perms, Rank};
pub use store::{ModerationRecord, PlayerProfile, PlayerRecord, PunishmentEntry, UserStore};

#[cfg(test)]
pub(crate) mod testutil {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// A fresh database path under the system temp dir.
    pub fn temp_db(tag: &str) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "primebds_test_{tag}_{}_{n}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        path
    }
}
