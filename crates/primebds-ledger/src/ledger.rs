//! The moderation ledger: mute and ban state per player identity.
//!
//! Every operation opens its own connection, resolves the identity, applies
//! the transition and appends to the punishment history. Expirations are
//! checked lazily when a record is read; nothing sweeps stale flags.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::audit::{AuditAction, AuditEntry, AuditSink};
use crate::clock::Clock;
use crate::duration::Length;
use crate::error::{LedgerError, LedgerResult};
use crate::rank::Rank;
use crate::store::{
    ModerationRecord, PlayerProfile, PlayerRecord, PunishmentEntry, UserDb, UserStore,
};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Who an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A connected player. Both halves come from the live session.
    Session { xuid: String, name: String },
    /// An offline player looked up by last-seen name.
    Name(String),
    /// An offline player looked up by XUID.
    Xuid(String),
}

impl Identity {
    pub fn session(xuid: impl Into<String>, name: impl Into<String>) -> Self {
        Identity::Session {
            xuid: xuid.into(),
            name: name.into(),
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Identity::Name(name.into())
    }

    /// The name used in messages before the identity is resolved.
    pub fn display(&self) -> &str {
        match self {
            Identity::Session { name, .. } | Identity::Name(name) => name,
            Identity::Xuid(xuid) => xuid,
        }
    }
}

/// Outcome of a successful mute or ban.
#[derive(Debug, Clone, PartialEq)]
pub struct Sanction {
    pub xuid: String,
    pub name: String,
    pub reason: String,
    pub expiration: Option<i64>,
}

/// Outcome of a successful rank change.
#[derive(Debug, Clone, PartialEq)]
pub struct RankChange {
    pub xuid: String,
    /// Name as stored, whatever case the lookup used.
    pub name: String,
    pub previous: Rank,
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

pub struct ModerationLedger {
    store: UserStore,
    clock: Arc<dyn Clock>,
    audit: Box<dyn AuditSink>,
}

impl ModerationLedger {
    pub fn new(store: UserStore, clock: Arc<dyn Clock>, audit: Box<dyn AuditSink>) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Open (or create) the user database at `path`.
    pub fn open(
        path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        audit: Box<dyn AuditSink>,
    ) -> LedgerResult<Self> {
        Ok(Self::new(UserStore::open(path)?, clock, audit))
    }

    pub fn store(&self) -> &UserStore {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    // --- Players ---

    pub fn record_join(&self, profile: &PlayerProfile) -> LedgerResult<PlayerRecord> {
        let db = self.store.connect()?;
        db.upsert_player(profile, self.now())?;
        db.player_by_xuid(&profile.xuid)?
            .ok_or_else(|| LedgerError::NotFound(profile.name.clone()))
    }

    /// Stamp the leave time. Returns false for a player that never joined.
    pub fn record_leave(&self, xuid: &str) -> LedgerResult<bool> {
        self.store.connect()?.set_last_leave(xuid, self.now())
    }

    pub fn get_player(&self, identity: &Identity) -> LedgerResult<PlayerRecord> {
        let db = self.store.connect()?;
        let found = match identity {
            Identity::Session { xuid, .. } | Identity::Xuid(xuid) => db.player_by_xuid(xuid)?,
            Identity::Name(name) => most_recent(db.players_by_name(name)?, name),
        };
        found.ok_or_else(|| LedgerError::NotFound(identity.display().to_string()))
    }

    /// Rank of a player, `Default` for anyone without a record.
    pub fn rank_of(&self, identity: &Identity) -> LedgerResult<Rank> {
        match self.get_player(identity) {
            Ok(record) => Ok(record.rank),
            Err(LedgerError::NotFound(_)) => Ok(Rank::Default),
            Err(e) => Err(e),
        }
    }

    // --- Status ---

    /// Current moderation record. A known player without any history gets a
    /// cleared record; an unknown name or XUID is `NotFound`.
    pub fn get_status(&self, identity: &Identity) -> LedgerResult<ModerationRecord> {
        let db = self.store.connect()?;
        let (xuid, name) = resolve(&db, identity)?;
        load_moderation(&db, &xuid, &name)
    }

    pub fn history(&self, identity: &Identity, limit: usize) -> LedgerResult<Vec<PunishmentEntry>> {
        let db = self.store.connect()?;
        let (xuid, _) = resolve(&db, identity)?;
        db.punishments(&xuid, limit)
    }

    // --- Transitions ---

    pub fn mute(
        &mut self,
        initiator: &str,
        identity: &Identity,
        length: Length,
        reason: &str,
    ) -> LedgerResult<Sanction> {
        let db = self.store.connect()?;
        let (xuid, name) = resolve(&db, identity)?;
        let now = self.now();
        let mut record = load_moderation(&db, &xuid, &name)?;

        if record.mute_active(now) {
            return Err(LedgerError::AlreadyMuted {
                name,
                reason: record.mute_reason,
                expiration: record.mute_expiration,
            });
        }

        record.is_muted = true;
        record.mute_expiration = length.expiration_from(now);
        record.mute_reason = reason.to_string();

        let sanction = Sanction {
            xuid,
            name,
            reason: record.mute_reason.clone(),
            expiration: record.mute_expiration,
        };
        self.commit(&db, initiator, &sanction, AuditAction::Mute, now, |db| {
            db.save_moderation(&record)
        })?;
        debug!("Muted {} ({length})", sanction.name);
        Ok(sanction)
    }

    pub fn unmute(&mut self, initiator: &str, identity: &Identity) -> LedgerResult<Sanction> {
        let db = self.store.connect()?;
        let (xuid, name) = resolve(&db, identity)?;
        let now = self.now();
        let mut record = load_moderation(&db, &xuid, &name)?;

        if !record.mute_active(now) {
            return Err(LedgerError::NotMuted(name));
        }

        let lifted = Sanction {
            xuid,
            name,
            reason: record.mute_reason.clone(),
            expiration: None,
        };
        record.clear_mute();
        self.commit(&db, initiator, &lifted, AuditAction::Unmute, now, |db| {
            db.save_moderation(&record)
        })?;
        Ok(lifted)
    }

    pub fn ban(
        &mut self,
        initiator: &str,
        identity: &Identity,
        length: Length,
        reason: &str,
    ) -> LedgerResult<Sanction> {
        let db = self.store.connect()?;
        let (xuid, name) = resolve(&db, identity)?;
        let now = self.now();
        let mut record = load_moderation(&db, &xuid, &name)?;

        if record.ban_active(now) {
            return Err(LedgerError::AlreadyBanned {
                name,
                reason: record.ban_reason,
                expiration: record.ban_expiration,
            });
        }

        record.is_banned = true;
        record.ban_expiration = length.expiration_from(now);
        record.ban_reason = reason.to_string();

        let sanction = Sanction {
            xuid,
            name,
            reason: record.ban_reason.clone(),
            expiration: record.ban_expiration,
        };
        self.commit(&db, initiator, &sanction, AuditAction::Ban, now, |db| {
            db.save_moderation(&record)
        })?;
        debug!("Banned {} ({length})", sanction.name);
        Ok(sanction)
    }

    pub fn unban(&mut self, initiator: &str, identity: &Identity) -> LedgerResult<Sanction> {
        let db = self.store.connect()?;
        let (xuid, name) = resolve(&db, identity)?;
        let now = self.now();
        let mut record = load_moderation(&db, &xuid, &name)?;

        if !record.ban_active(now) {
            return Err(LedgerError::NotBanned(name));
        }

        let lifted = Sanction {
            xuid,
            name,
            reason: record.ban_reason.clone(),
            expiration: None,
        };
        record.clear_ban();
        self.commit(&db, initiator, &lifted, AuditAction::Unban, now, |db| {
            db.save_moderation(&record)
        })?;
        Ok(lifted)
    }

    /// Change a player's rank. The result carries the stored name and the
    /// rank held before.
    pub fn set_rank(
        &mut self,
        initiator: &str,
        identity: &Identity,
        rank: Rank,
    ) -> LedgerResult<RankChange> {
        let db = self.store.connect()?;
        let player = match identity {
            Identity::Session { xuid, .. } | Identity::Xuid(xuid) => db.player_by_xuid(xuid)?,
            Identity::Name(name) => most_recent(db.players_by_name(name)?, name),
        }
        .ok_or_else(|| LedgerError::NotFound(identity.display().to_string()))?;

        if player.rank == rank {
            return Err(LedgerError::SameRank {
                name: player.name,
                rank,
            });
        }

        let now = self.now();
        let change = Sanction {
            xuid: player.xuid,
            name: player.name,
            reason: format!("{} -> {}", player.rank, rank),
            expiration: None,
        };
        self.commit(&db, initiator, &change, AuditAction::SetRank(rank), now, |db| {
            db.set_rank(&change.xuid, rank)
        })?;
        Ok(RankChange {
            xuid: change.xuid,
            name: change.name,
            previous: player.rank,
        })
    }

    /// Apply `write` and its history row in one transaction, then emit the
    /// audit entry. A failed write leaves state and history untouched.
    fn commit(
        &mut self,
        db: &UserDb,
        initiator: &str,
        sanction: &Sanction,
        action: AuditAction,
        now: i64,
        write: impl FnOnce(&UserDb) -> LedgerResult<()>,
    ) -> LedgerResult<()> {
        let entry = PunishmentEntry {
            xuid: sanction.xuid.clone(),
            name: sanction.name.clone(),
            initiator: initiator.to_string(),
            action: action.as_str().to_string(),
            reason: sanction.reason.clone(),
            timestamp: now,
            expiration: sanction.expiration,
        };
        db.atomically(|db| {
            write(db)?;
            db.append_punishment(&entry)
        })?;
        self.audit.record(&AuditEntry {
            initiator: initiator.to_string(),
            target_xuid: sanction.xuid.clone(),
            target_name: sanction.name.clone(),
            action,
            reason: sanction.reason.clone(),
            expiration: sanction.expiration,
            timestamp: now,
        });
        Ok(())
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// First of a name lookup, warning when the name is shared by several XUIDs.
fn most_recent(mut players: Vec<PlayerRecord>, name: &str) -> Option<PlayerRecord> {
    if players.len() > 1 {
        let xuids: Vec<&str> = players.iter().map(|p| p.xuid.as_str()).collect();
        warn!(
            "Name '{name}' is shared by {} players ({}), using the most recent",
            players.len(),
            xuids.join(", ")
        );
    }
    if players.is_empty() {
        None
    } else {
        Some(players.swap_remove(0))
    }
}

/// Map an identity to `(xuid, name)`.
fn resolve(db: &UserDb, identity: &Identity) -> LedgerResult<(String, String)> {
    match identity {
        Identity::Session { xuid, name } => Ok((xuid.clone(), name.clone())),
        Identity::Xuid(xuid) => {
            if let Some(player) = db.player_by_xuid(xuid)? {
                return Ok((player.xuid, player.name));
            }
            db.moderation_by_xuid(xuid)?
                .map(|m| (m.xuid, m.name))
                .ok_or_else(|| LedgerError::NotFound(xuid.clone()))
        }
        Identity::Name(name) => {
            if let Some(player) = most_recent(db.players_by_name(name)?, name) {
                return Ok((player.xuid, player.name));
            }
            db.moderation_by_name(name)?
                .map(|m| (m.xuid, m.name))
                .ok_or_else(|| LedgerError::NotFound(name.clone()))
        }
    }
}

fn load_moderation(db: &UserDb, xuid: &str, name: &str) -> LedgerResult<ModerationRecord> {
    let mut record = db
        .moderation_by_xuid(xuid)?
        .unwrap_or_else(|| ModerationRecord::cleared(xuid, name));
    record.name = name.to_string();
    Ok(record)
}
