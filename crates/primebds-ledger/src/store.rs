//! SQLite user database: player records, moderation state, punishment history.
//!
//! `UserStore` only knows where the database lives. Every logical operation
//! opens its own `UserDb` connection and drops it when done.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::error::LedgerResult;
use crate::rank::Rank;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    xuid          TEXT PRIMARY KEY,
    uuid          TEXT NOT NULL DEFAULT '',
    name          TEXT NOT NULL,
    ping          INTEGER NOT NULL DEFAULT 0,
    device_os     TEXT NOT NULL DEFAULT '',
    client_ver    TEXT NOT NULL DEFAULT '',
    last_join     INTEGER NOT NULL DEFAULT 0,
    last_leave    INTEGER,
    internal_rank TEXT NOT NULL DEFAULT 'Default'
);
CREATE INDEX IF NOT EXISTS users_by_name ON users (name COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS mod_logs (
    xuid        TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    is_muted    INTEGER NOT NULL DEFAULT 0,
    mute_time   INTEGER,
    mute_reason TEXT NOT NULL DEFAULT '',
    is_banned   INTEGER NOT NULL DEFAULT 0,
    banned_time INTEGER,
    ban_reason  TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS punishment_log (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    xuid       TEXT NOT NULL,
    name       TEXT NOT NULL,
    initiator  TEXT NOT NULL,
    action     TEXT NOT NULL,
    reason     TEXT NOT NULL,
    timestamp  INTEGER NOT NULL,
    expiration INTEGER
);
CREATE INDEX IF NOT EXISTS punishment_log_by_xuid ON punishment_log (xuid, timestamp);
";

// ─── Records ─────────────────────────────────────────────────────────────────

/// Connection details captured when a player joins.
#[derive(Debug, Clone, Default)]
pub struct PlayerProfile {
    pub xuid: String,
    pub uuid: String,
    pub name: String,
    pub ping: u32,
    pub device_os: String,
    pub client_version: String,
}

/// A stored player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub xuid: String,
    pub uuid: String,
    /// Last-seen display name.
    pub name: String,
    pub ping: u32,
    pub device_os: String,
    pub client_version: String,
    pub rank: Rank,
    pub last_join: i64,
    /// `None` until the player leaves for the first time.
    pub last_leave: Option<i64>,
}

/// Current mute and ban state of one player.
///
/// Flags are cleared lazily: a flag whose expiration has passed is stale and
/// reads as inactive through [`ModerationRecord::mute_active`] and
/// [`ModerationRecord::ban_active`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModerationRecord {
    pub xuid: String,
    pub name: String,
    pub is_muted: bool,
    /// `None` means permanent.
    pub mute_expiration: Option<i64>,
    pub mute_reason: String,
    pub is_banned: bool,
    /// `None` means permanent.
    pub ban_expiration: Option<i64>,
    pub ban_reason: String,
}

impl ModerationRecord {
    /// A record with no active action.
    pub fn cleared(xuid: &str, name: &str) -> Self {
        Self {
            xuid: xuid.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn mute_active(&self, now: i64) -> bool {
        self.is_muted && self.mute_expiration.map_or(true, |exp| exp > now)
    }

    pub fn ban_active(&self, now: i64) -> bool {
        self.is_banned && self.ban_expiration.map_or(true, |exp| exp > now)
    }

    pub fn clear_mute(&mut self) {
        self.is_muted = false;
        self.mute_expiration = None;
        self.mute_reason.clear();
    }

    pub fn clear_ban(&mut self) {
        self.is_banned = false;
        self.ban_expiration = None;
        self.ban_reason.clear();
    }
}

/// One row of the punishment history.
#[derive(Debug, Clone, PartialEq)]
pub struct PunishmentEntry {
    pub xuid: String,
    pub name: String,
    pub initiator: String,
    pub action: String,
    pub reason: String,
    pub timestamp: i64,
    pub expiration: Option<i64>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Location of the user database.
#[derive(Debug, Clone)]
pub struct UserStore {
    path: PathBuf,
}

impl UserStore {
    /// Point at `path`, creating the file and schema if needed.
    pub fn open(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let store = Self { path: path.into() };
        store.connect()?.conn.execute_batch(SCHEMA_SQL)?;
        debug!("User database ready at {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection for one logical operation.
    pub fn connect(&self) -> LedgerResult<UserDb> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(2))?;
        Ok(UserDb { conn })
    }
}

/// A short-lived connection to the user database.
pub struct UserDb {
    conn: Connection,
}

fn map_player(row: &Row<'_>) -> rusqlite::Result<PlayerRecord> {
    let rank_text: String = row.get("internal_rank")?;
    let rank = rank_text.parse().unwrap_or_else(|_| {
        warn!("Unknown rank '{rank_text}' in users table, treating as Default");
        Rank::Default
    });
    Ok(PlayerRecord {
        xuid: row.get("xuid")?,
        uuid: row.get("uuid")?,
        name: row.get("name")?,
        ping: row.get("ping")?,
        device_os: row.get("device_os")?,
        client_version: row.get("client_ver")?,
        rank,
        last_join: row.get("last_join")?,
        last_leave: row.get("last_leave")?,
    })
}

fn map_moderation(row: &Row<'_>) -> rusqlite::Result<ModerationRecord> {
    Ok(ModerationRecord {
        xuid: row.get("xuid")?,
        name: row.get("name")?,
        is_muted: row.get("is_muted")?,
        mute_expiration: row.get("mute_time")?,
        mute_reason: row.get("mute_reason")?,
        is_banned: row.get("is_banned")?,
        ban_expiration: row.get("banned_time")?,
        ban_reason: row.get("ban_reason")?,
    })
}

fn map_punishment(row: &Row<'_>) -> rusqlite::Result<PunishmentEntry> {
    Ok(PunishmentEntry {
        xuid: row.get("xuid")?,
        name: row.get("name")?,
        initiator: row.get("initiator")?,
        action: row.get("action")?,
        reason: row.get("reason")?,
        timestamp: row.get("timestamp")?,
        expiration: row.get("expiration")?,
    })
}

impl UserDb {
    /// Run `f` as one transaction. Nothing `f` wrote is kept unless it returns `Ok`.
    pub fn atomically<T>(&self, f: impl FnOnce(&Self) -> LedgerResult<T>) -> LedgerResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // --- Players ---

    /// Insert or refresh a player on join. The previous `last_leave` is kept.
    pub fn upsert_player(&self, profile: &PlayerProfile, now: i64) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO users (xuid, uuid, name, ping, device_os, client_ver, last_join)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(xuid) DO UPDATE SET
                uuid = excluded.uuid,
                name = excluded.name,
                ping = excluded.ping,
                device_os = excluded.device_os,
                client_ver = excluded.client_ver,
                last_join = excluded.last_join",
            params![
                profile.xuid,
                profile.uuid,
                profile.name,
                profile.ping,
                profile.device_os,
                profile.client_version,
                now
            ],
        )?;
        self.conn.execute(
            "UPDATE mod_logs SET name = ?2 WHERE xuid = ?1",
            params![profile.xuid, profile.name],
        )?;
        Ok(())
    }

    /// Stamp the leave time. Returns false if the player is unknown.
    pub fn set_last_leave(&self, xuid: &str, now: i64) -> LedgerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE users SET last_leave = ?2 WHERE xuid = ?1",
            params![xuid, now],
        )?;
        Ok(changed > 0)
    }

    pub fn set_rank(&self, xuid: &str, rank: Rank) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE users SET internal_rank = ?2 WHERE xuid = ?1",
            params![xuid, rank.as_str()],
        )?;
        Ok(())
    }

    pub fn player_by_xuid(&self, xuid: &str) -> LedgerResult<Option<PlayerRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM users WHERE xuid = ?1",
                params![xuid],
                map_player,
            )
            .optional()?)
    }

    /// Players whose last-seen name matches, most recently joined first.
    pub fn players_by_name(&self, name: &str) -> LedgerResult<Vec<PlayerRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM users WHERE name = ?1 COLLATE NOCASE ORDER BY last_join DESC",
        )?;
        let rows = stmt.query_map(params![name], map_player)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // --- Moderation ---

    pub fn moderation_by_xuid(&self, xuid: &str) -> LedgerResult<Option<ModerationRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM mod_logs WHERE xuid = ?1",
                params![xuid],
                map_moderation,
            )
            .optional()?)
    }

    /// Moderation row by stored name, for players missing from `users`.
    pub fn moderation_by_name(&self, name: &str) -> LedgerResult<Option<ModerationRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM mod_logs WHERE name = ?1 COLLATE NOCASE LIMIT 1",
                params![name],
                map_moderation,
            )
            .optional()?)
    }

    pub fn save_moderation(&self, record: &ModerationRecord) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO mod_logs
                (xuid, name, is_muted, mute_time, mute_reason, is_banned, banned_time, ban_reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(xuid) DO UPDATE SET
                name = excluded.name,
                is_muted = excluded.is_muted,
                mute_time = excluded.mute_time,
                mute_reason = excluded.mute_reason,
                is_banned = excluded.is_banned,
                banned_time = excluded.banned_time,
                ban_reason = excluded.ban_reason",
            params![
                record.xuid,
                record.name,
                record.is_muted,
                record.mute_expiration,
                record.mute_reason,
                record.is_banned,
                record.ban_expiration,
                record.ban_reason
            ],
        )?;
        Ok(())
    }

    // --- History ---

    pub fn append_punishment(&self, entry: &PunishmentEntry) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO punishment_log
                (xuid, name, initiator, action, reason, timestamp, expiration)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.xuid,
                entry.name,
                entry.initiator,
                entry.action,
                entry.reason,
                entry.timestamp,
                entry.expiration
            ],
        )?;
        Ok(())
    }

    /// Newest first.
    pub fn punishments(&self, xuid: &str, limit: usize) -> LedgerResult<Vec<PunishmentEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM punishment_log WHERE xuid = ?1
             ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![xuid, limit as i64], map_punishment)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
