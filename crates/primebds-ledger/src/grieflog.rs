//! Grief log: who broke, placed or opened which block, and the per-player
//! inspect-mode toggle. Lives in its own database file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::LedgerResult;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS actions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    xuid        TEXT NOT NULL,
    name        TEXT NOT NULL,
    action      TEXT NOT NULL,
    x           INTEGER NOT NULL,
    y           INTEGER NOT NULL,
    z           INTEGER NOT NULL,
    dimension   TEXT NOT NULL,
    timestamp   INTEGER NOT NULL,
    block_type  TEXT NOT NULL,
    block_state TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS actions_by_position ON actions (x, y, z);

CREATE TABLE IF NOT EXISTS user_toggles (
    xuid         TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    inspect_mode INTEGER NOT NULL DEFAULT 0
);
";

/// Block types whose interaction is worth logging.
const CONTAINER_KEYWORDS: &[&str] = &[
    "chest",
    "barrel",
    "furnace",
    "table",
    "crafter",
    "shulker",
    "smoker",
    "dispenser",
    "dropper",
    "hopper",
    "command",
    "lectern",
    "stonecutter",
    "grindstone",
    "anvil",
    "beacon",
];

/// True for containers and workstations.
pub fn is_logged_container(block_type: &str) -> bool {
    CONTAINER_KEYWORDS.iter().any(|k| block_type.contains(k))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GriefAction {
    BlockBreak,
    BlockPlace,
    OpenedContainer,
}

impl GriefAction {
    pub fn as_str(self) -> &'static str {
        match self {
            GriefAction::BlockBreak => "Block Break",
            GriefAction::BlockPlace => "Block Place",
            GriefAction::OpenedContainer => "Opened Container",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GriefLogEntry {
    pub xuid: String,
    pub name: String,
    pub action: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub dimension: String,
    pub timestamp: i64,
    pub block_type: String,
    /// Block state values joined with ", ".
    pub block_state: String,
}

pub struct GriefLogStore {
    path: PathBuf,
}

fn map_entry(row: &Row<'_>) -> rusqlite::Result<GriefLogEntry> {
    Ok(GriefLogEntry {
        xuid: row.get("xuid")?,
        name: row.get("name")?,
        action: row.get("action")?,
        x: row.get("x")?,
        y: row.get("y")?,
        z: row.get("z")?,
        dimension: row.get("dimension")?,
        timestamp: row.get("timestamp")?,
        block_type: row.get("block_type")?,
        block_state: row.get("block_state")?,
    })
}

impl GriefLogStore {
    pub fn open(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let store = Self { path: path.into() };
        store.connect()?.execute_batch(SCHEMA_SQL)?;
        debug!("Grief log ready at {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> LedgerResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(2))?;
        Ok(conn)
    }

    pub fn log_action(&self, entry: &GriefLogEntry) -> LedgerResult<()> {
        self.connect()?.execute(
            "INSERT INTO actions
                (xuid, name, action, x, y, z, dimension, timestamp, block_type, block_state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.xuid,
                entry.name,
                entry.action,
                entry.x,
                entry.y,
                entry.z,
                entry.dimension,
                entry.timestamp,
                entry.block_type,
                entry.block_state
            ],
        )?;
        Ok(())
    }

    /// Everything logged at a block position, oldest first.
    pub fn logs_at(&self, x: i32, y: i32, z: i32, dimension: &str) -> LedgerResult<Vec<GriefLogEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM actions WHERE x = ?1 AND y = ?2 AND z = ?3 AND dimension = ?4
             ORDER BY timestamp, id",
        )?;
        let rows = stmt.query_map(params![x, y, z, dimension], map_entry)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn inspect_mode(&self, xuid: &str) -> LedgerResult<bool> {
        let enabled = self
            .connect()?
            .query_row(
                "SELECT inspect_mode FROM user_toggles WHERE xuid = ?1",
                params![xuid],
                |row| row.get::<_, bool>(0),
            )
            .optional()?;
        Ok(enabled.unwrap_or(false))
    }

    /// Flip inspect mode and return the new state.
    pub fn toggle_inspect(&self, xuid: &str, name: &str) -> LedgerResult<bool> {
        let enabled = !self.inspect_mode(xuid)?;
        self.connect()?.execute(
            "INSERT INTO user_toggles (xuid, name, inspect_mode) VALUES (?1, ?2, ?3)
             ON CONFLICT(xuid) DO UPDATE SET name = excluded.name, inspect_mode = excluded.inspect_mode",
            params![xuid, name, enabled],
        )?;
        Ok(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::temp_db;

    fn entry(action: GriefAction, x: i32, ts: i64) -> GriefLogEntry {
        GriefLogEntry {
            xuid: "1".into(),
            name: "Steve".into(),
            action: action.as_str().into(),
            x,
            y: 64,
            z: -3,
            dimension: "overworld".into(),
            timestamp: ts,
            block_type: "minecraft:chest".into(),
            block_state: "north".into(),
        }
    }

    #[test]
    fn logs_are_found_by_position() {
        let store = GriefLogStore::open(temp_db("grief_pos")).unwrap();
        store.log_action(&entry(GriefAction::BlockPlace, 10, 1)).unwrap();
        store.log_action(&entry(GriefAction::BlockBreak, 10, 2)).unwrap();
        store.log_action(&entry(GriefAction::BlockBreak, 11, 3)).unwrap();

        let logs = store.logs_at(10, 64, -3, "overworld").unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action, "Block Place");
        assert_eq!(logs[1].action, "Block Break");
        assert!(store.logs_at(10, 64, -3, "nether").unwrap().is_empty());
    }

    #[test]
    fn inspect_toggle_flips() {
        let store = GriefLogStore::open(temp_db("grief_toggle")).unwrap();
        assert!(!store.inspect_mode("1").unwrap());
        assert!(store.toggle_inspect("1", "Steve").unwrap());
        assert!(store.inspect_mode("1").unwrap());
        assert!(!store.toggle_inspect("1", "Steve").unwrap());
        assert!(!store.inspect_mode("1").unwrap());
    }

    #[test]
    fn container_keywords() {
        assert!(is_logged_container("minecraft:trapped_chest"));
        assert!(is_logged_container("minecraft:crafting_table"));
        assert!(is_logged_container("minecraft:blast_furnace"));
        assert!(!is_logged_container("minecraft:oak_door"));
    }
}
