//! The `config.json` schema. Every field has a default so a partial file
//! (or an empty `{}`) still loads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modules {
    #[serde(default)]
    pub combat: CombatSection,
    #[serde(default)]
    pub game_logging: GameLoggingSection,
    #[serde(default)]
    pub grieflog: GriefLogSection,
    #[serde(default)]
    pub rtp: RtpSection,
    #[serde(default)]
    pub spectator_check: SpectatorCheckSection,
    #[serde(default)]
    pub multiworld: MultiworldSection,
    #[serde(default)]
    pub server_optimizer: ServerOptimizerSection,
}

// ─── Combat ──────────────────────────────────────────────────────────────────

/// Global combat defaults. Tags listed in `tag_overrides` may redefine any of
/// these keys; see [`crate::resolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSection {
    /// Added to every hit. `1` leaves damage untouched.
    #[serde(default = "one")]
    pub base_damage: f64,
    #[serde(default)]
    pub hit_cooldown_in_seconds: f64,
    /// A fall is cancelled when twice its damage is below this value.
    #[serde(default = "default_fall_damage_height")]
    pub fall_damage_height: f64,
    #[serde(default)]
    pub disable_fire_damage: bool,
    #[serde(default)]
    pub disable_explosion_damage: bool,
    /// Knockback modifiers: `0` means "leave vanilla knockback alone".
    #[serde(default)]
    pub horizontal_knockback_modifier: f64,
    #[serde(default)]
    pub vertical_knockback_modifier: f64,
    #[serde(default)]
    pub horizontal_sprint_knockback_modifier: f64,
    #[serde(default)]
    pub vertical_sprint_knockback_modifier: f64,
    #[serde(default)]
    pub disable_sprint_hits: bool,
    #[serde(default)]
    pub projectiles: ProjectileSection,
    /// Tag name to a partial combat tree.
    #[serde(default)]
    pub tag_overrides: BTreeMap<String, Value>,
}

fn one() -> f64 {
    1.0
}

fn default_fall_damage_height() -> f64 {
    3.5
}

impl Default for CombatSection {
    fn default() -> Self {
        Self {
            base_damage: one(),
            hit_cooldown_in_seconds: 0.0,
            fall_damage_height: default_fall_damage_height(),
            disable_fire_damage: false,
            disable_explosion_damage: false,
            horizontal_knockback_modifier: 0.0,
            vertical_knockback_modifier: 0.0,
            horizontal_sprint_knockback_modifier: 0.0,
            vertical_sprint_knockback_modifier: 0.0,
            disable_sprint_hits: false,
            projectiles: ProjectileSection::default(),
            tag_overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSection {
    #[serde(default)]
    pub horizontal_knockback_modifier: f64,
    #[serde(default)]
    pub vertical_knockback_modifier: f64,
}

// ─── Logging ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameLoggingSection {
    #[serde(default)]
    pub moderation: Toggle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toggle {
    #[serde(default = "enabled")]
    pub enabled: bool,
}

fn enabled() -> bool {
    true
}

impl Default for Toggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GriefLogSection {
    #[serde(default)]
    pub enabled: bool,
}

// ─── Teleport / spectate ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpSection {
    /// Centre of the sampling ring.
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default = "default_rtp_min_distance")]
    pub min_distance: f64,
    #[serde(default = "default_rtp_radius")]
    pub radius: f64,
    /// Warmup in seconds. `0` teleports immediately.
    #[serde(default = "default_rtp_delay")]
    pub delay: f64,
    /// Seconds between uses.
    #[serde(default = "default_rtp_cooldown")]
    pub cooldown: f64,
}

fn default_rtp_min_distance() -> f64 {
    100.0
}

fn default_rtp_radius() -> f64 {
    1000.0
}

fn default_rtp_delay() -> f64 {
    5.0
}

fn default_rtp_cooldown() -> f64 {
    60.0
}

impl Default for RtpSection {
    fn default() -> Self {
        Self {
            x: 0.0,
            z: 0.0,
            min_distance: default_rtp_min_distance(),
            radius: default_rtp_radius(),
            delay: default_rtp_delay(),
            cooldown: default_rtp_cooldown(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectatorCheckSection {
    #[serde(default = "enabled")]
    pub check_gamemode: bool,
    #[serde(default)]
    pub check_tags: bool,
    /// Tags that mark a player as a spectator.
    #[serde(default)]
    pub allow_tags: Vec<String>,
    /// Tags that hide a player from the spectate list.
    #[serde(default)]
    pub ignore_tags: Vec<String>,
}

impl Default for SpectatorCheckSection {
    fn default() -> Self {
        Self {
            check_gamemode: true,
            check_tags: false,
            allow_tags: Vec::new(),
            ignore_tags: Vec::new(),
        }
    }
}

// ─── Multiworld ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiworldSection {
    #[serde(default = "default_main_ip")]
    pub main_ip: String,
    #[serde(default)]
    pub worlds: BTreeMap<String, WorldEntry>,
}

fn default_main_ip() -> String {
    "127.0.0.1".into()
}

impl Default for MultiworldSection {
    fn default() -> Self {
        Self {
            main_ip: default_main_ip(),
            worlds: BTreeMap::new(),
        }
    }
}

impl MultiworldSection {
    /// Find a world by key, falling back to a match on `level-name`.
    pub fn find(&self, name: &str) -> Option<&WorldEntry> {
        self.worlds.get(name).or_else(|| {
            self.worlds
                .values()
                .find(|w| w.level_name.as_deref() == Some(name))
        })
    }

    /// `(ip, port)` for a configured world.
    pub fn address_of(&self, world: &WorldEntry) -> (String, u16) {
        let ip = world.ip.clone().unwrap_or_else(|| self.main_ip.clone());
        (ip, world.server_port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEntry {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(rename = "server-port", default = "default_world_port")]
    pub server_port: u16,
    #[serde(rename = "level-name", default)]
    pub level_name: Option<String>,
    /// Whether the world is loaded when the plugin starts.
    #[serde(default)]
    pub enabled: bool,
}

fn default_world_port() -> u16 {
    19132
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerOptimizerSection {
    #[serde(default)]
    pub mute_laggy_sounds: bool,
}
