//! Plugin API: traits, events, and server API the Bedrock host exposes to PrimeBDS.
//!
//! This crate defines the host-facing surface only. It has no dependency on
//! any other workspace crate.

use serde::{Deserialize, Serialize};

// ─── Types ───────────────────────────────────────────────────────────────────

/// A position or velocity in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Survival,
    Creative,
    Adventure,
    Spectator,
}

/// Information about an online player, passed to the plugin in events and lookups.
#[derive(Debug, Clone, Default)]
pub struct PluginPlayer {
    pub name: String,
    /// Stable platform account ID.
    pub xuid: String,
    pub uuid: String,
    /// Actor unique ID for the current session.
    pub unique_id: i64,
    pub position: Vec3,
    pub dimension: String,
    pub game_mode: GameMode,
    pub ping: u32,
    pub device_os: String,
    pub game_version: String,
    /// Scoreboard tags, in the order the host reports them.
    pub tags: Vec<String>,
    pub is_sprinting: bool,
    pub velocity: Vec3,
    pub is_op: bool,
}

impl PluginPlayer {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Block position for plugin events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// A block touched by a player.
#[derive(Debug, Clone, Default)]
pub struct BlockInfo {
    pub position: BlockPos,
    pub dimension: String,
    /// Namespaced block type, e.g. `minecraft:chest`.
    pub block_type: String,
    /// Block state values, in host order.
    pub states: Vec<String>,
}

/// An entity taking part in a hit: the victim or the damage/knockback source.
#[derive(Debug, Clone, Default)]
pub struct ActorRef {
    /// Entity type, e.g. `minecraft:player` or `minecraft:zombie`.
    pub kind: String,
    pub unique_id: i64,
    /// Player name when the actor is a player.
    pub player_name: Option<String>,
    pub tags: Vec<String>,
    pub velocity: Vec3,
}

impl ActorRef {
    /// Key identifying this actor across events (`type:id`).
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.unique_id)
    }
}

/// Cause of damage for ActorDamage events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DamageCause {
    EntityAttack,
    Projectile,
    Fall,
    Fire,
    FireTick,
    Lava,
    EntityExplosion,
    Drowning,
    Void,
    Other,
}

impl DamageCause {
    pub fn is_fire(self) -> bool {
        matches!(
            self,
            DamageCause::Fire | DamageCause::FireTick | DamageCause::Lava
        )
    }
}

#[derive(Debug, Clone)]
pub struct DamageSource {
    pub cause: DamageCause,
    /// The entity responsible for the damage, if any.
    pub attacker: Option<ActorRef>,
}

/// Outbound packets the host lets the plugin inspect before sending.
///
/// The host decodes payloads; only the fields the plugin reads are carried.
#[derive(Debug, Clone)]
pub enum OutboundPacket {
    AddPlayer {
        player_name: String,
        /// Actor unique ID of the player being added.
        unique_id: i64,
    },
    LevelSoundEvent {
        sound_id: u32,
        entity_type: String,
        actor_unique_id: i64,
    },
    Other {
        packet_id: u32,
    },
}

/// Log level for plugin logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

/// Result of dispatching an event to a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Continue normal handling.
    Continue,
    /// Event was cancelled by this plugin.
    Cancelled,
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// All events the plugin can listen to.
///
/// Handlers receive `&mut PluginEvent`: fields such as `damage` and
/// `knockback` may be rewritten in place and are read back by the host.
#[derive(Debug, Clone)]
pub enum PluginEvent {
    // --- Player events ---
    PlayerJoin {
        player: PluginPlayer,
    },
    PlayerQuit {
        player: PluginPlayer,
    },
    PlayerChat {
        player: PluginPlayer,
        message: String,
    },
    PlayerMove {
        player: PluginPlayer,
        from: Vec3,
        to: Vec3,
    },
    PlayerInteract {
        player: PluginPlayer,
        block: Option<BlockInfo>,
    },

    // --- Combat events ---
    ActorDamage {
        actor: ActorRef,
        damage: f32,
        source: DamageSource,
    },
    ActorKnockback {
        actor: ActorRef,
        source: Option<ActorRef>,
        knockback: Vec3,
    },

    // --- Block events ---
    BlockBreak {
        player: PluginPlayer,
        block: BlockInfo,
    },
    BlockPlace {
        player: PluginPlayer,
        /// The block that was clicked against.
        against: BlockInfo,
        /// The block as it will be after placement.
        placed: BlockInfo,
    },

    // --- Network events ---
    PacketSend {
        /// Name of the player the packet is addressed to.
        recipient: Option<String>,
        packet: OutboundPacket,
    },

    // --- Server events ---
    ServerStarted,
    ServerStopping,
}

impl PluginEvent {
    /// Whether this event type can be cancelled by a plugin.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            PluginEvent::PlayerChat { .. }
                | PluginEvent::PlayerInteract { .. }
                | PluginEvent::ActorDamage { .. }
                | PluginEvent::ActorKnockback { .. }
                | PluginEvent::BlockBreak { .. }
                | PluginEvent::BlockPlace { .. }
                | PluginEvent::PacketSend { .. }
        )
    }
}

// ─── Commands ────────────────────────────────────────────────────────────────

/// Who issued a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSender {
    Console,
    Player(String),
}

impl CommandSender {
    pub fn name(&self) -> &str {
        match self {
            CommandSender::Console => "Server",
            CommandSender::Player(name) => name,
        }
    }

    pub fn player_name(&self) -> Option<&str> {
        match self {
            CommandSender::Console => None,
            CommandSender::Player(name) => Some(name),
        }
    }
}

/// Result returned by a command handler.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    /// Whether the command executed successfully.
    pub success: bool,
    /// Messages to send back to the command sender.
    pub messages: Vec<String>,
}

impl CommandResult {
    /// Create a successful result with a single message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            messages: vec![message.into()],
        }
    }

    /// Create a failed result with a single message.
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: vec![message.into()],
        }
    }

    /// Append another line to the result.
    pub fn with(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

// ─── Plugin trait ────────────────────────────────────────────────────────────

/// Metadata about a plugin.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
}

/// The Plugin trait, implemented by PrimeBDS and driven by the host.
pub trait Plugin: Send {
    /// Return plugin metadata.
    fn info(&self) -> PluginInfo;

    /// Called when the plugin is loaded. Use `api` to register commands, schedule tasks.
    fn on_enable(&mut self, api: &mut dyn ServerApi);

    /// Called when the plugin is unloaded.
    fn on_disable(&mut self) {}

    /// Called for every dispatched event. Return `Cancelled` to cancel cancellable events.
    fn on_event(&mut self, event: &mut PluginEvent, api: &mut dyn ServerApi) -> EventResult {
        let _ = (event, api);
        EventResult::Continue
    }

    /// Called when a scheduled task fires.
    fn on_task(&mut self, task_id: u32, api: &mut dyn ServerApi) {
        let _ = (task_id, api);
    }

    /// Called when a plugin-registered command is executed.
    fn on_command(
        &mut self,
        command: &str,
        args: &[String],
        sender: &CommandSender,
        api: &mut dyn ServerApi,
    ) -> Option<CommandResult> {
        let _ = (command, args, sender, api);
        None
    }

    /// Return a default config as JSON. If `Some`, the plugin gets a config file.
    fn default_config(&self) -> Option<serde_json::Value> {
        None
    }

    /// Called with the loaded config (from `plugins/<name>/config.json`), and again on reload.
    fn load_config(&mut self, _config: serde_json::Value) {}
}

// ─── Server API ──────────────────────────────────────────────────────────────

/// Access to host state, passed to the plugin during callbacks.
///
/// Read methods return data immediately. Write methods may be deferred by the
/// host until after the callback returns.
pub trait ServerApi {
    // --- Players ---
    fn online_players(&self) -> Vec<PluginPlayer>;
    fn get_player(&self, name: &str) -> Option<PluginPlayer>;
    fn send_message(&mut self, player_name: &str, message: &str);
    fn send_popup(&mut self, player_name: &str, message: &str);
    fn broadcast_message(&mut self, message: &str);
    fn kick_player(&mut self, player_name: &str, reason: &str);
    fn teleport_player(&mut self, player_name: &str, dimension: &str, position: Vec3);
    fn transfer_player(&mut self, player_name: &str, address: &str, port: u16);
    fn set_game_mode(&mut self, player_name: &str, game_mode: GameMode);

    // --- World ---
    fn level_name(&self) -> String;
    fn server_port(&self) -> u16;
    /// Y of the highest non-air block at the column, `None` if the column is not loaded.
    fn highest_block_y(&self, dimension: &str, x: i32, z: i32) -> Option<i32>;

    // --- Server ---
    fn get_tick(&self) -> u64;
    fn log(&self, level: LogLevel, message: &str);
    /// Run a command as the server console.
    fn dispatch_command(&mut self, command: &str);
    /// Send a command to a secondary world registered with the host.
    fn forward_world_command(&mut self, world: &str, command: &str);
    fn reload_data(&mut self);

    // --- Scheduler ---
    fn schedule_delayed(&mut self, plugin_name: &str, delay_ticks: u64, task_id: u32);
    fn schedule_repeating(
        &mut self,
        plugin_name: &str,
        delay_ticks: u64,
        interval_ticks: u64,
        task_id: u32,
    );
    fn cancel_task(&mut self, plugin_name: &str, task_id: u32);

    // --- Commands ---
    fn register_command(&mut self, name: &str, description: &str, plugin_name: &str);
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_player() -> PluginPlayer {
        PluginPlayer {
            name: "TestPlayer".into(),
            xuid: "2535400000000001".into(),
            uuid: "00000000-0000-0000-0000-000000000001".into(),
            unique_id: -4294967295,
            position: Vec3::new(0.5, 65.62, 0.5),
            dimension: "overworld".into(),
            tags: vec!["pvp".into()],
            ..Default::default()
        }
    }

    // Minimal ServerApi implementation for testing.
    struct MockApi {
        messages: Vec<(String, String)>,
        commands: Vec<(String, String)>,
    }

    impl MockApi {
        fn new() -> Self {
            Self {
                messages: Vec::new(),
                commands: Vec::new(),
            }
        }
    }

    impl ServerApi for MockApi {
        fn online_players(&self) -> Vec<PluginPlayer> {
            vec![test_player()]
        }
        fn get_player(&self, name: &str) -> Option<PluginPlayer> {
            if name == "TestPlayer" {
                Some(test_player())
            } else {
                None
            }
        }
        fn send_message(&mut self, player_name: &str, message: &str) {
            self.messages
                .push((player_name.to_string(), message.to_string()));
        }
        fn send_popup(&mut self, _player_name: &str, _message: &str) {}
        fn broadcast_message(&mut self, _message: &str) {}
        fn kick_player(&mut self, _player_name: &str, _reason: &str) {}
        fn teleport_player(&mut self, _player_name: &str, _dimension: &str, _position: Vec3) {}
        fn transfer_player(&mut self, _player_name: &str, _address: &str, _port: u16) {}
        fn set_game_mode(&mut self, _player_name: &str, _game_mode: GameMode) {}
        fn level_name(&self) -> String {
            "Bedrock level".into()
        }
        fn server_port(&self) -> u16 {
            19132
        }
        fn highest_block_y(&self, _dimension: &str, _x: i32, _z: i32) -> Option<i32> {
            Some(64)
        }
        fn get_tick(&self) -> u64 {
            100
        }
        fn log(&self, _level: LogLevel, _message: &str) {}
        fn dispatch_command(&mut self, _command: &str) {}
        fn forward_world_command(&mut self, _world: &str, _command: &str) {}
        fn reload_data(&mut self) {}
        fn schedule_delayed(&mut self, _plugin_name: &str, _delay_ticks: u64, _task_id: u32) {}
        fn schedule_repeating(
            &mut self,
            _plugin_name: &str,
            _delay_ticks: u64,
            _interval_ticks: u64,
            _task_id: u32,
        ) {
        }
        fn cancel_task(&mut self, _plugin_name: &str, _task_id: u32) {}
        fn register_command(&mut self, name: &str, description: &str, _plugin_name: &str) {
            self.commands
                .push((name.to_string(), description.to_string()));
        }
    }

    // Doubles melee damage dealt by players tagged "strong".
    struct StrengthPlugin {
        multiplier: f32,
    }

    impl Plugin for StrengthPlugin {
        fn info(&self) -> PluginInfo {
            PluginInfo {
                name: "StrengthPlugin".into(),
                version: "1.0.0".into(),
                description: "Scales tagged damage".into(),
                author: "Test".into(),
            }
        }

        fn on_enable(&mut self, api: &mut dyn ServerApi) {
            api.register_command("strength", "Show the multiplier", "StrengthPlugin");
        }

        fn on_event(&mut self, event: &mut PluginEvent, api: &mut dyn ServerApi) -> EventResult {
            match event {
                PluginEvent::ActorDamage { damage, source, .. } => {
                    let strong = source
                        .attacker
                        .as_ref()
                        .is_some_and(|a| a.tags.iter().any(|t| t == "strong"));
                    if strong {
                        *damage *= self.multiplier;
                    }
                    EventResult::Continue
                }
                PluginEvent::PlayerChat { message, .. } if message.contains("bad") => {
                    EventResult::Cancelled
                }
                PluginEvent::PlayerJoin { player } => {
                    api.send_message(&player.name, "Welcome");
                    EventResult::Continue
                }
                _ => EventResult::Continue,
            }
        }

        fn on_command(
            &mut self,
            command: &str,
            _args: &[String],
            sender: &CommandSender,
            _api: &mut dyn ServerApi,
        ) -> Option<CommandResult> {
            (command == "strength").then(|| {
                CommandResult::ok(format!("{}: x{}", sender.name(), self.multiplier))
            })
        }

        fn default_config(&self) -> Option<serde_json::Value> {
            Some(serde_json::json!({ "multiplier": 2.0 }))
        }

        fn load_config(&mut self, config: serde_json::Value) {
            if let Some(v) = config.get("multiplier").and_then(|v| v.as_f64()) {
                self.multiplier = v as f32;
            }
        }
    }

    fn attack(tags: &[&str]) -> PluginEvent {
        PluginEvent::ActorDamage {
            actor: ActorRef {
                kind: "minecraft:zombie".into(),
                unique_id: 7,
                ..Default::default()
            },
            damage: 3.0,
            source: DamageSource {
                cause: DamageCause::EntityAttack,
                attacker: Some(ActorRef {
                    kind: "minecraft:player".into(),
                    unique_id: 1,
                    player_name: Some("TestPlayer".into()),
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    velocity: Vec3::ZERO,
                }),
            },
        }
    }

    #[test]
    fn plugin_on_enable_registers_command() {
        let mut plugin = StrengthPlugin { multiplier: 2.0 };
        let mut api = MockApi::new();
        plugin.on_enable(&mut api);
        assert_eq!(api.commands.len(), 1);
        assert_eq!(api.commands[0].0, "strength");
    }

    #[test]
    fn plugin_mutates_damage_in_place() {
        let mut plugin = StrengthPlugin { multiplier: 2.0 };
        let mut api = MockApi::new();

        let mut event = attack(&["strong"]);
        assert_eq!(plugin.on_event(&mut event, &mut api), EventResult::Continue);
        match event {
            PluginEvent::ActorDamage { damage, .. } => assert_eq!(damage, 6.0),
            _ => unreachable!(),
        }

        let mut event = attack(&["weak"]);
        plugin.on_event(&mut event, &mut api);
        match event {
            PluginEvent::ActorDamage { damage, .. } => assert_eq!(damage, 3.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn plugin_cancels_bad_chat() {
        let mut plugin = StrengthPlugin { multiplier: 2.0 };
        let mut api = MockApi::new();
        let mut event = PluginEvent::PlayerChat {
            player: test_player(),
            message: "this is bad word".into(),
        };
        assert_eq!(plugin.on_event(&mut event, &mut api), EventResult::Cancelled);
    }

    #[test]
    fn plugin_greets_on_join() {
        let mut plugin = StrengthPlugin { multiplier: 2.0 };
        let mut api = MockApi::new();
        let mut event = PluginEvent::PlayerJoin {
            player: test_player(),
        };
        plugin.on_event(&mut event, &mut api);
        assert_eq!(api.messages, vec![("TestPlayer".into(), "Welcome".into())]);
    }

    #[test]
    fn plugin_command_reports_sender() {
        let mut plugin = StrengthPlugin { multiplier: 2.0 };
        let mut api = MockApi::new();
        let response = plugin.on_command("strength", &[], &CommandSender::Console, &mut api);
        assert_eq!(response, Some(CommandResult::ok("Server: x2")));
        assert!(plugin
            .on_command("other", &[], &CommandSender::Console, &mut api)
            .is_none());
    }

    #[test]
    fn plugin_config_roundtrip() {
        let mut plugin = StrengthPlugin { multiplier: 1.0 };
        plugin.load_config(serde_json::json!({ "multiplier": 3.5 }));
        assert_eq!(plugin.multiplier, 3.5);

        let default = plugin.default_config().unwrap();
        assert_eq!(default["multiplier"], 2.0);
    }

    #[test]
    fn event_cancellable_flags() {
        assert!(attack(&[]).is_cancellable());
        assert!(PluginEvent::BlockBreak {
            player: test_player(),
            block: BlockInfo::default(),
        }
        .is_cancellable());
        assert!(PluginEvent::PacketSend {
            recipient: None,
            packet: OutboundPacket::Other { packet_id: 1 },
        }
        .is_cancellable());
        assert!(!PluginEvent::PlayerJoin {
            player: test_player()
        }
        .is_cancellable());
        assert!(!PluginEvent::PlayerMove {
            player: test_player(),
            from: Vec3::ZERO,
            to: Vec3::ZERO,
        }
        .is_cancellable());
        assert!(!PluginEvent::ServerStopping.is_cancellable());
    }

    #[test]
    fn actor_key_and_distance() {
        let actor = ActorRef {
            kind: "minecraft:player".into(),
            unique_id: 42,
            ..Default::default()
        };
        assert_eq!(actor.key(), "minecraft:player:42");
        assert_eq!(Vec3::new(3.0, 0.0, 4.0).distance(&Vec3::ZERO), 5.0);
        assert!(test_player().has_tag("pvp"));
        assert!(DamageCause::Lava.is_fire());
        assert!(!DamageCause::Fall.is_fire());
    }

    #[test]
    fn sender_names() {
        assert_eq!(CommandSender::Console.name(), "Server");
        assert_eq!(CommandSender::Console.player_name(), None);
        let p = CommandSender::Player("Alex".into());
        assert_eq!(p.name(), "Alex");
        assert_eq!(p.player_name(), Some("Alex"));
    }
}
