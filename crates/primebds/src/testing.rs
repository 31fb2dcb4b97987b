//! Recording `ServerApi` and fixtures shared by the plugin's tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use primebds_config::PrimeConfig;
use primebds_ledger::ManualClock;
use primebds_plugin_api::{GameMode, LogLevel, PluginPlayer, ServerApi, Vec3};

use crate::context::PluginContext;

static DIRS: AtomicUsize = AtomicUsize::new(0);

pub fn temp_dir(tag: &str) -> PathBuf {
    let n = DIRS.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "primebds_plugin_{tag}_{}_{n}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

pub fn test_context(tag: &str) -> (PluginContext, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at(1_700_000_000));
    let ctx = PluginContext::open(&temp_dir(tag), PrimeConfig::default(), clock.clone()).unwrap();
    (ctx, clock)
}

pub fn player(name: &str, xuid: &str) -> PluginPlayer {
    PluginPlayer {
        name: name.into(),
        xuid: xuid.into(),
        uuid: format!("uuid-{xuid}"),
        unique_id: xuid.parse().unwrap_or(0),
        position: Vec3::new(0.0, 64.0, 0.0),
        dimension: "overworld".into(),
        ping: 30,
        device_os: "Windows".into(),
        game_version: "1.21.50".into(),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct MockServer {
    pub players: Vec<PluginPlayer>,
    pub messages: Vec<(String, String)>,
    pub popups: Vec<(String, String)>,
    pub broadcasts: Vec<String>,
    pub kicks: Vec<(String, String)>,
    pub teleports: Vec<(String, String, Vec3)>,
    pub transfers: Vec<(String, String, u16)>,
    pub game_modes: Vec<(String, GameMode)>,
    pub dispatched: Vec<String>,
    pub forwarded: Vec<(String, String)>,
    pub reloads: u32,
    pub scheduled: Vec<(u32, u64, Option<u64>)>,
    pub cancelled: Vec<u32>,
    pub registered: Vec<String>,
    /// Returned by `highest_block_y` for every column.
    pub surface: Option<i32>,
}

impl MockServer {
    pub fn with_players(players: Vec<PluginPlayer>) -> Self {
        Self {
            players,
            surface: Some(63),
            ..Default::default()
        }
    }

    pub fn messages_to(&self, name: &str) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(to, _)| to == name)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    pub fn move_player(&mut self, name: &str, position: Vec3) {
        if let Some(p) = self.players.iter_mut().find(|p| p.name == name) {
            p.position = position;
        }
    }
}

impl ServerApi for MockServer {
    fn online_players(&self) -> Vec<PluginPlayer> {
        self.players.clone()
    }
    fn get_player(&self, name: &str) -> Option<PluginPlayer> {
        self.players.iter().find(|p| p.name == name).cloned()
    }
    fn send_message(&mut self, player_name: &str, message: &str) {
        self.messages.push((player_name.into(), message.into()));
    }
    fn send_popup(&mut self, player_name: &str, message: &str) {
        self.popups.push((player_name.into(), message.into()));
    }
    fn broadcast_message(&mut self, message: &str) {
        self.broadcasts.push(message.into());
    }
    fn kick_player(&mut self, player_name: &str, reason: &str) {
        self.kicks.push((player_name.into(), reason.into()));
    }
    fn teleport_player(&mut self, player_name: &str, dimension: &str, position: Vec3) {
        self.teleports
            .push((player_name.into(), dimension.into(), position));
    }
    fn transfer_player(&mut self, player_name: &str, address: &str, port: u16) {
        self.transfers.push((player_name.into(), address.into(), port));
    }
    fn set_game_mode(&mut self, player_name: &str, game_mode: GameMode) {
        self.game_modes.push((player_name.into(), game_mode));
    }
    fn level_name(&self) -> String {
        "Survival".into()
    }
    fn server_port(&self) -> u16 {
        19132
    }
    fn highest_block_y(&self, _dimension: &str, _x: i32, _z: i32) -> Option<i32> {
        self.surface
    }
    fn get_tick(&self) -> u64 {
        0
    }
    fn log(&self, _level: LogLevel, _message: &str) {}
    fn dispatch_command(&mut self, command: &str) {
        self.dispatched.push(command.into());
    }
    fn forward_world_command(&mut self, world: &str, command: &str) {
        self.forwarded.push((world.into(), command.into()));
    }
    fn reload_data(&mut self) {
        self.reloads += 1;
    }
    fn schedule_delayed(&mut self, _plugin_name: &str, delay_ticks: u64, task_id: u32) {
        self.scheduled.push((task_id, delay_ticks, None));
    }
    fn schedule_repeating(
        &mut self,
        _plugin_name: &str,
        delay_ticks: u64,
        interval_ticks: u64,
        task_id: u32,
    ) {
        self.scheduled
            .push((task_id, delay_ticks, Some(interval_ticks)));
    }
    fn cancel_task(&mut self, _plugin_name: &str, task_id: u32) {
        self.cancelled.push(task_id);
    }
    fn register_command(&mut self, name: &str, _description: &str, _plugin_name: &str) {
        self.registered.push(name.into());
    }
}
