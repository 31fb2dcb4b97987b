//! Plugin manager: loads, enables, and dispatches events to plugins.

use std::collections::HashMap;
use std::path::PathBuf;

use primebds_plugin_api::{
    CommandResult, CommandSender, EventResult, GameMode, LogLevel, Plugin, PluginEvent,
    PluginPlayer, ServerApi, Vec3,
};
use tracing::{debug, error, info, warn};

// ─── Types ───────────────────────────────────────────────────────────────────

/// A scheduled task owned by a plugin.
#[derive(Debug)]
pub struct ScheduledTask {
    pub plugin_name: String,
    pub task_id: u32,
    pub remaining_ticks: u64,
    /// `None` = one-shot, `Some(n)` = repeating every `n` ticks.
    pub interval: Option<u64>,
}

/// Server state snapshot for plugin API reads (built before dispatch).
pub struct ServerSnapshot {
    pub players: Vec<PluginPlayer>,
    pub level_name: String,
    pub port: u16,
    pub current_tick: u64,
    /// Top block of every column in the flat world, `None` if nothing is loaded.
    pub surface_y: Option<i32>,
}

/// Deferred side-effect requested by a plugin during a callback.
#[derive(Debug)]
pub enum PendingAction {
    SendMessage {
        player_name: String,
        message: String,
    },
    SendPopup {
        player_name: String,
        message: String,
    },
    BroadcastMessage {
        message: String,
    },
    KickPlayer {
        player_name: String,
        reason: String,
    },
    TeleportPlayer {
        player_name: String,
        dimension: String,
        position: Vec3,
    },
    TransferPlayer {
        player_name: String,
        address: String,
        port: u16,
    },
    SetGameMode {
        player_name: String,
        game_mode: GameMode,
    },
    DispatchCommand {
        command: String,
    },
    ForwardWorldCommand {
        world: String,
        command: String,
    },
    ReloadData,
    RegisterCommand {
        name: String,
        description: String,
        plugin_name: String,
    },
    ScheduleTask {
        task: ScheduledTask,
    },
    CancelTask {
        plugin_name: String,
        task_id: u32,
    },
}

// ─── ServerApiImpl ───────────────────────────────────────────────────────────

/// Implements `ServerApi` using a snapshot for reads and accumulating PendingActions for writes.
struct ServerApiImpl<'a> {
    snapshot: &'a ServerSnapshot,
    actions: Vec<PendingAction>,
}

impl<'a> ServerApiImpl<'a> {
    fn new(snapshot: &'a ServerSnapshot) -> Self {
        Self {
            snapshot,
            actions: Vec::new(),
        }
    }

    fn take_actions(self) -> Vec<PendingAction> {
        self.actions
    }
}

impl ServerApi for ServerApiImpl<'_> {
    fn online_players(&self) -> Vec<PluginPlayer> {
        self.snapshot.players.clone()
    }

    fn get_player(&self, name: &str) -> Option<PluginPlayer> {
        self.snapshot
            .players
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    fn send_message(&mut self, player_name: &str, message: &str) {
        self.actions.push(PendingAction::SendMessage {
            player_name: player_name.to_string(),
            message: message.to_string(),
        });
    }

    fn send_popup(&mut self, player_name: &str, message: &str) {
        self.actions.push(PendingAction::SendPopup {
            player_name: player_name.to_string(),
            message: message.to_string(),
        });
    }

    fn broadcast_message(&mut self, message: &str) {
        self.actions.push(PendingAction::BroadcastMessage {
            message: message.to_string(),
        });
    }

    fn kick_player(&mut self, player_name: &str, reason: &str) {
        self.actions.push(PendingAction::KickPlayer {
            player_name: player_name.to_string(),
            reason: reason.to_string(),
        });
    }

    fn teleport_player(&mut self, player_name: &str, dimension: &str, position: Vec3) {
        self.actions.push(PendingAction::TeleportPlayer {
            player_name: player_name.to_string(),
            dimension: dimension.to_string(),
            position,
        });
    }

    fn transfer_player(&mut self, player_name: &str, address: &str, port: u16) {
        self.actions.push(PendingAction::TransferPlayer {
            player_name: player_name.to_string(),
            address: address.to_string(),
            port,
        });
    }

    fn set_game_mode(&mut self, player_name: &str, game_mode: GameMode) {
        self.actions.push(PendingAction::SetGameMode {
            player_name: player_name.to_string(),
            game_mode,
        });
    }

    fn level_name(&self) -> String {
        self.snapshot.level_name.clone()
    }

    fn server_port(&self) -> u16 {
        self.snapshot.port
    }

    fn highest_block_y(&self, _dimension: &str, _x: i32, _z: i32) -> Option<i32> {
        self.snapshot.surface_y
    }

    fn get_tick(&self) -> u64 {
        self.snapshot.current_tick
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => info!("[plugin] {message}"),
            LogLevel::Warn => warn!("[plugin] {message}"),
            LogLevel::Error => error!("[plugin] {message}"),
            LogLevel::Debug => debug!("[plugin] {message}"),
        }
    }

    fn dispatch_command(&mut self, command: &str) {
        self.actions.push(PendingAction::DispatchCommand {
            command: command.to_string(),
        });
    }

    fn forward_world_command(&mut self, world: &str, command: &str) {
        self.actions.push(PendingAction::ForwardWorldCommand {
            world: world.to_string(),
            command: command.to_string(),
        });
    }

    fn reload_data(&mut self) {
        self.actions.push(PendingAction::ReloadData);
    }

    fn schedule_delayed(&mut self, plugin_name: &str, delay_ticks: u64, task_id: u32) {
        self.actions.push(PendingAction::ScheduleTask {
            task: ScheduledTask {
                plugin_name: plugin_name.to_string(),
                task_id,
                remaining_ticks: delay_ticks,
                interval: None,
            },
        });
    }

    fn schedule_repeating(
        &mut self,
        plugin_name: &str,
        delay_ticks: u64,
        interval_ticks: u64,
        task_id: u32,
    ) {
        self.actions.push(PendingAction::ScheduleTask {
            task: ScheduledTask {
                plugin_name: plugin_name.to_string(),
                task_id,
                remaining_ticks: delay_ticks,
                interval: Some(interval_ticks),
            },
        });
    }

    fn cancel_task(&mut self, plugin_name: &str, task_id: u32) {
        self.actions.push(PendingAction::CancelTask {
            plugin_name: plugin_name.to_string(),
            task_id,
        });
    }

    fn register_command(&mut self, name: &str, description: &str, plugin_name: &str) {
        self.actions.push(PendingAction::RegisterCommand {
            name: name.to_string(),
            description: description.to_string(),
            plugin_name: plugin_name.to_string(),
        });
    }
}

// ─── PluginManager ───────────────────────────────────────────────────────────

/// Manages all loaded plugins, their scheduled tasks, and command registrations.
pub struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
    tasks: Vec<ScheduledTask>,
    /// Commands registered by plugins: command_name → plugin_name.
    pub plugin_commands: HashMap<String, String>,
    /// Root of `<name>/config.json` files.
    plugins_dir: PathBuf,
}

impl PluginManager {
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins: Vec::new(),
            tasks: Vec::new(),
            plugin_commands: HashMap::new(),
            plugins_dir: plugins_dir.into(),
        }
    }

    /// Register a plugin (call before enable_all).
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        info!("Registered plugin: {}", plugin.info().name);
        self.plugins.push(plugin);
    }

    /// Enable all registered plugins. Returns actions the host must apply.
    pub fn enable_all(&mut self, snapshot: &ServerSnapshot) -> Vec<PendingAction> {
        let mut all_actions = Vec::new();
        for plugin in &mut self.plugins {
            let mut api = ServerApiImpl::new(snapshot);
            plugin.on_enable(&mut api);
            all_actions.extend(api.take_actions());
        }
        self.apply_internal_actions(all_actions)
    }

    /// Disable all registered plugins and drop their tasks.
    pub fn disable_all(&mut self) {
        for plugin in &mut self.plugins {
            plugin.on_disable();
        }
        self.tasks.clear();
    }

    /// Dispatch an event to all plugins. Returns the combined result and pending actions.
    ///
    /// Plugins may rewrite event fields in place; a cancellation stops propagation.
    pub fn dispatch(
        &mut self,
        event: &mut PluginEvent,
        snapshot: &ServerSnapshot,
    ) -> (EventResult, Vec<PendingAction>) {
        let cancellable = event.is_cancellable();
        let mut all_actions = Vec::new();
        let mut final_result = EventResult::Continue;

        for plugin in &mut self.plugins {
            let mut api = ServerApiImpl::new(snapshot);
            let result = plugin.on_event(event, &mut api);
            all_actions.extend(api.take_actions());

            if cancellable && result == EventResult::Cancelled {
                final_result = EventResult::Cancelled;
                break; // Stop propagation
            }
        }

        (final_result, self.apply_internal_actions(all_actions))
    }

    /// Tick the scheduler. Returns pending actions from fired tasks.
    pub fn tick_scheduler(&mut self, snapshot: &ServerSnapshot) -> Vec<PendingAction> {
        let mut all_actions = Vec::new();
        let mut fired: Vec<(String, u32)> = Vec::new();

        // Decrement and collect fired tasks
        for task in &mut self.tasks {
            if task.remaining_ticks > 0 {
                task.remaining_ticks -= 1;
            }
            if task.remaining_ticks == 0 {
                fired.push((task.plugin_name.clone(), task.task_id));
                if let Some(interval) = task.interval {
                    task.remaining_ticks = interval;
                }
            }
        }

        // Remove one-shot tasks that fired
        self.tasks
            .retain(|t| t.remaining_ticks > 0 || t.interval.is_some());

        // Call on_task for each fired task
        for (plugin_name, task_id) in fired {
            if let Some(plugin) = self
                .plugins
                .iter_mut()
                .find(|p| p.info().name == plugin_name)
            {
                let mut api = ServerApiImpl::new(snapshot);
                plugin.on_task(task_id, &mut api);
                all_actions.extend(api.take_actions());
            }
        }

        self.apply_internal_actions(all_actions)
    }

    /// Handle a plugin-registered command. Returns (response, pending_actions).
    pub fn handle_command(
        &mut self,
        command: &str,
        args: &[String],
        sender: &CommandSender,
        snapshot: &ServerSnapshot,
    ) -> (Option<CommandResult>, Vec<PendingAction>) {
        let plugin_name = match self.plugin_commands.get(&command.to_lowercase()) {
            Some(name) => name.clone(),
            None => return (None, Vec::new()),
        };

        if let Some(plugin) = self
            .plugins
            .iter_mut()
            .find(|p| p.info().name == plugin_name)
        {
            let mut api = ServerApiImpl::new(snapshot);
            let response = plugin.on_command(command, args, sender, &mut api);
            let actions = api.take_actions();
            (response, self.apply_internal_actions(actions))
        } else {
            (None, Vec::new())
        }
    }

    /// Load configs for all plugins from disk, writing defaults where missing.
    pub fn load_configs(&mut self) {
        for plugin in &mut self.plugins {
            let info = plugin.info();
            if let Some(default_config) = plugin.default_config() {
                let plugin_dir = self.plugins_dir.join(&info.name);
                let config_path = plugin_dir.join("config.json");

                let config = if config_path.exists() {
                    match std::fs::read_to_string(&config_path) {
                        Ok(data) => match serde_json::from_str(&data) {
                            Ok(v) => v,
                            Err(e) => {
                                warn!("Failed to parse config for {}: {e}", info.name);
                                default_config.clone()
                            }
                        },
                        Err(e) => {
                            warn!("Failed to read config for {}: {e}", info.name);
                            default_config.clone()
                        }
                    }
                } else {
                    // Write default config
                    if let Err(e) = std::fs::create_dir_all(&plugin_dir) {
                        warn!("Failed to create {}: {e}", plugin_dir.display());
                    }
                    match serde_json::to_string_pretty(&default_config) {
                        Ok(json) => {
                            if let Err(e) = std::fs::write(&config_path, json) {
                                warn!("Failed to write {}: {e}", config_path.display());
                            }
                        }
                        Err(e) => warn!("Failed to serialize config for {}: {e}", info.name),
                    }
                    default_config
                };

                plugin.load_config(config);
            }
        }
    }

    /// Apply internal actions (RegisterCommand, ScheduleTask, CancelTask) immediately
    /// and hand the rest back to the host.
    fn apply_internal_actions(&mut self, actions: Vec<PendingAction>) -> Vec<PendingAction> {
        let mut external = Vec::new();
        for action in actions {
            match action {
                PendingAction::RegisterCommand {
                    name, plugin_name, ..
                } => {
                    self.plugin_commands.insert(name, plugin_name);
                }
                PendingAction::ScheduleTask { task } => {
                    self.tasks.push(task);
                }
                PendingAction::CancelTask {
                    plugin_name,
                    task_id,
                } => {
                    self.tasks
                        .retain(|t| !(t.plugin_name == plugin_name && t.task_id == task_id));
                }
                other => external.push(other),
            }
        }
        external
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
