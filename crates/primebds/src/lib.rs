//! PrimeBDS: server administration for Bedrock hosts.
//!
//! Moderation (mutes, bans, ranks), combat tuning by scoreboard tag, grief
//! logging, random teleport, spectating, vanish and multiworld routing. The
//! host drives everything through the [`Plugin`] trait.

pub mod commands;
pub mod context;
pub mod events;
pub mod format;
pub mod rtp;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use primebds_command::CommandContext;
use primebds_config::PrimeConfig;
use primebds_ledger::{Clock, SystemClock};
use primebds_plugin_api::{
    CommandResult, CommandSender, EventResult, Plugin, PluginEvent, PluginInfo, ServerApi,
};
use tracing::{error, info, warn};

use crate::commands::Registry;
use crate::context::PluginContext;
use crate::format::color::RED;

pub const PLUGIN_NAME: &str = "PrimeBDS";

pub struct PrimeBds {
    registry: Registry,
    ctx: Option<PluginContext>,
    config: PrimeConfig,
    data_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl PrimeBds {
    /// Plugin storing its databases under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(data_dir, Arc::new(SystemClock))
    }

    pub fn with_clock(data_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let mut registry = Registry::new();
        commands::register_all(&mut registry);
        Self {
            registry,
            ctx: None,
            config: PrimeConfig::default(),
            data_dir: data_dir.into(),
            clock,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ctx.is_some()
    }

    pub fn context(&self) -> Option<&PluginContext> {
        self.ctx.as_ref()
    }
}

impl Plugin for PrimeBds {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: PLUGIN_NAME.into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description: env!("CARGO_PKG_DESCRIPTION").into(),
            author: "PrimeBDS".into(),
        }
    }

    fn on_enable(&mut self, api: &mut dyn ServerApi) {
        match PluginContext::open(&self.data_dir, self.config.clone(), self.clock.clone()) {
            Ok(ctx) => self.ctx = Some(ctx),
            Err(e) => {
                error!("PrimeBDS failed to open its databases: {e}");
                return;
            }
        }
        for (name, description) in self.registry.routable_names() {
            api.register_command(name, description, PLUGIN_NAME);
        }
        info!(
            "PrimeBDS enabled with {} commands, data in {}",
            self.registry.entries().count(),
            self.data_dir.display()
        );
    }

    fn on_disable(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            let dropped = ctx.rtp.clear();
            if !dropped.is_empty() {
                info!("Dropped {} pending rtp warmups", dropped.len());
            }
        }
        info!("PrimeBDS disabled");
    }

    fn on_event(&mut self, event: &mut PluginEvent, api: &mut dyn ServerApi) -> EventResult {
        match self.ctx.as_mut() {
            Some(ctx) => events::dispatch(ctx, event, api),
            None => EventResult::Continue,
        }
    }

    fn on_task(&mut self, task_id: u32, api: &mut dyn ServerApi) {
        if let Some(ctx) = self.ctx.as_mut() {
            commands::movement::rtp_task(ctx, task_id, api);
        }
    }

    fn on_command(
        &mut self,
        command: &str,
        args: &[String],
        sender: &CommandSender,
        api: &mut dyn ServerApi,
    ) -> Option<CommandResult> {
        let entry = self.registry.get(command)?;
        let Some(ctx) = self.ctx.as_mut() else {
            return Some(CommandResult::err(format!("{RED}PrimeBDS is not available")));
        };
        if !ctx.allowed(sender, api, entry.spec.permission) {
            return Some(CommandResult::err(format!(
                "{RED}You do not have permission to use /{}",
                entry.spec.name
            )));
        }

        let cmd = CommandContext::new(sender.clone(), args.to_vec());
        let result = (entry.handler)(ctx, &cmd, api);
        ctx.relay_audit(api);
        Some(result)
    }

    fn default_config(&self) -> Option<serde_json::Value> {
        match PrimeConfig::default().to_value() {
            Ok(value) => Some(value),
            Err(e) => {
                error!("Failed to serialize default config: {e}");
                None
            }
        }
    }

    fn load_config(&mut self, config: serde_json::Value) {
        let config = match PrimeConfig::from_value(config) {
            Ok(config) => config,
            Err(e) => {
                warn!("Invalid PrimeBDS config, keeping the previous one: {e}");
                return;
            }
        };
        if let Some(ctx) = self.ctx.as_mut() {
            ctx.reload(config.clone());
        }
        self.config = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{player, temp_dir, MockServer};
    use primebds_ledger::{Identity, ManualClock, Rank};
    use primebds_plugin_api::Vec3;
    use serde_json::json;

    fn enabled(tag: &str) -> (PrimeBds, MockServer, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at(1_700_000_000));
        let mut plugin = PrimeBds::with_clock(temp_dir(tag), clock.clone());
        let mut api = MockServer::with_players(Vec::new());
        plugin.on_enable(&mut api);
        (plugin, api, clock)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn enable_registers_commands_and_aliases() {
        let (plugin, api, _clock) = enabled("lib_enable");
        assert!(plugin.is_enabled());
        for name in ["mute", "tempban", "check", "setrank", "rtp", "wild", "rs", "world", "vanish"] {
            assert!(api.registered.iter().any(|n| n == name), "{name}");
        }
    }

    #[test]
    fn unknown_command_is_not_ours() {
        let (mut plugin, mut api, _clock) = enabled("lib_unknown");
        assert!(plugin
            .on_command("gamemode", &[], &CommandSender::Console, &mut api)
            .is_none());
    }

    #[test]
    fn permissions_gate_commands() {
        let (mut plugin, _api, _clock) = enabled("lib_perms");
        let mut api = MockServer::with_players(vec![player("Steve", "1"), player("Alex", "2")]);
        for p in api.players.clone() {
            plugin.on_event(&mut PluginEvent::PlayerJoin { player: p }, &mut api);
        }

        let steve = CommandSender::Player("Steve".into());
        let denied = plugin
            .on_command("mute", &args(&["Alex"]), &steve, &mut api)
            .unwrap();
        assert!(!denied.success);
        assert!(denied.messages[0].contains("permission"));

        let console = plugin
            .on_command("setrank", &args(&["Steve", "mod"]), &CommandSender::Console, &mut api)
            .unwrap();
        assert!(console.success);

        let allowed = plugin
            .on_command("mute", &args(&["Alex", "spam"]), &steve, &mut api)
            .unwrap();
        assert!(allowed.success, "{:?}", allowed.messages);
        let ctx = plugin.context().unwrap();
        assert_eq!(ctx.rank_of(&Identity::name("Steve")), Rank::Mod);
        assert!(ctx
            .ledger
            .get_status(&Identity::name("Alex"))
            .unwrap()
            .mute_active(ctx.ledger.now()));
    }

    #[test]
    fn moderation_reaches_online_staff() {
        let (mut plugin, _api, _clock) = enabled("lib_relay");
        let mut op = player("Admin", "9");
        op.is_op = true;
        let mut api = MockServer::with_players(vec![op, player("Alex", "2")]);
        for p in api.players.clone() {
            plugin.on_event(&mut PluginEvent::PlayerJoin { player: p }, &mut api);
        }

        plugin
            .on_command("permban", &args(&["Alex", "xray"]), &CommandSender::Console, &mut api)
            .unwrap();
        assert_eq!(api.kicks.len(), 1);
        let to_admin = api.messages_to("Admin");
        assert_eq!(to_admin.len(), 1);
        assert!(to_admin[0].contains("was banned by"));
    }

    #[test]
    fn late_task_after_movement_never_teleports() {
        let (mut plugin, _api, clock) = enabled("lib_race");
        let mut api = MockServer::with_players(vec![player("Steve", "1")]);
        let steve = CommandSender::Player("Steve".into());

        let started = plugin.on_command("rtp", &[], &steve, &mut api).unwrap();
        assert!(started.success);
        let task_id = api.scheduled[0].0;

        // The player moves; the host has not applied the cancellation yet
        // when the task fires again.
        let moved_to = Vec3::new(3.0, 64.0, 0.0);
        let mut event = PluginEvent::PlayerMove {
            player: player("Steve", "1"),
            from: Vec3::new(0.0, 64.0, 0.0),
            to: moved_to,
        };
        plugin.on_event(&mut event, &mut api);
        api.move_player("Steve", moved_to);
        clock.advance_secs(10);
        plugin.on_task(task_id, &mut api);

        assert!(api.teleports.is_empty());
        assert_eq!(api.cancelled, vec![task_id]);
    }

    #[test]
    fn config_reload_applies_to_running_context() {
        let (mut plugin, _api, _clock) = enabled("lib_reload");
        let default = plugin.default_config().unwrap();
        assert_eq!(default["modules"]["rtp"]["radius"], 1000.0);

        plugin.load_config(json!({ "modules": { "grieflog": { "enabled": true } } }));
        assert!(plugin.context().unwrap().config.modules.grieflog.enabled);

        plugin.load_config(json!({ "modules": { "rtp": { "radius": "far" } } }));
        assert!(plugin.context().unwrap().config.modules.grieflog.enabled);
    }

    #[test]
    fn disable_drops_context() {
        let (mut plugin, mut api, _clock) = enabled("lib_disable");
        plugin.on_disable();
        assert!(!plugin.is_enabled());
        let result = plugin
            .on_command("check", &args(&["Steve"]), &CommandSender::Console, &mut api)
            .unwrap();
        assert!(!result.success);
        assert_eq!(
            plugin.on_event(&mut PluginEvent::ServerStarted, &mut api),
            EventResult::Continue
        );
    }
}
