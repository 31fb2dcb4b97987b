//! `/world`: the multiworld registry.
//!
//! Secondary worlds are separate server processes owned by the host. The
//! plugin only tracks which configured worlds are loaded, transfers players
//! to them, and forwards commands through the host.

use primebds_command::args::player_name;
use primebds_command::{CommandContext, CommandSpec};
use primebds_config::MultiworldSection;
use primebds_plugin_api::{CommandResult, ServerApi};
use tracing::info;

use super::Registry;
use crate::context::{find_online, PluginContext};
use crate::format::{color::*, INFO};

const USAGE: &[&str] = &[
    "/world <create|delete|load|unload> <world_name>",
    "/world cmd <world_name> <command>",
    "/world transfer <world_name> <player>",
    "/world list",
];

pub fn register(registry: &mut Registry) {
    registry.register(
        CommandSpec {
            name: "world",
            description: "Manages PrimeBDS multiworld!",
            usage: USAGE,
            permission: "primebds.command.world",
            aliases: &[],
        },
        world,
    );
}

/// Config key for a world given by key or `level-name`.
fn world_key(multiworld: &MultiworldSection, name: &str) -> Option<String> {
    if multiworld.worlds.contains_key(name) {
        return Some(name.to_string());
    }
    multiworld
        .worlds
        .iter()
        .find(|(_, w)| w.level_name.as_deref() == Some(name))
        .map(|(key, _)| key.clone())
}

fn world(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    let subaction = cmd.arg(0).map(str::to_lowercase);
    let world_name = cmd.arg(1);

    match (subaction.as_deref(), world_name) {
        (Some("list"), _) => list(ctx, api),
        (Some("cmd"), Some(world)) if cmd.args.len() >= 3 => {
            run_command(ctx, api, world, &cmd.args[2..].join(" "))
        }
        (Some("transfer"), Some(world)) if cmd.args.len() >= 3 => {
            transfer(ctx, api, world, player_name(&cmd.args[2]))
        }
        (Some("load"), Some(world)) => load(ctx, world),
        (Some("unload"), Some(world)) => unload(ctx, world),
        (Some("create" | "delete"), Some(_)) => CommandResult::err(format!(
            "{INFO}{RED}Creating and deleting worlds is managed by the host, edit the multiworld config instead."
        )),
        (Some("cmd" | "transfer" | "load" | "unload" | "create" | "delete"), _) => {
            CommandResult::err(format!("Usage: {}", USAGE.join(" | ")))
        }
        (Some(other), _) => CommandResult::err(format!("{INFO}Unknown subaction '{other}'.")),
        (None, _) => CommandResult::err(format!("Usage: {}", USAGE.join(" | "))),
    }
}

fn list(ctx: &PluginContext, api: &dyn ServerApi) -> CommandResult {
    if ctx.loaded_worlds.is_empty() {
        return CommandResult::ok(format!("{INFO}No additional worlds are currently loaded."));
    }
    let multiworld = &ctx.config.modules.multiworld;
    let mut result = CommandResult::ok(format!("{INFO}Loaded worlds:")).with(format!(
        "{DARK_GRAY}- {RESET}{} {ITALIC}{DARK_GRAY}({}:{}) {RESET}{GREEN}[current]{RESET}",
        api.level_name(),
        multiworld.main_ip,
        api.server_port()
    ));
    for name in &ctx.loaded_worlds {
        if let Some(entry) = multiworld.worlds.get(name) {
            let (ip, port) = multiworld.address_of(entry);
            result = result.with(format!(
                "{DARK_GRAY}- {RESET}{name} {ITALIC}{DARK_GRAY}({ip}:{port}){RESET}"
            ));
        }
    }
    result
}

fn run_command(ctx: &PluginContext, api: &mut dyn ServerApi, world: &str, command: &str) -> CommandResult {
    if world == api.level_name() {
        api.dispatch_command(command);
        return CommandResult::ok(format!(
            "{INFO}Command executed on primary world '{world}': {command}"
        ));
    }
    match world_key(&ctx.config.modules.multiworld, world) {
        Some(key) if ctx.loaded_worlds.contains(&key) => {
            api.forward_world_command(&key, command);
            CommandResult::ok(format!("{INFO}Command sent to world '{world}': {command}"))
        }
        _ => CommandResult::err(format!(
            "{INFO}World '{world}' is not loaded or registered."
        )),
    }
}

fn transfer(ctx: &PluginContext, api: &mut dyn ServerApi, world: &str, name: &str) -> CommandResult {
    let Some(player) = find_online(api, name) else {
        return CommandResult::err(format!("{INFO}Player '{name}' not found."));
    };
    let multiworld = &ctx.config.modules.multiworld;

    let (ip, port) = if world == api.level_name() {
        (multiworld.main_ip.clone(), api.server_port())
    } else {
        let Some(key) = world_key(multiworld, world) else {
            return CommandResult::err(format!(
                "{INFO}World '{world}' not found in configuration."
            ));
        };
        if !ctx.loaded_worlds.contains(&key) {
            return CommandResult::err(format!("{INFO}World '{world}' is not loaded."));
        }
        match multiworld.worlds.get(&key) {
            Some(entry) => multiworld.address_of(entry),
            None => {
                return CommandResult::err(format!(
                    "{INFO}World '{world}' not found in configuration."
                ))
            }
        }
    };

    api.transfer_player(&player.name, &ip, port);
    info!("Transferred {} to {world} ({ip}:{port})", player.name);
    CommandResult::ok(format!(
        "{INFO}Transferred player '{}' to world '{world}' ({ip}:{port}).",
        player.name
    ))
}

fn load(ctx: &mut PluginContext, world: &str) -> CommandResult {
    let Some(key) = world_key(&ctx.config.modules.multiworld, world) else {
        return CommandResult::err(format!(
            "{INFO}World '{world}' not found in configuration."
        ));
    };
    if !ctx.loaded_worlds.insert(key.clone()) {
        return CommandResult::err(format!("{INFO}World '{key}' is already loaded."));
    }
    info!("World {key} loaded");
    CommandResult::ok(format!("{INFO}World '{key}' loaded."))
}

fn unload(ctx: &mut PluginContext, world: &str) -> CommandResult {
    let key = world_key(&ctx.config.modules.multiworld, world).unwrap_or_else(|| world.to_string());
    if !ctx.loaded_worlds.remove(&key) {
        return CommandResult::err(format!("{INFO}World '{world}' is not loaded."));
    }
    info!("World {key} unloaded");
    CommandResult::ok(format!("{INFO}World '{key}' unloaded."))
}
