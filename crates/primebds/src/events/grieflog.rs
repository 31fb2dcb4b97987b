//! Block break, place and container-interaction logging, plus inspect mode.

use primebds_ledger::{is_logged_container, GriefAction, GriefLogEntry};
use primebds_plugin_api::{BlockInfo, EventResult, PluginPlayer, ServerApi};
use tracing::error;

use crate::context::PluginContext;
use crate::format::{color::*, est_timestamp, INFO};

/// Minimum seconds between two logged interactions by one player.
pub const INTERACT_THROTTLE_SECS: f64 = 0.5;

fn enabled(ctx: &PluginContext) -> bool {
    ctx.config.modules.grieflog.enabled
}

fn inspecting(ctx: &PluginContext, player: &PluginPlayer) -> bool {
    ctx.grieflog.inspect_mode(&player.xuid).unwrap_or_else(|e| {
        error!("Failed to read inspect mode for {}: {e}", player.name);
        false
    })
}

/// Show what happened at `block` to an inspecting player.
fn show_logs(ctx: &PluginContext, player: &PluginPlayer, block: &BlockInfo, api: &mut dyn ServerApi) {
    let pos = block.position;
    let logs = match ctx.grieflog.logs_at(pos.x, pos.y, pos.z, &block.dimension) {
        Ok(logs) => logs,
        Err(e) => {
            error!("Failed to read grief log at {pos:?}: {e}");
            return;
        }
    };
    if logs.is_empty() {
        api.send_message(
            &player.name,
            &format!("{INFO}No logs found at {YELLOW}{}, {}, {}", pos.x, pos.y, pos.z),
        );
        return;
    }
    api.send_message(
        &player.name,
        &format!("{INFO}Logs at {YELLOW}{}, {}, {}{WHITE}:", pos.x, pos.y, pos.z),
    );
    for log in &logs {
        api.send_message(
            &player.name,
            &format!(
                "{DARK_GRAY}- {YELLOW}{} {GRAY}{} {WHITE}{} {GRAY}[{}] {DARK_GRAY}{}",
                log.name,
                log.action,
                log.block_type,
                log.block_state,
                est_timestamp(log.timestamp)
            ),
        );
    }
}

fn record(ctx: &PluginContext, player: &PluginPlayer, action: GriefAction, block: &BlockInfo, states: &[String]) {
    let entry = GriefLogEntry {
        xuid: player.xuid.clone(),
        name: player.name.clone(),
        action: action.as_str().to_string(),
        x: block.position.x,
        y: block.position.y,
        z: block.position.z,
        dimension: block.dimension.clone(),
        timestamp: ctx.ledger.now(),
        block_type: block.block_type.clone(),
        block_state: states.join(", "),
    };
    if let Err(e) = ctx.grieflog.log_action(&entry) {
        error!("Failed to log {} by {}: {e}", action.as_str(), player.name);
    }
}

pub(crate) fn on_break(
    ctx: &mut PluginContext,
    player: &PluginPlayer,
    block: &BlockInfo,
    api: &mut dyn ServerApi,
) -> EventResult {
    if !enabled(ctx) {
        return EventResult::Continue;
    }
    if inspecting(ctx, player) {
        show_logs(ctx, player, block, api);
        return EventResult::Cancelled;
    }
    record(ctx, player, GriefAction::BlockBreak, block, &block.states);
    EventResult::Continue
}

/// Logged at the placed block's position, with the clicked block's states.
pub(crate) fn on_place(
    ctx: &mut PluginContext,
    player: &PluginPlayer,
    against: &BlockInfo,
    placed: &BlockInfo,
    api: &mut dyn ServerApi,
) -> EventResult {
    if !enabled(ctx) {
        return EventResult::Continue;
    }
    if inspecting(ctx, player) {
        show_logs(ctx, player, against, api);
        return EventResult::Cancelled;
    }
    record(ctx, player, GriefAction::BlockPlace, placed, &against.states);
    EventResult::Continue
}

pub(crate) fn on_interact(
    ctx: &mut PluginContext,
    player: &PluginPlayer,
    block: Option<&BlockInfo>,
    api: &mut dyn ServerApi,
) -> EventResult {
    if !enabled(ctx) {
        return EventResult::Continue;
    }
    let now = ctx.now_secs();
    if let Some(last) = ctx.last_interaction.get(&player.xuid) {
        if now - last < INTERACT_THROTTLE_SECS {
            return EventResult::Continue;
        }
    }
    ctx.last_interaction.insert(player.xuid.clone(), now);

    let Some(block) = block else {
        return EventResult::Continue;
    };
    if inspecting(ctx, player) {
        show_logs(ctx, player, block, api);
        return EventResult::Cancelled;
    }
    if is_logged_container(&block.block_type) {
        record(ctx, player, GriefAction::OpenedContainer, block, &block.states);
    }
    EventResult::Continue
}
