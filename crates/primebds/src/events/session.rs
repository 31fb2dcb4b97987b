//! Join, quit, chat and move.

use primebds_ledger::{Identity, PlayerProfile};
use primebds_plugin_api::{EventResult, PluginPlayer, ServerApi, Vec3};
use tracing::{debug, error, info};

use crate::commands::movement::cancel_warmup;
use crate::context::PluginContext;
use crate::format::{ban_message, describe_expiration, format_time_remaining, mute_notice};
use crate::PLUGIN_NAME;

fn profile(player: &PluginPlayer) -> PlayerProfile {
    PlayerProfile {
        xuid: player.xuid.clone(),
        uuid: player.uuid.clone(),
        name: player.name.clone(),
        ping: player.ping,
        device_os: player.device_os.clone(),
        client_version: player.game_version.clone(),
    }
}

pub(crate) fn on_join(ctx: &mut PluginContext, player: &PluginPlayer, api: &mut dyn ServerApi) {
    if let Err(e) = ctx.ledger.record_join(&profile(player)) {
        error!("Failed to record join for {}: {e}", player.name);
    }

    let identity = Identity::session(player.xuid.as_str(), player.name.as_str());
    let status = match ctx.ledger.get_status(&identity) {
        Ok(status) => status,
        Err(e) => {
            error!("Failed to read moderation status for {}: {e}", player.name);
            return;
        }
    };
    let now = ctx.ledger.now();

    if status.ban_active(now) {
        info!("Kicking banned player {}", player.name);
        let level = api.level_name();
        let remaining = format_time_remaining(status.ban_expiration, now);
        api.kick_player(&player.name, &ban_message(&level, &remaining, &status.ban_reason));
        return;
    }
    if status.mute_active(now) {
        let expires = describe_expiration(status.mute_expiration, now);
        api.send_message(&player.name, &mute_notice(&status.mute_reason, &expires));
    }
}

pub(crate) fn on_quit(ctx: &mut PluginContext, player: &PluginPlayer, api: &mut dyn ServerApi) {
    match ctx.ledger.record_leave(&player.xuid) {
        Ok(false) => debug!("{} left without a stored record", player.name),
        Ok(true) => {}
        Err(e) => error!("Failed to record leave for {}: {e}", player.name),
    }
    if let Some(warmup) = ctx.rtp.cancel(&player.xuid) {
        api.cancel_task(PLUGIN_NAME, warmup.task_id);
    }
    ctx.vanished.remove(&player.unique_id);
    ctx.last_interaction.remove(&player.xuid);
    ctx.combat.forget(&format!("minecraft:player:{}", player.unique_id));
}

pub(crate) fn on_chat(ctx: &mut PluginContext, player: &PluginPlayer, api: &mut dyn ServerApi) -> EventResult {
    let identity = Identity::session(player.xuid.as_str(), player.name.as_str());
    let status = match ctx.ledger.get_status(&identity) {
        Ok(status) => status,
        Err(e) => {
            error!("Failed to read moderation status for {}: {e}", player.name);
            return EventResult::Continue;
        }
    };
    let now = ctx.ledger.now();
    if !status.mute_active(now) {
        return EventResult::Continue;
    }
    let expires = describe_expiration(status.mute_expiration, now);
    api.send_message(&player.name, &mute_notice(&status.mute_reason, &expires));
    EventResult::Cancelled
}

pub(crate) fn on_move(ctx: &mut PluginContext, player: &PluginPlayer, to: &Vec3, api: &mut dyn ServerApi) {
    let moved = ctx
        .rtp
        .pending(&player.xuid)
        .is_some_and(|warmup| warmup.moved(to));
    if moved {
        cancel_warmup(ctx, &player.xuid, api);
    }
}
