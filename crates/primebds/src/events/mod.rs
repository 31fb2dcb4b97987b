//! Host event handlers.

pub mod combat;
pub mod grieflog;
pub mod packets;
pub mod session;

use primebds_plugin_api::{EventResult, PluginEvent, ServerApi};

use crate::context::PluginContext;

/// Route one event to its handler.
pub fn dispatch(ctx: &mut PluginContext, event: &mut PluginEvent, api: &mut dyn ServerApi) -> EventResult {
    match event {
        PluginEvent::PlayerJoin { player } => {
            session::on_join(ctx, player, api);
            EventResult::Continue
        }
        PluginEvent::PlayerQuit { player } => {
            session::on_quit(ctx, player, api);
            EventResult::Continue
        }
        PluginEvent::PlayerChat { player, .. } => session::on_chat(ctx, player, api),
        PluginEvent::PlayerMove { player, to, .. } => {
            session::on_move(ctx, player, to, api);
            EventResult::Continue
        }
        PluginEvent::ActorDamage {
            actor,
            damage,
            source,
        } => combat::on_damage(ctx, actor, damage, source),
        PluginEvent::ActorKnockback {
            actor,
            source,
            knockback,
        } => combat::on_knockback(ctx, actor, source.as_ref(), knockback, api),
        PluginEvent::BlockBreak { player, block } => grieflog::on_break(ctx, player, block, api),
        PluginEvent::BlockPlace {
            player,
            against,
            placed,
        } => grieflog::on_place(ctx, player, against, placed, api),
        PluginEvent::PlayerInteract { player, block } => {
            grieflog::on_interact(ctx, player, block.as_ref(), api)
        }
        PluginEvent::PacketSend { packet, .. } => packets::on_send(ctx, packet),
        PluginEvent::ServerStarted | PluginEvent::ServerStopping => EventResult::Continue,
    }
}
