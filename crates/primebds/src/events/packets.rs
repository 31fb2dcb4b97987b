//! Outbound packet filtering: vanish and laggy sounds.

use primebds_plugin_api::{EventResult, OutboundPacket};

use crate::context::PluginContext;

/// Sound ids that flood clients when many entities play them at once.
pub const LAGGY_SOUNDS: [u32; 2] = [259, 42];

const PLAYER_ENTITY: &str = "minecraft:player";

pub(crate) fn on_send(ctx: &PluginContext, packet: &OutboundPacket) -> EventResult {
    match packet {
        OutboundPacket::AddPlayer { unique_id, .. } if ctx.vanished.contains(unique_id) => {
            EventResult::Cancelled
        }
        OutboundPacket::LevelSoundEvent {
            sound_id,
            entity_type,
            actor_unique_id,
        } => {
            if ctx.config.modules.server_optimizer.mute_laggy_sounds
                && LAGGY_SOUNDS.contains(sound_id)
            {
                return EventResult::Cancelled;
            }
            if entity_type == PLAYER_ENTITY && ctx.vanished.contains(actor_unique_id) {
                return EventResult::Cancelled;
            }
            EventResult::Continue
        }
        _ => EventResult::Continue,
    }
}
