//! Damage and knockback tuning.
//!
//! Every setting is resolved against the tags of the entity dealing the hit,
//! so a tag override can give one kit its own damage or knockback profile.

use primebds_config::CombatKey;
use primebds_plugin_api::{ActorRef, DamageCause, DamageSource, EventResult, ServerApi, Vec3};

use crate::context::PluginContext;

/// Vanilla fall distance before damage starts.
pub const DEFAULT_FALL_HEIGHT: f64 = 3.5;

pub(crate) fn on_damage(
    ctx: &mut PluginContext,
    actor: &ActorRef,
    damage: &mut f32,
    source: &DamageSource,
) -> EventResult {
    let tags = source
        .attacker
        .as_ref()
        .map(|a| a.tags.clone())
        .unwrap_or_default();
    let combat = ctx.config.combat(&tags);
    let modifier = combat.number(CombatKey::BaseDamage).unwrap_or(1.0);
    let cooldown = combat.number(CombatKey::HitCooldown).unwrap_or(0.0);
    let fall_height = combat
        .number(CombatKey::FallDamageHeight)
        .unwrap_or(DEFAULT_FALL_HEIGHT);
    let no_fire = combat.flag(CombatKey::DisableFireDamage);
    let no_explosion = combat.flag(CombatKey::DisableExplosionDamage);

    if no_fire && source.cause.is_fire() {
        return EventResult::Cancelled;
    }
    if no_explosion && source.cause == DamageCause::EntityExplosion {
        return EventResult::Cancelled;
    }
    if fall_height != DEFAULT_FALL_HEIGHT
        && source.cause == DamageCause::Fall
        && f64::from(*damage) * 2.0 < fall_height
    {
        return EventResult::Cancelled;
    }

    if modifier != 1.0 {
        *damage += modifier as f32;
    }

    let key = actor.key();
    let now = ctx.now_secs();
    let ready = ctx
        .combat
        .last_hit_at(&key)
        .map_or(true, |last| now - last >= cooldown);
    if !ready {
        return EventResult::Cancelled;
    }
    ctx.combat.record_hit(&key, now, source.cause);
    EventResult::Continue
}

/// `0` and absent modifiers mean "leave unchanged".
fn or_one(value: Option<f64>) -> f32 {
    match value {
        Some(n) if n != 0.0 => n as f32,
        _ => 1.0,
    }
}

pub(crate) fn on_knockback(
    ctx: &mut PluginContext,
    actor: &ActorRef,
    source: Option<&ActorRef>,
    knockback: &mut Vec3,
    api: &mut dyn ServerApi,
) -> EventResult {
    let Some(source) = source else {
        return EventResult::Continue;
    };
    let source_player = source
        .player_name
        .as_deref()
        .and_then(|name| api.get_player(name));
    let tags = source_player
        .as_ref()
        .map(|p| p.tags.clone())
        .unwrap_or_else(|| source.tags.clone());
    let combat = ctx.config.combat(&tags);
    let kb = *knockback;
    let flat = kb.x == 0.0 || kb.z == 0.0;

    if ctx.combat.last_cause(&actor.key()) == Some(DamageCause::Projectile) {
        let h = combat.number(CombatKey::ProjectileHorizontalKnockback);
        let v = combat.number(CombatKey::ProjectileVerticalKnockback);
        if combat.is_unset(CombatKey::ProjectileHorizontalKnockback)
            && combat.is_unset(CombatKey::ProjectileVerticalKnockback)
        {
            return EventResult::Continue;
        }
        let (h, v) = (or_one(h), or_one(v));
        let (x, z) = if flat {
            (source.velocity.x * h, source.velocity.z * h)
        } else {
            (kb.x * h, kb.z * h)
        };
        *knockback = Vec3::new(x, (kb.y * v).abs(), z);
        return EventResult::Continue;
    }

    let keys = [
        CombatKey::HorizontalKnockback,
        CombatKey::VerticalKnockback,
        CombatKey::HorizontalSprintKnockback,
        CombatKey::VerticalSprintKnockback,
    ];
    if keys.iter().all(|k| combat.is_unset(*k)) {
        return EventResult::Continue;
    }
    let h = or_one(combat.number(CombatKey::HorizontalKnockback));
    let v = or_one(combat.number(CombatKey::VerticalKnockback));
    let sprint_h = or_one(combat.number(CombatKey::HorizontalSprintKnockback));
    let sprint_v = or_one(combat.number(CombatKey::VerticalSprintKnockback));

    let sprinting = source_player.as_ref().is_some_and(|p| p.is_sprinting);
    if sprinting && combat.flag(CombatKey::DisableSprintHits) && kb.y <= 0.0 {
        return EventResult::Cancelled;
    }

    let (mut x, mut z) = if flat {
        let velocity = source_player
            .as_ref()
            .map_or(source.velocity, |p| p.velocity);
        (velocity.x * h, velocity.z * h)
    } else {
        (kb.x * h, kb.z * h)
    };
    let mut y = kb.y * v;
    if sprinting {
        x *= sprint_h;
        z *= sprint_h;
    }
    if kb.y < 0.0 {
        y = y * sprint_v / 2.0;
    }
    *knockback = Vec3::new(x, y.abs(), z);
    EventResult::Continue
}
