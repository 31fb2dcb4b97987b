//! Tag-priority resolution of combat settings.
//!
//! A combat tree holds global defaults plus a `tag_overrides` map from tag
//! name to a partial tree. Resolving a key walks the caller's tags in the
//! order given; the first tag whose override defines the key wins, otherwise
//! the global default applies.

use serde_json::Value;

/// Every combat key the schema recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatKey {
    BaseDamage,
    HitCooldown,
    FallDamageHeight,
    DisableFireDamage,
    DisableExplosionDamage,
    HorizontalKnockback,
    VerticalKnockback,
    HorizontalSprintKnockback,
    VerticalSprintKnockback,
    DisableSprintHits,
    ProjectileHorizontalKnockback,
    ProjectileVerticalKnockback,
}

impl CombatKey {
    pub const ALL: [CombatKey; 12] = [
        CombatKey::BaseDamage,
        CombatKey::HitCooldown,
        CombatKey::FallDamageHeight,
        CombatKey::DisableFireDamage,
        CombatKey::DisableExplosionDamage,
        CombatKey::HorizontalKnockback,
        CombatKey::VerticalKnockback,
        CombatKey::HorizontalSprintKnockback,
        CombatKey::VerticalSprintKnockback,
        CombatKey::DisableSprintHits,
        CombatKey::ProjectileHorizontalKnockback,
        CombatKey::ProjectileVerticalKnockback,
    ];

    /// Dotted path inside the combat tree.
    pub fn path(self) -> &'static str {
        match self {
            CombatKey::BaseDamage => "base_damage",
            CombatKey::HitCooldown => "hit_cooldown_in_seconds",
            CombatKey::FallDamageHeight => "fall_damage_height",
            CombatKey::DisableFireDamage => "disable_fire_damage",
            CombatKey::DisableExplosionDamage => "disable_explosion_damage",
            CombatKey::HorizontalKnockback => "horizontal_knockback_modifier",
            CombatKey::VerticalKnockback => "vertical_knockback_modifier",
            CombatKey::HorizontalSprintKnockback => "horizontal_sprint_knockback_modifier",
            CombatKey::VerticalSprintKnockback => "vertical_sprint_knockback_modifier",
            CombatKey::DisableSprintHits => "disable_sprint_hits",
            CombatKey::ProjectileHorizontalKnockback => "projectiles.horizontal_knockback_modifier",
            CombatKey::ProjectileVerticalKnockback => "projectiles.vertical_knockback_modifier",
        }
    }
}

/// Walk a dotted path. Stops at the first missing segment or non-object node.
pub fn lookup<'a>(node: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(node, |current, segment| current.as_object()?.get(segment))
}

/// Effective value of `key` for an entity carrying `tags`.
///
/// A JSON `null` counts as undefined at every level.
pub fn resolve<'a, S: AsRef<str>>(tree: &'a Value, tags: &[S], key: &str) -> Option<&'a Value> {
    if let Some(overrides) = tree.get("tag_overrides") {
        for tag in tags {
            let hit = overrides
                .get(tag.as_ref())
                .and_then(|partial| lookup(partial, key))
                .filter(|v| !v.is_null());
            if hit.is_some() {
                return hit;
            }
        }
    }
    lookup(tree, key).filter(|v| !v.is_null())
}

/// Numeric value of `key`, with `0` and absence both mapped to `fallback`.
pub fn resolve_numeric_or<S: AsRef<str>>(tree: &Value, tags: &[S], key: &str, fallback: f64) -> f64 {
    match resolve(tree, tags, key).and_then(Value::as_f64) {
        Some(n) if n != 0.0 => n,
        _ => fallback,
    }
}

/// Typed view over a combat tree for one set of tags.
#[derive(Debug, Clone, Copy)]
pub struct CombatResolver<'a> {
    tree: &'a Value,
    tags: &'a [String],
}

impl<'a> CombatResolver<'a> {
    pub fn new(tree: &'a Value, tags: &'a [String]) -> Self {
        Self { tree, tags }
    }

    pub fn value(&self, key: CombatKey) -> Option<&'a Value> {
        resolve(self.tree, self.tags, key.path())
    }

    pub fn number(&self, key: CombatKey) -> Option<f64> {
        self.value(key).and_then(Value::as_f64)
    }

    pub fn number_or(&self, key: CombatKey, fallback: f64) -> f64 {
        resolve_numeric_or(self.tree, self.tags, key.path(), fallback)
    }

    /// True for `true` and for any non-zero number.
    pub fn flag(&self, key: CombatKey) -> bool {
        match self.value(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        }
    }

    /// True when the key is absent or zero.
    pub fn is_unset(&self, key: CombatKey) -> bool {
        !self.number(key).is_some_and(|n| n != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn explicit_zero_override() {
        let tree = json!({
            "horizontal_knockback_modifier": 1.0,
            "tag_overrides": { "frozen": { "horizontal_knockback_modifier": 0.0 } }
        });
        let tags = tags(&["frozen", "default"]);
        let key = "horizontal_knockback_modifier";

        assert_eq!(resolve(&tree, &tags, key), Some(&json!(0.0)));
        assert_eq!(resolve_numeric_or(&tree, &tags, key, 1.0), 1.0);
    }

    #[test]
    fn missing_segment_short_circuits() {
        let tree = json!({ "a": { "b": 1 } });
        let none: [&str; 0] = [];
        assert_eq!(resolve(&tree, &none, "a.c.d"), None);
        assert_eq!(resolve(&tree, &none, "a.b.c"), None);
        assert_eq!(resolve(&tree, &none, "a.b"), Some(&json!(1)));
    }

    #[test]
    fn first_matching_tag_wins() {
        let tree = json!({
            "base_damage": 1,
            "tag_overrides": {
                "vip": { "base_damage": 3 },
                "boss": { "base_damage": 10 },
                "empty": {}
            }
        });
        assert_eq!(resolve(&tree, &["empty", "boss", "vip"], "base_damage"), Some(&json!(10)));
        assert_eq!(resolve(&tree, &["vip", "boss"], "base_damage"), Some(&json!(3)));
        assert_eq!(resolve(&tree, &["nobody"], "base_damage"), Some(&json!(1)));
    }

    #[test]
    fn nested_override_paths() {
        let tree = json!({
            "projectiles": { "horizontal_knockback_modifier": 2.0 },
            "tag_overrides": {
                "archer": { "projectiles": { "vertical_knockback_modifier": 0.5 } }
            }
        });
        let archer = tags(&["archer"]);
        let combat = CombatResolver::new(&tree, &archer);
        assert_eq!(combat.number(CombatKey::ProjectileVerticalKnockback), Some(0.5));
        assert_eq!(combat.number(CombatKey::ProjectileHorizontalKnockback), Some(2.0));
    }

    #[test]
    fn null_is_undefined() {
        let tree = json!({
            "base_damage": 2,
            "tag_overrides": { "x": { "base_damage": null } }
        });
        assert_eq!(resolve(&tree, &["x"], "base_damage"), Some(&json!(2)));
    }

    #[test]
    fn flags_and_unset() {
        let tree = json!({
            "disable_fire_damage": true,
            "disable_sprint_hits": 1,
            "vertical_knockback_modifier": 0
        });
        let no_tags = Vec::new();
        let combat = CombatResolver::new(&tree, &no_tags);
        assert!(combat.flag(CombatKey::DisableFireDamage));
        assert!(combat.flag(CombatKey::DisableSprintHits));
        assert!(!combat.flag(CombatKey::DisableExplosionDamage));
        assert!(combat.is_unset(CombatKey::VerticalKnockback));
        assert!(combat.is_unset(CombatKey::HorizontalKnockback));
        assert_eq!(combat.number_or(CombatKey::VerticalKnockback, 1.0), 1.0);
    }

    #[test]
    fn every_key_has_a_default() {
        let tree = serde_json::to_value(crate::schema::CombatSection::default()).unwrap();
        for key in CombatKey::ALL {
            assert!(lookup(&tree, key.path()).is_some(), "{key:?}");
        }
    }
}
