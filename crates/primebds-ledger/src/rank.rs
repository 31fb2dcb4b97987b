//! Internal ranks and the permission nodes each rank grants.
//!
//! Ranks are ordered; every rank inherits the nodes of the ranks below it.

use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Rank {
    #[default]
    Default,
    Helper,
    Mod,
    Operator,
}

/// All ranks, lowest first.
pub const RANKS: [Rank; 4] = [Rank::Default, Rank::Helper, Rank::Mod, Rank::Operator];

/// Grants every permission node.
pub const WILDCARD: &str = "*";

const DEFAULT_PERMISSIONS: &[&str] = &[
    "primebds.command.spectate",
    "primebds.command.rtp",
    "primebds.command.ping",
    "primebds.command.playtime",
    "primebds.command.refresh",
];

const HELPER_PERMISSIONS: &[&str] = &[
    "primebds.command.check",
    "primebds.command.monitor",
    "primebds.command.activity",
    "primebds.command.activitylist",
    "primebds.command.logs",
    "primebds.command.inspect",
    "primebds.command.grieflog",
];

const MOD_PERMISSIONS: &[&str] = &[
    "primebds.command.ipban",
    "primebds.command.mute",
    "primebds.command.permban",
    "primebds.command.punishments",
    "primebds.command.removeban",
    "primebds.command.tempban",
    "primebds.command.tempmute",
    "primebds.command.unmute",
    "primebds.command.nickname",
    "primebds.command.vanish",
];

const OPERATOR_PERMISSIONS: &[&str] = &[WILDCARD];

impl Rank {
    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Default => "Default",
            Rank::Helper => "Helper",
            Rank::Mod => "Mod",
            Rank::Operator => "Operator",
        }
    }

    /// Nodes granted by this rank alone, without inheritance.
    fn own_permissions(self) -> &'static [&'static str] {
        match self {
            Rank::Default => DEFAULT_PERMISSIONS,
            Rank::Helper => HELPER_PERMISSIONS,
            Rank::Mod => MOD_PERMISSIONS,
            Rank::Operator => OPERATOR_PERMISSIONS,
        }
    }

    /// All nodes for this rank, including the ones inherited from lower ranks.
    pub fn permissions(self) -> Vec<&'static str> {
        RANKS
            .iter()
            .take_while(|r| **r <= self)
            .flat_map(|r| r.own_permissions().iter().copied())
            .collect()
    }

    /// Whether this rank grants `node`, directly, by inheritance, or by wildcard.
    pub fn grants(self, node: &str) -> bool {
        self.permissions()
            .iter()
            .any(|p| *p == WILDCARD || *p == node)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RANKS
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                LedgerError::InvalidArgument(format!(
                    "unknown rank '{s}', expected one of default, helper, mod, operator"
                ))
            })
    }
}

/// True if the rank may receive moderation log broadcasts (Helper and above).
pub fn has_log_perms(rank: Rank) -> bool {
    rank >= Rank::Helper
}

/// True if `actor` is strictly lower than `target`.
pub fn check_internal_rank(actor: Rank, target: Rank) -> bool {
    actor < target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_ordered() {
        assert!(Rank::Default < Rank::Helper);
        assert!(Rank::Helper < Rank::Mod);
        assert!(Rank::Mod < Rank::Operator);
    }

    #[test]
    fn parse_case_insensitive() {
        assert_eq!("operator".parse::<Rank>().unwrap(), Rank::Operator);
        assert_eq!("MOD".parse::<Rank>().unwrap(), Rank::Mod);
        assert_eq!(" helper ".parse::<Rank>().unwrap(), Rank::Helper);
        assert!(matches!(
            "admin".parse::<Rank>(),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn permissions_are_inherited() {
        let helper = Rank::Helper.permissions();
        assert!(helper.contains(&"primebds.command.spectate"));
        assert!(helper.contains(&"primebds.command.check"));
        assert!(!helper.contains(&"primebds.command.mute"));

        assert!(Rank::Mod.grants("primebds.command.check"));
        assert!(Rank::Mod.grants("primebds.command.tempban"));
        assert!(!Rank::Mod.grants("primebds.command.setrank"));
        assert!(Rank::Operator.grants("primebds.command.setrank"));
        assert!(!Rank::Default.grants("primebds.command.mute"));
    }

    #[test]
    fn log_perms_start_at_helper() {
        assert!(!has_log_perms(Rank::Default));
        assert!(has_log_perms(Rank::Helper));
        assert!(has_log_perms(Rank::Operator));
    }

    #[test]
    fn internal_rank_check_is_strict() {
        assert!(check_internal_rank(Rank::Mod, Rank::Operator));
        assert!(!check_internal_rank(Rank::Mod, Rank::Mod));
        assert!(!check_internal_rank(Rank::Operator, Rank::Default));
    }
}
