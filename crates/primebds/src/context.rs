//! State owned by an enabled plugin instance.
//!
//! Created in `on_enable`, dropped in `on_disable`. Every command and event
//! handler receives it explicitly.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use primebds_config::PrimeConfig;
use primebds_ledger::{
    has_log_perms, AuditAction, AuditBuffer, AuditEntry, Clock, GriefLogStore, Identity,
    LedgerResult, ModerationLedger, Rank,
};
use primebds_plugin_api::{CommandSender, DamageCause, PluginPlayer, ServerApi};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use crate::format::{color::*, format_time_remaining, MOD_LOG};
use crate::rtp::RtpTracker;

pub const USERS_DB: &str = "users.db";
pub const GRIEFLOG_DB: &str = "grieflog.db";

/// Last accepted hit per victim, keyed by `type:id`.
#[derive(Debug, Default)]
pub struct CombatState {
    last_hit: HashMap<String, (f64, DamageCause)>,
}

impl CombatState {
    pub fn last_hit_at(&self, key: &str) -> Option<f64> {
        self.last_hit.get(key).map(|(at, _)| *at)
    }

    pub fn last_cause(&self, key: &str) -> Option<DamageCause> {
        self.last_hit.get(key).map(|(_, cause)| *cause)
    }

    pub fn record_hit(&mut self, key: &str, at: f64, cause: DamageCause) {
        self.last_hit.insert(key.to_string(), (at, cause));
    }

    pub fn forget(&mut self, key: &str) {
        self.last_hit.remove(key);
    }
}

pub struct PluginContext {
    pub config: PrimeConfig,
    pub ledger: ModerationLedger,
    pub grieflog: GriefLogStore,
    pub audit: AuditBuffer,
    pub clock: Arc<dyn Clock>,
    pub rtp: RtpTracker,
    pub combat: CombatState,
    /// Unique ids of vanished players.
    pub vanished: HashSet<i64>,
    /// Last logged interaction per XUID, for throttling.
    pub last_interaction: HashMap<String, f64>,
    /// Secondary worlds currently accepting transfers and commands.
    pub loaded_worlds: BTreeSet<String>,
    pub rng: StdRng,
}

impl PluginContext {
    pub fn open(data_dir: &Path, config: PrimeConfig, clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        if let Err(e) = std::fs::create_dir_all(data_dir) {
            error!("Failed to create {}: {e}", data_dir.display());
        }
        let audit = AuditBuffer::new();
        let ledger = ModerationLedger::open(
            data_dir.join(USERS_DB),
            clock.clone(),
            Box::new(audit.clone()),
        )?;
        let grieflog = GriefLogStore::open(data_dir.join(GRIEFLOG_DB))?;
        let loaded_worlds = config
            .modules
            .multiworld
            .worlds
            .iter()
            .filter(|(_, w)| w.enabled)
            .map(|(name, _)| name.clone())
            .collect();

        Ok(Self {
            config,
            ledger,
            grieflog,
            audit,
            clock,
            rtp: RtpTracker::new(),
            combat: CombatState::default(),
            vanished: HashSet::new(),
            last_interaction: HashMap::new(),
            loaded_worlds,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn reload(&mut self, config: PrimeConfig) {
        info!("Configuration reloaded");
        self.config = config;
    }

    pub fn now_secs(&self) -> f64 {
        self.clock.now_secs_f64()
    }

    /// Effective rank of a command sender. The console and host operators
    /// act as Operator.
    pub fn sender_rank(&self, sender: &CommandSender, api: &dyn ServerApi) -> Rank {
        match sender {
            CommandSender::Console => Rank::Operator,
            CommandSender::Player(name) => match find_online(api, name) {
                Some(player) if player.is_op => Rank::Operator,
                Some(player) => self.rank_of(&Identity::session(player.xuid, player.name)),
                None => self.rank_of(&Identity::name(name.as_str())),
            },
        }
    }

    pub fn rank_of(&self, identity: &Identity) -> Rank {
        self.ledger.rank_of(identity).unwrap_or_else(|e| {
            error!("Failed to read rank for {}: {e}", identity.display());
            Rank::Default
        })
    }

    pub fn allowed(&self, sender: &CommandSender, api: &dyn ServerApi, permission: &str) -> bool {
        self.sender_rank(sender, api).grants(permission)
    }

    /// Relay buffered audit entries to online staff, if moderation logging is on.
    pub fn relay_audit(&mut self, api: &mut dyn ServerApi) {
        let entries = self.audit.drain();
        if entries.is_empty() || !self.config.modules.game_logging.moderation.enabled {
            return;
        }
        let now = self.clock.now();
        let staff: Vec<String> = api
            .online_players()
            .into_iter()
            .filter(|p| p.is_op || has_log_perms(self.rank_of(&Identity::session(&p.xuid, &p.name))))
            .map(|p| p.name)
            .collect();
        for entry in &entries {
            let line = format!("{MOD_LOG}{}", audit_line(entry, now));
            for name in &staff {
                api.send_message(name, &line);
            }
        }
    }
}

/// Online player by exact name, falling back to a case-insensitive match.
pub fn find_online(api: &dyn ServerApi, name: &str) -> Option<PluginPlayer> {
    api.get_player(name).or_else(|| {
        api.online_players()
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    })
}

/// Staff-facing description of one moderation action.
pub fn audit_line(entry: &AuditEntry, now: i64) -> String {
    let target = &entry.target_name;
    let by = &entry.initiator;
    let until = format_time_remaining(entry.expiration, now);
    match entry.action {
        AuditAction::Mute => format!(
            "Player {YELLOW}{target} {GOLD}was muted by {YELLOW}{by} {GOLD}for {YELLOW}\"{}\" {GOLD}until {YELLOW}{until}",
            entry.reason
        ),
        AuditAction::Ban => format!(
            "Player {YELLOW}{target} {GOLD}was banned by {YELLOW}{by} {GOLD}for {YELLOW}\"{}\" {GOLD}until {YELLOW}{until}",
            entry.reason
        ),
        AuditAction::Unmute => {
            format!("Player {YELLOW}{target} {GOLD}was unmuted by {YELLOW}{by}")
        }
        AuditAction::Unban => {
            format!("Player {YELLOW}{target} {GOLD}was unbanned by {YELLOW}{by}")
        }
        AuditAction::SetRank(rank) => format!(
            "Player {YELLOW}{target}'s {GOLD}rank was set to {YELLOW}{rank} {GOLD}by {YELLOW}{by}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{player, test_context, MockServer};
    use primebds_ledger::{Length, PlayerProfile};

    #[test]
    fn console_and_ops_are_operators() {
        let (ctx, _clock) = test_context("ctx_ops");
        let mut op = player("Admin", "10");
        op.is_op = true;
        let api = MockServer::with_players(vec![op, player("Steve", "11")]);

        assert_eq!(ctx.sender_rank(&CommandSender::Console, &api), Rank::Operator);
        assert_eq!(
            ctx.sender_rank(&CommandSender::Player("Admin".into()), &api),
            Rank::Operator
        );
        assert_eq!(
            ctx.sender_rank(&CommandSender::Player("steve".into()), &api),
            Rank::Default
        );
        assert!(!ctx.allowed(
            &CommandSender::Player("Steve".into()),
            &api,
            "primebds.command.mute"
        ));
    }

    #[test]
    fn audit_is_relayed_to_staff_only() {
        let (mut ctx, _clock) = test_context("ctx_relay");
        for (xuid, name) in [("1", "Helper"), ("2", "Steve")] {
            ctx.ledger
                .record_join(&PlayerProfile {
                    xuid: xuid.into(),
                    name: name.into(),
                    ..Default::default()
                })
                .unwrap();
        }
        ctx.ledger
            .set_rank("Server", &Identity::session("1", "Helper"), Rank::Helper)
            .unwrap();
        ctx.ledger
            .mute("Server", &Identity::session("2", "Steve"), Length::Permanent, "spam")
            .unwrap();

        let mut api = MockServer::with_players(vec![player("Helper", "1"), player("Steve", "2")]);
        ctx.relay_audit(&mut api);

        // set_rank and mute both reach the helper; nothing reaches Steve.
        assert_eq!(api.messages_to("Helper").len(), 2);
        assert!(api.messages_to("Steve").is_empty());
        assert!(ctx.audit.is_empty());
    }

    #[test]
    fn relay_respects_logging_toggle() {
        let (mut ctx, _clock) = test_context("ctx_toggle");
        ctx.config.modules.game_logging.moderation.enabled = false;
        ctx.ledger
            .record_join(&PlayerProfile {
                xuid: "2".into(),
                name: "Steve".into(),
                ..Default::default()
            })
            .unwrap();
        ctx.ledger
            .ban("Server", &Identity::name("Steve"), Length::Permanent, "x")
            .unwrap();
        let mut op = player("Admin", "9");
        op.is_op = true;
        let mut api = MockServer::with_players(vec![op]);
        ctx.relay_audit(&mut api);
        assert!(api.messages.is_empty());
        assert!(ctx.audit.is_empty());
    }

    #[test]
    fn audit_lines() {
        let entry = AuditEntry {
            initiator: "Mod".into(),
            target_xuid: "1".into(),
            target_name: "Steve".into(),
            action: AuditAction::Mute,
            reason: "spam".into(),
            expiration: Some(3_600),
            timestamp: 0,
        };
        let line = audit_line(&entry, 0);
        assert!(line.contains("was muted by"));
        assert!(line.contains("1 hour"));
    }
}
