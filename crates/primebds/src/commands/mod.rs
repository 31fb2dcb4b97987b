//! Chat commands. Each submodule registers its own handlers.

pub mod info;
pub mod management;
pub mod moderation;
pub mod movement;
pub mod world;

use primebds_command::CommandRegistry;
use primebds_ledger::{check_internal_rank, Identity, LedgerError};
use primebds_plugin_api::{CommandResult, CommandSender, PluginPlayer, ServerApi};
use tracing::error;

use crate::context::{find_online, PluginContext};
use crate::format::{color::*, describe_expiration, ERROR};

pub type Registry = CommandRegistry<PluginContext>;

pub fn register_all(registry: &mut Registry) {
    moderation::register(registry);
    info::register(registry);
    management::register(registry);
    movement::register(registry);
    world::register(registry);
}

/// Identity for a name argument: the live session if the player is online.
pub(crate) fn target(api: &dyn ServerApi, name: &str) -> (Identity, Option<PluginPlayer>) {
    match find_online(api, name) {
        Some(player) => (
            Identity::session(player.xuid.as_str(), player.name.as_str()),
            Some(player),
        ),
        None => (Identity::name(name), None),
    }
}

/// Refuse to act on a target ranked above the sender.
pub(crate) fn guard_rank(
    ctx: &PluginContext,
    sender: &CommandSender,
    api: &dyn ServerApi,
    target: &Identity,
) -> Result<(), LedgerError> {
    let actor_rank = ctx.sender_rank(sender, api);
    let target_rank = ctx.rank_of(target);
    if check_internal_rank(actor_rank, target_rank) {
        return Err(LedgerError::Unauthorized {
            actor: sender.name().to_string(),
            actor_rank,
            target: target.display().to_string(),
            target_rank,
        });
    }
    Ok(())
}

/// The sending player, or an error result for console senders.
pub(crate) fn require_player(
    sender: &CommandSender,
    api: &dyn ServerApi,
) -> Result<PluginPlayer, CommandResult> {
    let name = sender
        .player_name()
        .ok_or_else(|| CommandResult::err(format!("{RED}This command can only be executed by a player")))?;
    find_online(api, name)
        .ok_or_else(|| CommandResult::err(format!("{RED}Could not find your player session")))
}

/// Turn a ledger error into a chat message.
pub(crate) fn describe(err: &LedgerError, now: i64) -> String {
    match err {
        LedgerError::NotFound(name) => format!("{RED}Player {YELLOW}{name}{RED} not found."),
        LedgerError::InvalidArgument(msg) => format!("{RED}{msg}"),
        LedgerError::AlreadyMuted {
            name,
            reason,
            expiration,
        } => format!(
            "Player {YELLOW}{name} {GOLD}is already muted for {YELLOW}{reason}{GOLD}, the mute expires {YELLOW}{}",
            describe_expiration(*expiration, now)
        ),
        LedgerError::NotMuted(name) => format!("Player {YELLOW}{name} {GOLD}is not muted"),
        LedgerError::AlreadyBanned {
            name,
            reason,
            expiration,
        } => format!(
            "Player {YELLOW}{name} {GOLD}is already banned for {YELLOW}{reason}{GOLD}, the ban expires {YELLOW}{}",
            describe_expiration(*expiration, now)
        ),
        LedgerError::NotBanned(name) => format!("Player {YELLOW}{name} {GOLD}is not banned"),
        LedgerError::SameRank { name, rank } => {
            format!("{ERROR}Player {name} already has the rank {rank}. No changes made.")
        }
        LedgerError::Unauthorized {
            target,
            target_rank,
            actor_rank,
            ..
        } => format!(
            "{ERROR}You cannot act on {target}: their rank ({target_rank}) is above yours ({actor_rank})"
        ),
        LedgerError::Storage(e) => {
            error!("Database error: {e}");
            format!("{ERROR}Database error, see the server log")
        }
    }
}

pub(crate) fn failure(err: &LedgerError, now: i64) -> CommandResult {
    CommandResult::err(describe(err, now))
}
