//! check, punishments.

use primebds_command::args::player_name;
use primebds_command::selector::reject_selectors;
use primebds_command::{CommandContext, CommandSpec};
use primebds_ledger::LedgerError;
use primebds_plugin_api::{CommandResult, ServerApi};

use super::{failure, target, Registry};
use crate::context::PluginContext;
use crate::format::{color::*, est_timestamp};

/// Entries shown by `/punishments`.
const HISTORY_LIMIT: usize = 10;

pub fn register(registry: &mut Registry) {
    registry.register(
        CommandSpec {
            name: "check",
            description: "Checks a player's client info!",
            usage: &["/check <player>"],
            permission: "primebds.command.check",
            aliases: &[],
        },
        check,
    );
    registry.register(
        CommandSpec {
            name: "punishments",
            description: "Shows a player's punishment history!",
            usage: &["/punishments <player>"],
            permission: "primebds.command.punishments",
            aliases: &[],
        },
        punishments,
    );
}

fn check(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    let Some(arg) = cmd.arg(0) else {
        return CommandResult::err("Usage: /check <player>");
    };
    if let Err(msg) = reject_selectors(&cmd.args) {
        return CommandResult::err(msg);
    }
    let name = player_name(arg);
    let (identity, online) = target(api, name);
    let now = ctx.ledger.now();

    let record = match ctx.ledger.get_player(&identity) {
        Ok(record) => Some(record),
        Err(LedgerError::NotFound(_)) if online.is_some() => None,
        Err(LedgerError::NotFound(_)) => {
            return CommandResult::err(format!(
                "{RED}Player {YELLOW}{name}{RED} not found in database."
            ))
        }
        Err(e) => return failure(&e, now),
    };

    let rank = record.as_ref().map(|r| r.rank).unwrap_or_default();
    let last_join = record
        .as_ref()
        .map(|r| est_timestamp(r.last_join))
        .unwrap_or_else(|| "N/A".to_string());
    let last_leave = record
        .as_ref()
        .and_then(|r| r.last_leave)
        .map(est_timestamp)
        .unwrap_or_else(|| "N/A".to_string());

    let (name, xuid, uuid, device, version, ping, status) = match (&online, &record) {
        (Some(p), _) => (
            p.name.clone(),
            p.xuid.clone(),
            p.uuid.clone(),
            p.device_os.clone(),
            p.game_version.clone(),
            format!("{}ms", p.ping),
            format!("{GREEN}Online"),
        ),
        (None, Some(r)) => (
            r.name.clone(),
            r.xuid.clone(),
            r.uuid.clone(),
            r.device_os.clone(),
            r.client_version.clone(),
            format!("{}ms {GRAY}[Last Recorded{GRAY}]", r.ping),
            format!("{RED}Offline"),
        ),
        (None, None) => return CommandResult::err(format!("{RED}Player {YELLOW}{name}{RED} not found.")),
    };

    CommandResult::ok(format!("{AQUA}Player Information:"))
        .with(format!("{DARK_GRAY}---------------"))
        .with(format!("{YELLOW}Name: {WHITE}{name} {GRAY}[{status}{GRAY}]"))
        .with(format!("{YELLOW}XUID: {WHITE}{xuid}"))
        .with(format!("{YELLOW}UUID: {WHITE}{uuid}"))
        .with(format!("{YELLOW}Internal Rank: {WHITE}{rank}"))
        .with(format!("{YELLOW}Device OS: {WHITE}{device}"))
        .with(format!("{YELLOW}Client Version: {WHITE}{version}"))
        .with(format!("{YELLOW}Ping: {WHITE}{ping}"))
        .with(format!("{YELLOW}Last Join: {WHITE}{last_join}"))
        .with(format!("{YELLOW}Last Leave: {WHITE}{last_leave}"))
        .with(format!("{DARK_GRAY}---------------"))
}

fn punishments(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    let Some(arg) = cmd.arg(0) else {
        return CommandResult::err("Usage: /punishments <player>");
    };
    if let Err(msg) = reject_selectors(&cmd.args) {
        return CommandResult::err(msg);
    }
    let (identity, _) = target(api, player_name(arg));
    let now = ctx.ledger.now();

    let history = match ctx.ledger.history(&identity, HISTORY_LIMIT) {
        Ok(history) => history,
        Err(e) => return failure(&e, now),
    };
    if history.is_empty() {
        return CommandResult::ok(format!(
            "{GOLD}No punishment history for {YELLOW}{}",
            identity.display()
        ));
    }

    let mut result = CommandResult::ok(format!(
        "{AQUA}Punishments for {YELLOW}{}{AQUA}:",
        history[0].name
    ));
    for entry in &history {
        let expiry = match entry.expiration {
            Some(exp) => format!(" {GRAY}(until {})", est_timestamp(exp)),
            None => String::new(),
        };
        result = result.with(format!(
            "{DARK_GRAY}- {YELLOW}{} {GRAY}by {YELLOW}{} {GRAY}on {}{GRAY}: {WHITE}{}{expiry}",
            entry.action,
            entry.initiator,
            est_timestamp(entry.timestamp),
            entry.reason
        ));
    }
    result
}
