//! mute, tempmute, unmute, permban, tempban, removeban.

use primebds_command::args::{self, player_name};
use primebds_command::selector::reject_selectors;
use primebds_command::{CommandContext, CommandSpec};
use primebds_ledger::{parse_length, Length};
use primebds_plugin_api::{CommandResult, ServerApi};

use super::{failure, guard_rank, target, Registry};
use crate::context::PluginContext;
use crate::format::{ban_message, color::*, describe_expiration, format_time_remaining, mute_notice};

const MUTE_REASON: &str = "Negative Behavior";
const TEMPMUTE_REASON: &str = "Disruptive Behavior";
const BAN_REASON: &str = "Negative Behavior";

pub fn register(registry: &mut Registry) {
    registry.register(
        CommandSpec {
            name: "mute",
            description: "Permanently mutes a player from the server!",
            usage: &["/mute <player> [reason]"],
            permission: "primebds.command.mute",
            aliases: &[],
        },
        mute,
    );
    registry.register(
        CommandSpec {
            name: "tempmute",
            description: "Temporarily mutes a player on the server!",
            usage: &["/tempmute <player> <duration_number> (second|minute|hour|day|week|month|year) [reason]"],
            permission: "primebds.command.tempmute",
            aliases: &[],
        },
        tempmute,
    );
    registry.register(
        CommandSpec {
            name: "unmute",
            description: "Removes an active mute from a player!",
            usage: &["/unmute <player>"],
            permission: "primebds.command.unmute",
            aliases: &[],
        },
        unmute,
    );
    registry.register(
        CommandSpec {
            name: "permban",
            description: "Permanently bans a player from the server!",
            usage: &["/permban <player> [reason]"],
            permission: "primebds.command.permban",
            aliases: &[],
        },
        permban,
    );
    registry.register(
        CommandSpec {
            name: "tempban",
            description: "Temporarily bans a player from the server!",
            usage: &["/tempban <player> <duration_number> (second|minute|hour|day|week|month|year) [reason]"],
            permission: "primebds.command.tempban",
            aliases: &[],
        },
        tempban,
    );
    registry.register(
        CommandSpec {
            name: "removeban",
            description: "Removes an active ban from a player!",
            usage: &["/removeban <player>"],
            permission: "primebds.command.removeban",
            aliases: &[],
        },
        removeban,
    );
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Mute,
    Ban,
}

fn mute(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    sanction(ctx, cmd, api, Kind::Mute, false, "/mute <player> [reason]", MUTE_REASON)
}

fn tempmute(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    sanction(
        ctx,
        cmd,
        api,
        Kind::Mute,
        true,
        "/tempmute <player> <duration_number> (second|minute|hour|day|week|month|year) [reason]",
        TEMPMUTE_REASON,
    )
}

fn permban(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    sanction(ctx, cmd, api, Kind::Ban, false, "/permban <player> [reason]", BAN_REASON)
}

fn tempban(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    sanction(
        ctx,
        cmd,
        api,
        Kind::Ban,
        true,
        "/tempban <player> <duration_number> (second|minute|hour|day|week|month|year) [reason]",
        BAN_REASON,
    )
}

fn offline_tag(offline: bool) -> String {
    if offline {
        format!(" {GRAY}{ITALIC}(Offline)")
    } else {
        String::new()
    }
}

fn sanction(
    ctx: &mut PluginContext,
    cmd: &CommandContext,
    api: &mut dyn ServerApi,
    kind: Kind,
    timed: bool,
    usage: &str,
    default_reason: &str,
) -> CommandResult {
    let required = if timed { 3 } else { 1 };
    if cmd.args.len() < required {
        return CommandResult::err(format!("Usage: {usage}"));
    }
    if let Err(msg) = reject_selectors(&cmd.args) {
        return CommandResult::err(msg);
    }

    let now = ctx.ledger.now();
    let (length, reason_from) = if timed {
        match parse_length(&cmd.args[1], &cmd.args[2]) {
            Ok(length) => (length, 3),
            Err(e) => return failure(&e, now),
        }
    } else {
        (Length::Permanent, 1)
    };
    let reason = args::reason(&cmd.args, reason_from, default_reason);
    let name = player_name(&cmd.args[0]);
    let (identity, online) = target(api, name);

    if let Err(e) = guard_rank(ctx, &cmd.sender, api, &identity) {
        return failure(&e, now);
    }

    let initiator = cmd.sender.name();
    let result = match kind {
        Kind::Mute => ctx.ledger.mute(initiator, &identity, length, &reason),
        Kind::Ban => ctx.ledger.ban(initiator, &identity, length, &reason),
    };
    let applied = match result {
        Ok(applied) => applied,
        Err(e) => return failure(&e, now),
    };

    let tag = offline_tag(online.is_none());
    match kind {
        Kind::Mute => {
            let expires = describe_expiration(applied.expiration, now);
            if let Some(player) = &online {
                api.send_message(&player.name, &mute_notice(&applied.reason, &expires));
            }
            CommandResult::ok(format!(
                "Player {YELLOW}{} {GOLD}was muted for {YELLOW}\"{}\" {GOLD}which expires {YELLOW}{expires}{tag}",
                applied.name, applied.reason
            ))
        }
        Kind::Ban => {
            let remaining = format_time_remaining(applied.expiration, now);
            if let Some(player) = &online {
                let level = api.level_name();
                api.kick_player(&player.name, &ban_message(&level, &remaining, &applied.reason));
            }
            CommandResult::ok(format!(
                "Player {YELLOW}{} {GOLD}was banned for {YELLOW}\"{}\" {GOLD}for {YELLOW}{remaining}{tag}",
                applied.name, applied.reason
            ))
        }
    }
}

fn unmute(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    lift(ctx, cmd, api, Kind::Mute, "/unmute <player>")
}

fn removeban(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    lift(ctx, cmd, api, Kind::Ban, "/removeban <player>")
}

fn lift(
    ctx: &mut PluginContext,
    cmd: &CommandContext,
    api: &mut dyn ServerApi,
    kind: Kind,
    usage: &str,
) -> CommandResult {
    let Some(arg) = cmd.arg(0) else {
        return CommandResult::err(format!("Usage: {usage}"));
    };
    if let Err(msg) = reject_selectors(&cmd.args) {
        return CommandResult::err(msg);
    }

    let now = ctx.ledger.now();
    let (identity, online) = target(api, player_name(arg));
    if let Err(e) = guard_rank(ctx, &cmd.sender, api, &identity) {
        return failure(&e, now);
    }

    let initiator = cmd.sender.name();
    match kind {
        Kind::Mute => match ctx.ledger.unmute(initiator, &identity) {
            Ok(lifted) => {
                if let Some(player) = &online {
                    api.send_message(&player.name, &format!("{GREEN}You have been unmuted"));
                }
                CommandResult::ok(format!(
                    "Player {YELLOW}{} {GOLD}has been unmuted",
                    lifted.name
                ))
            }
            Err(e) => failure(&e, now),
        },
        Kind::Ban => match ctx.ledger.unban(initiator, &identity) {
            Ok(lifted) => CommandResult::ok(format!(
                "Player {YELLOW}{} {GOLD}has been unbanned",
                lifted.name
            )),
            Err(e) => failure(&e, now),
        },
    }
}
