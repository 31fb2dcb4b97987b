//! setrank, inspect, vanish, reloadscripts.

use primebds_command::args::player_name;
use primebds_command::selector::reject_selectors;
use primebds_command::{CommandContext, CommandSpec};
use primebds_ledger::Rank;
use primebds_plugin_api::{CommandResult, ServerApi};
use tracing::{error, info};

use super::{failure, guard_rank, require_player, target, Registry};
use crate::context::PluginContext;
use crate::format::{color::*, INFO};

pub fn register(registry: &mut Registry) {
    registry.register(
        CommandSpec {
            name: "setrank",
            description: "Sets the internal rank for a player!",
            usage: &["/setrank <player> <default|helper|mod|operator>"],
            permission: "primebds.command.setrank",
            aliases: &[],
        },
        setrank,
    );
    registry.register(
        CommandSpec {
            name: "inspect",
            description: "Toggles grief log inspect mode!",
            usage: &["/inspect"],
            permission: "primebds.command.inspect",
            aliases: &[],
        },
        inspect,
    );
    registry.register(
        CommandSpec {
            name: "vanish",
            description: "Hides you from other players!",
            usage: &["/vanish"],
            permission: "primebds.command.vanish",
            aliases: &[],
        },
        vanish,
    );
    registry.register(
        CommandSpec {
            name: "reloadscripts",
            description: "Reloads server scripts and data!",
            usage: &["/reloadscripts"],
            permission: "primebds.command.reloadscripts",
            aliases: &["rscripts", "rs"],
        },
        reloadscripts,
    );
}

fn setrank(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    let (Some(arg), Some(rank_arg)) = (cmd.arg(0), cmd.arg(1)) else {
        return CommandResult::err("Usage: /setrank <player> <default|helper|mod|operator>");
    };
    if let Err(msg) = reject_selectors(&cmd.args) {
        return CommandResult::err(msg);
    }
    let now = ctx.ledger.now();
    let rank: Rank = match rank_arg.parse() {
        Ok(rank) => rank,
        Err(e) => return failure(&e, now),
    };
    let (identity, online) = target(api, player_name(arg));
    if let Err(e) = guard_rank(ctx, &cmd.sender, api, &identity) {
        return failure(&e, now);
    }

    let change = match ctx.ledger.set_rank(cmd.sender.name(), &identity, rank) {
        Ok(change) => change,
        Err(e) => return failure(&e, now),
    };
    let previous = change.previous;
    let name = change.name;
    let is_op = online.as_ref().is_some_and(|p| p.is_op);

    if rank == Rank::Operator {
        api.dispatch_command(&format!("op \"{name}\""));
    } else if previous == Rank::Operator || is_op {
        api.dispatch_command(&format!("deop \"{name}\""));
    }
    info!("{} set rank of {name}: {previous} -> {rank}", cmd.sender.name());

    let mut result = CommandResult::ok(format!(
        "{INFO}Player {YELLOW}{name}'s {WHITE}rank was updated to {YELLOW}{}",
        rank.as_str().to_uppercase()
    ));
    if is_op && rank != Rank::Operator {
        result = result.with(format!(
            "{GRAY}{ITALIC}{name} was a server operator and has been deopped"
        ));
    }
    result
}

fn inspect(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    let player = match require_player(&cmd.sender, api) {
        Ok(player) => player,
        Err(result) => return result,
    };
    if !ctx.config.modules.grieflog.enabled {
        return CommandResult::err(format!("{RED}Grief Logger is currently disabled by config"));
    }
    match ctx.grieflog.toggle_inspect(&player.xuid, &player.name) {
        Ok(true) => CommandResult::ok(format!("{INFO}Inspect mode {GREEN}Enabled")),
        Ok(false) => CommandResult::ok(format!("{INFO}Inspect mode {RED}Disabled")),
        Err(e) => {
            error!("Failed to toggle inspect mode for {}: {e}", player.name);
            CommandResult::err(format!("{RED}Could not toggle inspect mode"))
        }
    }
}

fn vanish(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    let player = match require_player(&cmd.sender, api) {
        Ok(player) => player,
        Err(result) => return result,
    };
    if ctx.vanished.remove(&player.unique_id) {
        CommandResult::ok(format!("{INFO}You are now {GREEN}visible"))
    } else {
        ctx.vanished.insert(player.unique_id);
        CommandResult::ok(format!("{INFO}You are now {RED}vanished"))
    }
}

fn reloadscripts(_ctx: &mut PluginContext, _cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    api.reload_data();
    CommandResult::ok(format!("{INFO}Server scripts were reloaded!"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{player, test_context, MockServer};
    use primebds_command::CommandRegistry;
    use primebds_ledger::{Identity, PlayerProfile};
    use primebds_plugin_api::CommandSender;

    fn run(
        ctx: &mut PluginContext,
        api: &mut MockServer,
        sender: CommandSender,
        name: &str,
        args: &[&str],
    ) -> CommandResult {
        let mut registry = CommandRegistry::new();
        register(&mut registry);
        let cmd = CommandContext::new(sender, args.iter().map(|s| s.to_string()).collect());
        registry.execute(ctx, name, &cmd, api).unwrap()
    }

    fn join(ctx: &PluginContext, xuid: &str, name: &str) {
        ctx.ledger
            .record_join(&PlayerProfile {
                xuid: xuid.into(),
                name: name.into(),
                ..Default::default()
            })
            .unwrap();
    }

    #[test]
    fn setrank_ops_and_deops() {
        let (mut ctx, _clock) = test_context("cmd_setrank");
        join(&ctx, "5", "Alex");
        let mut api = MockServer::with_players(vec![player("Alex", "5")]);

        let result = run(&mut ctx, &mut api, CommandSender::Console, "setrank", &["Alex", "operator"]);
        assert!(result.success);
        assert!(result.messages[0].contains("OPERATOR"));
        assert_eq!(api.dispatched, vec!["op \"Alex\""]);

        let result = run(&mut ctx, &mut api, CommandSender::Console, "setrank", &["Alex", "mod"]);
        assert!(result.success);
        assert_eq!(api.dispatched[1], "deop \"Alex\"");
        assert_eq!(ctx.rank_of(&Identity::name("Alex")), Rank::Mod);

        let same = run(&mut ctx, &mut api, CommandSender::Console, "setrank", &["Alex", "Mod"]);
        assert!(!same.success);
        assert!(same.messages[0].contains("already has the rank"));
    }

    #[test]
    fn setrank_offline_uses_stored_name() {
        let (mut ctx, _clock) = test_context("cmd_setrank_case");
        join(&ctx, "5", "Alex");
        let mut api = MockServer::with_players(Vec::new());

        let result = run(&mut ctx, &mut api, CommandSender::Console, "setrank", &["aLEX", "operator"]);
        assert!(result.success);
        assert!(result.messages[0].contains("Alex's"), "{:?}", result.messages);
        assert_eq!(api.dispatched, vec!["op \"Alex\""]);

        run(&mut ctx, &mut api, CommandSender::Console, "setrank", &["ALEX", "default"]);
        assert_eq!(api.dispatched[1], "deop \"Alex\"");
    }

    #[test]
    fn setrank_rejects_bad_input() {
        let (mut ctx, _clock) = test_context("cmd_setrank_bad");
        join(&ctx, "5", "Alex");
        let mut api = MockServer::with_players(Vec::new());

        let bad = run(&mut ctx, &mut api, CommandSender::Console, "setrank", &["Alex", "admin"]);
        assert!(!bad.success);
        assert!(bad.messages[0].contains("unknown rank"));

        let selector = run(&mut ctx, &mut api, CommandSender::Console, "setrank", &["@a", "mod"]);
        assert!(!selector.success);
        assert!(api.dispatched.is_empty());
    }

    #[test]
    fn setrank_refuses_higher_target() {
        let (mut ctx, _clock) = test_context("cmd_setrank_guard");
        join(&ctx, "1", "Moddy");
        join(&ctx, "2", "Boss");
        ctx.ledger
            .set_rank("Server", &Identity::name("Moddy"), Rank::Mod)
            .unwrap();
        ctx.ledger
            .set_rank("Server", &Identity::name("Boss"), Rank::Operator)
            .unwrap();
        let mut api = MockServer::with_players(vec![player("Moddy", "1")]);

        let result = run(
            &mut ctx,
            &mut api,
            CommandSender::Player("Moddy".into()),
            "setrank",
            &["Boss", "default"],
        );
        assert!(!result.success);
        assert_eq!(ctx.rank_of(&Identity::name("Boss")), Rank::Operator);
    }

    #[test]
    fn inspect_requires_player_and_module() {
        let (mut ctx, _clock) = test_context("cmd_inspect");
        let mut api = MockServer::with_players(vec![player("Alex", "5")]);
        let alex = CommandSender::Player("Alex".into());

        let console = run(&mut ctx, &mut api, CommandSender::Console, "inspect", &[]);
        assert!(!console.success);

        let disabled = run(&mut ctx, &mut api, alex.clone(), "inspect", &[]);
        assert!(disabled.messages[0].contains("disabled by config"));

        ctx.config.modules.grieflog.enabled = true;
        let on = run(&mut ctx, &mut api, alex.clone(), "inspect", &[]);
        assert!(on.messages[0].contains("Enabled"));
        assert!(ctx.grieflog.inspect_mode("5").unwrap());
        let off = run(&mut ctx, &mut api, alex, "inspect", &[]);
        assert!(off.messages[0].contains("Disabled"));
    }

    #[test]
    fn vanish_toggles() {
        let (mut ctx, _clock) = test_context("cmd_vanish");
        let mut api = MockServer::with_players(vec![player("Alex", "5")]);
        let alex = CommandSender::Player("Alex".into());

        run(&mut ctx, &mut api, alex.clone(), "vanish", &[]);
        assert!(ctx.vanished.contains(&5));
        run(&mut ctx, &mut api, alex, "vanish", &[]);
        assert!(ctx.vanished.is_empty());
    }

    #[test]
    fn reloadscripts_alias() {
        let (mut ctx, _clock) = test_context("cmd_reload");
        let mut api = MockServer::with_players(Vec::new());
        let result = run(&mut ctx, &mut api, CommandSender::Console, "rs", &[]);
        assert_eq!(result.messages[0], format!("{INFO}Server scripts were reloaded!"));
        assert_eq!(api.reloads, 1);
    }
}
