//! rtp, spectate.

use primebds_command::args::player_name;
use primebds_command::selector::reject_selectors;
use primebds_command::{CommandContext, CommandSpec};
use primebds_config::SpectatorCheckSection;
use primebds_plugin_api::{CommandResult, GameMode, PluginPlayer, ServerApi};
use tracing::debug;

use super::{require_player, Registry};
use crate::context::{find_online, PluginContext};
use crate::format::color::*;
use crate::rtp::{find_destination, Warmup, CHECK_INTERVAL_TICKS};
use crate::PLUGIN_NAME;

pub fn register(registry: &mut Registry) {
    registry.register(
        CommandSpec {
            name: "rtp",
            description: "Randomly teleport to a new location!",
            usage: &["/rtp"],
            permission: "primebds.command.rtp",
            aliases: &["randomtp", "wild", "rt"],
        },
        rtp,
    );
    registry.register(
        CommandSpec {
            name: "spectate",
            description: "Warps you to a non-spectating player!",
            usage: &["/spectate [player]"],
            permission: "primebds.command.spectate",
            aliases: &[],
        },
        spectate,
    );
}

// ─── rtp ─────────────────────────────────────────────────────────────────────

fn rtp(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    let player = match require_player(&cmd.sender, api) {
        Ok(player) => player,
        Err(result) => return result,
    };
    let now = ctx.now_secs();
    let settings = ctx.config.modules.rtp.clone();

    if ctx.rtp.is_pending(&player.xuid) {
        return CommandResult::err(format!("{RED}You are already in an RTP warmup!"));
    }
    if let Some(remaining) = ctx.rtp.cooldown_remaining(&player.xuid, now, settings.cooldown) {
        return CommandResult::err(format!(
            "{RED}You must wait {remaining:.1}s before using /rtp again"
        ));
    }

    let dimension = player.dimension.clone();
    let destination = find_destination(&mut ctx.rng, &settings, |x, z| {
        api.highest_block_y(&dimension, x, z)
    });
    let Some(destination) = destination else {
        return CommandResult::err(format!(
            "{RED}Failed to find a valid teleport location. Try again."
        ));
    };

    if settings.delay <= 0.0 {
        api.teleport_player(&player.name, &dimension, destination);
        ctx.rtp.mark_used(&player.xuid, now);
        return CommandResult::ok(teleported(&destination));
    }

    let task_id = ctx.rtp.allocate_task_id();
    ctx.rtp.begin(
        &player.xuid,
        Warmup {
            task_id,
            player_name: player.name.clone(),
            dimension,
            start: player.position,
            destination,
            started_at: now,
            delay: settings.delay,
        },
    );
    api.schedule_repeating(PLUGIN_NAME, 0, CHECK_INTERVAL_TICKS, task_id);
    debug!("rtp warmup {task_id} started for {}", player.name);
    CommandResult::ok(format!(
        "{GREEN}Teleporting in {YELLOW}{:.1}s{GREEN}, don't move!",
        settings.delay
    ))
}

fn teleported(destination: &primebds_plugin_api::Vec3) -> String {
    format!(
        "{GREEN}Randomly teleported to {YELLOW}{:.1}, {:.1}, {:.1}",
        destination.x, destination.y, destination.z
    )
}

/// One firing of a warmup task. A task whose warmup is gone does nothing.
pub(crate) fn rtp_task(ctx: &mut PluginContext, task_id: u32, api: &mut dyn ServerApi) {
    let Some((xuid, warmup)) = ctx.rtp.for_task(task_id) else {
        debug!("rtp task {task_id} has no pending warmup");
        return;
    };
    let (xuid, warmup) = (xuid.to_string(), warmup.clone());

    let Some(player) = api.get_player(&warmup.player_name) else {
        ctx.rtp.cancel(&xuid);
        api.cancel_task(PLUGIN_NAME, task_id);
        return;
    };
    if warmup.moved(&player.position) {
        cancel_warmup(ctx, &xuid, api);
        return;
    }

    let now = ctx.now_secs();
    let remaining = warmup.remaining(now);
    api.send_popup(&player.name, &format!("{GREEN}RTP in {YELLOW}{remaining:.1}s"));
    if remaining > 0.0 {
        return;
    }

    api.teleport_player(&player.name, &warmup.dimension, warmup.destination);
    api.send_message(&player.name, &teleported(&warmup.destination));
    ctx.rtp.mark_used(&xuid, now);
    ctx.rtp.cancel(&xuid);
    api.cancel_task(PLUGIN_NAME, task_id);
}

/// Cancel a pending warmup because the player moved. Returns false when
/// nothing was pending.
pub(crate) fn cancel_warmup(ctx: &mut PluginContext, xuid: &str, api: &mut dyn ServerApi) -> bool {
    let Some(warmup) = ctx.rtp.cancel(xuid) else {
        return false;
    };
    api.send_message(
        &warmup.player_name,
        &format!("{RED}Teleport cancelled because you moved!"),
    );
    api.cancel_task(PLUGIN_NAME, warmup.task_id);
    true
}

// ─── spectate ────────────────────────────────────────────────────────────────

fn is_spectator(check: &SpectatorCheckSection, player: &PluginPlayer) -> bool {
    if check.check_gamemode && player.game_mode != GameMode::Spectator {
        return false;
    }
    if check.check_tags && !check.allow_tags.iter().any(|t| player.has_tag(t)) {
        return false;
    }
    true
}

fn is_target(check: &SpectatorCheckSection, player: &PluginPlayer) -> bool {
    if check.check_gamemode && player.game_mode == GameMode::Spectator {
        return false;
    }
    if check.check_tags
        && check
            .allow_tags
            .iter()
            .chain(check.ignore_tags.iter())
            .any(|t| player.has_tag(t))
    {
        return false;
    }
    true
}

fn spectate(ctx: &mut PluginContext, cmd: &CommandContext, api: &mut dyn ServerApi) -> CommandResult {
    if let Err(msg) = reject_selectors(&cmd.args) {
        return CommandResult::err(msg);
    }
    let sender = match require_player(&cmd.sender, api) {
        Ok(player) => player,
        Err(result) => return result,
    };
    let check = &ctx.config.modules.spectator_check;
    if !is_spectator(check, &sender) {
        return CommandResult::ok("You are not currently a spectator!");
    }

    let Some(arg) = cmd.arg(0) else {
        let targets: Vec<String> = api
            .online_players()
            .into_iter()
            .filter(|p| p.name != sender.name && is_target(check, p))
            .map(|p| p.name)
            .collect();
        if targets.is_empty() {
            return CommandResult::ok("No players available to spectate.");
        }
        return CommandResult::ok(format!("{AQUA}Players you can spectate:"))
            .with(format!("{YELLOW}{}", targets.join(&format!("{GRAY}, {YELLOW}"))))
            .with(format!("{GRAY}Use /spectate <player> to warp"));
    };

    let name = player_name(arg);
    let target = find_online(api, name).filter(|p| p.name != sender.name && is_target(check, p));
    let Some(target) = target else {
        return CommandResult::err(format!("Player {name} is not available to spectate."));
    };

    api.set_game_mode(&sender.name, GameMode::Spectator);
    api.teleport_player(&sender.name, &target.dimension, target.position);
    CommandResult::ok(format!("Now spectating {}", target.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{player, test_context, MockServer};
    use primebds_command::CommandRegistry;
    use primebds_plugin_api::{CommandSender, Vec3};

    fn run(ctx: &mut PluginContext, api: &mut MockServer, who: &str, name: &str, args: &[&str]) -> CommandResult {
        let mut registry = CommandRegistry::new();
        register(&mut registry);
        let cmd = CommandContext::new(
            CommandSender::Player(who.into()),
            args.iter().map(|s| s.to_string()).collect(),
        );
        registry.execute(ctx, name, &cmd, api).unwrap()
    }

    #[test]
    fn immediate_rtp_without_delay() {
        let (mut ctx, _clock) = test_context("rtp_now");
        ctx.config.modules.rtp.delay = 0.0;
        let mut api = MockServer::with_players(vec![player("Steve", "1")]);

        let result = run(&mut ctx, &mut api, "Steve", "wild", &[]);
        assert!(result.success);
        assert!(result.messages[0].contains("Randomly teleported"));
        assert_eq!(api.teleports.len(), 1);
        assert_eq!(api.teleports[0].2.y, 64.0);

        let again = run(&mut ctx, &mut api, "Steve", "rtp", &[]);
        assert!(!again.success);
        assert!(again.messages[0].contains("You must wait 60.0s"));
    }

    #[test]
    fn rtp_fails_without_surface() {
        let (mut ctx, _clock) = test_context("rtp_nosurface");
        let mut api = MockServer::with_players(vec![player("Steve", "1")]);
        api.surface = None;
        let result = run(&mut ctx, &mut api, "Steve", "rtp", &[]);
        assert!(!result.success);
        assert!(result.messages[0].contains("Failed to find a valid teleport location"));
        assert!(api.scheduled.is_empty());
    }

    #[test]
    fn warmup_counts_down_then_teleports() {
        let (mut ctx, clock) = test_context("rtp_warmup");
        let mut api = MockServer::with_players(vec![player("Steve", "1")]);

        run(&mut ctx, &mut api, "Steve", "rtp", &[]);
        let (task_id, delay, interval) = api.scheduled[0];
        assert_eq!((delay, interval), (0, Some(CHECK_INTERVAL_TICKS)));

        let twice = run(&mut ctx, &mut api, "Steve", "rtp", &[]);
        assert!(twice.messages[0].contains("already in an RTP warmup"));

        rtp_task(&mut ctx, task_id, &mut api);
        assert_eq!(api.popups.last().unwrap().1, "§aRTP in §e5.0s");
        assert!(api.teleports.is_empty());

        clock.advance_secs(5);
        rtp_task(&mut ctx, task_id, &mut api);
        assert_eq!(api.teleports.len(), 1);
        assert_eq!(api.cancelled, vec![task_id]);
        assert!(!ctx.rtp.is_pending("1"));
        assert!(ctx.rtp.cooldown_remaining("1", ctx.now_secs(), 60.0).is_some());
    }

    #[test]
    fn moving_cancels_warmup() {
        let (mut ctx, clock) = test_context("rtp_move");
        let mut api = MockServer::with_players(vec![player("Steve", "1")]);
        run(&mut ctx, &mut api, "Steve", "rtp", &[]);
        let task_id = api.scheduled[0].0;

        api.move_player("Steve", Vec3::new(1.0, 64.0, 0.0));
        clock.advance_secs(5);
        rtp_task(&mut ctx, task_id, &mut api);
        assert!(api.teleports.is_empty());
        assert_eq!(api.cancelled, vec![task_id]);
        assert_eq!(api.messages_to("Steve"), vec!["§cTeleport cancelled because you moved!"]);

        // A late firing after cancellation is ignored.
        rtp_task(&mut ctx, task_id, &mut api);
        assert!(api.teleports.is_empty());
        assert_eq!(api.cancelled.len(), 1);
    }

    #[test]
    fn offline_player_drops_warmup() {
        let (mut ctx, _clock) = test_context("rtp_offline");
        let mut api = MockServer::with_players(vec![player("Steve", "1")]);
        run(&mut ctx, &mut api, "Steve", "rtp", &[]);
        let task_id = api.scheduled[0].0;
        api.players.clear();
        rtp_task(&mut ctx, task_id, &mut api);
        assert!(!ctx.rtp.is_pending("1"));
        assert_eq!(api.cancelled, vec![task_id]);
    }

    fn spectator(name: &str, xuid: &str) -> PluginPlayer {
        let mut p = player(name, xuid);
        p.game_mode = GameMode::Spectator;
        p
    }

    #[test]
    fn spectate_requires_spectator_mode() {
        let (mut ctx, _clock) = test_context("spec_mode");
        let mut api = MockServer::with_players(vec![player("Steve", "1"), player("Alex", "2")]);
        let result = run(&mut ctx, &mut api, "Steve", "spectate", &[]);
        assert_eq!(result.messages[0], "You are not currently a spectator!");
        assert!(api.teleports.is_empty());
    }

    #[test]
    fn spectate_lists_and_warps() {
        let (mut ctx, _clock) = test_context("spec_warp");
        let mut alex = player("Alex", "2");
        alex.position = Vec3::new(10.0, 70.0, 10.0);
        let mut api = MockServer::with_players(vec![
            spectator("Ghost", "1"),
            alex,
            spectator("Other", "3"),
        ]);

        let list = run(&mut ctx, &mut api, "Ghost", "spectate", &[]);
        assert!(list.messages[1].contains("Alex"));
        assert!(!list.messages[1].contains("Other"));

        let warp = run(&mut ctx, &mut api, "Ghost", "spectate", &["alex"]);
        assert_eq!(warp.messages[0], "Now spectating Alex");
        assert_eq!(api.game_modes, vec![("Ghost".into(), GameMode::Spectator)]);
        assert_eq!(api.teleports[0].2, Vec3::new(10.0, 70.0, 10.0));

        let bad = run(&mut ctx, &mut api, "Ghost", "spectate", &["Other"]);
        assert_eq!(bad.messages[0], "Player Other is not available to spectate.");
    }

    #[test]
    fn spectate_tag_rules() {
        let (mut ctx, _clock) = test_context("spec_tags");
        let check = &mut ctx.config.modules.spectator_check;
        check.check_gamemode = false;
        check.check_tags = true;
        check.allow_tags = vec!["dead".into()];
        check.ignore_tags = vec!["staff".into()];

        let mut ghost = player("Ghost", "1");
        ghost.tags = vec!["dead".into()];
        let mut staff = player("Staff", "2");
        staff.tags = vec!["staff".into()];
        let mut api = MockServer::with_players(vec![ghost, staff, player("Alex", "3")]);

        let list = run(&mut ctx, &mut api, "Ghost", "spectate", &[]);
        assert_eq!(list.messages[1], "§eAlex");

        let alive = run(&mut ctx, &mut api, "Alex", "spectate", &[]);
        assert_eq!(alive.messages[0], "You are not currently a spectator!");
    }

    #[test]
    fn spectate_nobody_available() {
        let (mut ctx, _clock) = test_context("spec_empty");
        let mut api = MockServer::with_players(vec![spectator("Ghost", "1")]);
        let result = run(&mut ctx, &mut api, "Ghost", "spectate", &[]);
        assert_eq!(result.messages[0], "No players available to spectate.");
    }
}
