//! Simulated server state driven by console lines.
//!
//! Each line is either a host verb (`join`, `chat`, `hit`, ...) that raises a
//! plugin event, `as <player> <command>` to run a command as that player, or a
//! plain console command routed to whichever plugin registered it.

use std::collections::VecDeque;

use primebds_plugin_api::{
    ActorRef, BlockInfo, BlockPos, CommandResult, CommandSender, DamageCause, DamageSource,
    EventResult, GameMode, OutboundPacket, PluginEvent, PluginPlayer, Vec3,
};
use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::plugin_manager::{PendingAction, PluginManager, ServerSnapshot};

const OVERWORLD: &str = "overworld";
const BASE_KNOCKBACK: Vec3 = Vec3::new(0.4, 0.4, 0.4);
const BASE_XUID: u64 = 2_535_400_000_000_000;

pub const HELP: &[&str] = &[
    "join <player>            connect a player",
    "quit <player>            disconnect a player",
    "chat <player> <text>     send chat",
    "move <player> <x> <y> <z>",
    "tag <player> <tag> / untag <player> <tag>",
    "sprint <player> on|off",
    "hit <attacker> <victim> [damage]",
    "fall <player> <damage>",
    "break <player> <x> <y> <z> <block>",
    "place <player> <x> <y> <z> <block>",
    "open <player> <x> <y> <z> <block>",
    "as <player> <command> [args]",
    "list | help | stop",
];

/// A message delivered to an online player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: String,
    pub text: String,
}

pub struct Host {
    level_name: String,
    port: u16,
    operators: Vec<String>,
    surface_y: i32,
    players: Vec<PluginPlayer>,
    next_unique_id: i64,
    tick: u64,
    running: bool,
    plugins: PluginManager,
    /// Every message delivered to a player, in order.
    pub inbox: Vec<Delivery>,
}

impl Host {
    pub fn new(config: &HostConfig, plugins: PluginManager) -> Self {
        Self {
            level_name: config.server.level_name.clone(),
            port: config.server.port,
            operators: config.server.operators.clone(),
            surface_y: config.server.surface_y,
            players: Vec::new(),
            next_unique_id: 1,
            tick: 0,
            running: true,
            plugins,
            inbox: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn player(&self, name: &str) -> Option<&PluginPlayer> {
        self.players.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            players: self.players.clone(),
            level_name: self.level_name.clone(),
            port: self.port,
            current_tick: self.tick,
            surface_y: Some(self.surface_y),
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────────

    /// Load plugin configs, enable every plugin and announce startup.
    pub fn start(&mut self) {
        self.plugins.load_configs();
        let snapshot = self.snapshot();
        let actions = self.plugins.enable_all(&snapshot);
        self.apply(actions);
        self.fire(PluginEvent::ServerStarted);
        info!(
            "Host ready: level {} on port {} with {} plugin commands",
            self.level_name,
            self.port,
            self.plugins.plugin_commands.len()
        );
    }

    pub fn shutdown(&mut self) {
        self.fire(PluginEvent::ServerStopping);
        for name in self.players.iter().map(|p| p.name.clone()).collect::<Vec<_>>() {
            self.disconnect(&name, "Server closed");
        }
        self.plugins.disable_all();
        self.running = false;
    }

    pub fn game_tick(&mut self) {
        self.tick += 1;
        let snapshot = self.snapshot();
        let actions = self.plugins.tick_scheduler(&snapshot);
        self.apply(actions);
    }

    // ─── Console ────────────────────────────────────────────────────────────

    /// Handle one console line. Returns the replies meant for the operator.
    pub fn handle_console_command(&mut self, line: &str) -> Vec<String> {
        let args = split_args(line);
        let Some((verb, rest)) = args.split_first() else {
            return Vec::new();
        };

        let verb = verb.to_lowercase();
        match verb.as_str() {
            "help" => HELP.iter().map(|l| l.to_string()).collect(),
            "stop" => {
                info!("Stopping host");
                self.shutdown();
                vec!["Host stopped".into()]
            }
            "list" => {
                let names: Vec<&str> = self.players.iter().map(|p| p.name.as_str()).collect();
                vec![format!("{} online: {}", names.len(), names.join(", "))]
            }
            "join" => match rest.first() {
                Some(name) => self.join(name),
                None => vec!["Usage: join <player>".into()],
            },
            "quit" => match rest.first() {
                Some(name) if self.player(name).is_some() => {
                    self.disconnect(name, "Left the game");
                    vec![format!("{name} left")]
                }
                _ => vec!["Usage: quit <online player>".into()],
            },
            "chat" => self.chat(rest),
            "move" => self.move_player(rest),
            "tag" | "untag" => self.edit_tag(rest, verb == "tag"),
            "sprint" => self.sprint(rest),
            "hit" => self.hit(rest),
            "fall" => self.fall(rest),
            "break" | "place" | "open" => self.block_action(&verb, rest),
            "as" => match rest.split_first() {
                Some((name, command)) if self.player(name).is_some() && !command.is_empty() => {
                    let name = self.resolve_name(name);
                    self.run_command(CommandSender::Player(name), command)
                }
                _ => vec!["Usage: as <online player> <command> [args]".into()],
            },
            _ => self.run_command(CommandSender::Console, &args),
        }
    }

    fn resolve_name(&self, name: &str) -> String {
        self.player(name)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| name.to_string())
    }

    fn run_command(&mut self, sender: CommandSender, args: &[String]) -> Vec<String> {
        let Some((command, rest)) = args.split_first() else {
            return Vec::new();
        };
        let command = command.trim_start_matches('/');
        let (response, actions) = self.execute(&sender, command, rest);
        self.apply(actions);
        match response {
            Some(result) => result.messages,
            None => vec![format!("Unknown command: {command}")],
        }
    }

    /// Built-in host commands first, then plugin commands.
    fn execute(
        &mut self,
        sender: &CommandSender,
        command: &str,
        args: &[String],
    ) -> (Option<CommandResult>, Vec<PendingAction>) {
        match command.to_lowercase().as_str() {
            "op" | "deop" if *sender == CommandSender::Console => {
                let Some(name) = args.first() else {
                    let usage = CommandResult::err(format!("Usage: {command} <player>"));
                    return (Some(usage), Vec::new());
                };
                let grant = command.eq_ignore_ascii_case("op");
                match self.players.iter_mut().find(|p| p.name.eq_ignore_ascii_case(name)) {
                    Some(p) => p.is_op = grant,
                    None => debug!("{command} for offline player {name}"),
                }
                if grant {
                    if !self.operators.iter().any(|o| o.eq_ignore_ascii_case(name)) {
                        self.operators.push(name.clone());
                    }
                } else {
                    self.operators.retain(|o| !o.eq_ignore_ascii_case(name));
                }
                (Some(CommandResult::ok(format!("{command} {name}"))), Vec::new())
            }
            _ => {
                let snapshot = self.snapshot();
                self.plugins.handle_command(command, args, sender, &snapshot)
            }
        }
    }

    // ─── Player verbs ───────────────────────────────────────────────────────

    fn join(&mut self, name: &str) -> Vec<String> {
        if self.player(name).is_some() {
            return vec![format!("{name} is already online")];
        }
        let unique_id = self.next_unique_id;
        self.next_unique_id += 1;
        let player = PluginPlayer {
            name: name.to_string(),
            xuid: stable_xuid(name),
            uuid: format!("00000000-0000-0000-0000-{unique_id:012}"),
            unique_id,
            position: Vec3::new(0.5, (self.surface_y + 1) as f32, 0.5),
            dimension: OVERWORLD.into(),
            game_mode: GameMode::Survival,
            ping: 20,
            device_os: "Windows".into(),
            game_version: "1.21.50".into(),
            is_op: self.operators.iter().any(|o| o.eq_ignore_ascii_case(name)),
            ..Default::default()
        };
        self.players.push(player.clone());
        info!("{name} joined (xuid {})", player.xuid);

        self.fire(PluginEvent::PlayerJoin {
            player: player.clone(),
        });
        if self.player(name).is_none() {
            return vec![format!("{name} was disconnected while joining")];
        }

        let others: Vec<PluginPlayer> = self
            .players
            .iter()
            .filter(|p| p.unique_id != unique_id)
            .cloned()
            .collect();
        for other in &others {
            self.spawn_for(&other.name, &player);
            self.spawn_for(&player.name, other);
        }
        vec![format!("{name} joined")]
    }

    /// Send an AddPlayer packet for `subject` to `viewer`. Returns whether it went out.
    fn spawn_for(&mut self, viewer: &str, subject: &PluginPlayer) -> bool {
        let result = self.fire(PluginEvent::PacketSend {
            recipient: Some(viewer.to_string()),
            packet: OutboundPacket::AddPlayer {
                player_name: subject.name.clone(),
                unique_id: subject.unique_id,
            },
        });
        let sent = result == EventResult::Continue;
        debug!("AddPlayer {} -> {viewer}: {}", subject.name, if sent { "sent" } else { "hidden" });
        sent
    }

    fn disconnect(&mut self, name: &str, reason: &str) {
        let Some(index) = self.players.iter().position(|p| p.name.eq_ignore_ascii_case(name)) else {
            return;
        };
        let player = self.players.remove(index);
        info!("{} disconnected: {reason}", player.name);
        self.fire(PluginEvent::PlayerQuit { player });
    }

    fn chat(&mut self, args: &[String]) -> Vec<String> {
        let Some((name, words)) = args.split_first() else {
            return vec!["Usage: chat <player> <text>".into()];
        };
        let Some(player) = self.player(name).cloned() else {
            return vec![format!("{name} is not online")];
        };
        let message = words.join(" ");
        let result = self.fire(PluginEvent::PlayerChat {
            player: player.clone(),
            message: message.clone(),
        });
        if result == EventResult::Cancelled {
            return vec![format!("Chat from {} was blocked", player.name)];
        }
        let line = format!("<{}> {message}", player.name);
        self.broadcast(&line);
        vec![line]
    }

    fn move_player(&mut self, args: &[String]) -> Vec<String> {
        let (Some(name), Some(to)) = (args.first(), parse_vec3(args.get(1..4))) else {
            return vec!["Usage: move <player> <x> <y> <z>".into()];
        };
        let Some(player) = self.player(name).cloned() else {
            return vec![format!("{name} is not online")];
        };
        let from = player.position;
        if let Some(p) = self.players.iter_mut().find(|p| p.unique_id == player.unique_id) {
            p.position = to;
        }
        let mut moved = player;
        moved.position = to;
        self.fire(PluginEvent::PlayerMove {
            player: moved,
            from,
            to,
        });
        vec![format!("{name} moved to {:.1} {:.1} {:.1}", to.x, to.y, to.z)]
    }

    fn edit_tag(&mut self, args: &[String], add: bool) -> Vec<String> {
        let (Some(name), Some(tag)) = (args.first(), args.get(1)) else {
            return vec!["Usage: tag|untag <player> <tag>".into()];
        };
        let Some(player) = self.players.iter_mut().find(|p| p.name.eq_ignore_ascii_case(name)) else {
            return vec![format!("{name} is not online")];
        };
        player.tags.retain(|t| t != tag);
        if add {
            player.tags.push(tag.clone());
        }
        vec![format!("{} tags: [{}]", player.name, player.tags.join(", "))]
    }

    fn sprint(&mut self, args: &[String]) -> Vec<String> {
        let (Some(name), Some(state)) = (args.first(), args.get(1)) else {
            return vec!["Usage: sprint <player> on|off".into()];
        };
        let Some(player) = self.players.iter_mut().find(|p| p.name.eq_ignore_ascii_case(name)) else {
            return vec![format!("{name} is not online")];
        };
        player.is_sprinting = state == "on";
        vec![format!("{} sprinting: {}", player.name, player.is_sprinting)]
    }

    fn hit(&mut self, args: &[String]) -> Vec<String> {
        let (Some(attacker), Some(victim)) = (args.first(), args.get(1)) else {
            return vec!["Usage: hit <attacker> <victim> [damage]".into()];
        };
        let damage = args.get(2).and_then(|d| d.parse().ok()).unwrap_or(1.0);
        let (Some(attacker), Some(victim)) = (self.player(attacker).cloned(), self.player(victim).cloned()) else {
            return vec!["Both players must be online".into()];
        };

        let attacker_ref = actor_of(&attacker);
        let mut event = PluginEvent::ActorDamage {
            actor: actor_of(&victim),
            damage,
            source: DamageSource {
                cause: DamageCause::EntityAttack,
                attacker: Some(attacker_ref.clone()),
            },
        };
        let result = self.fire_mut(&mut event);
        let PluginEvent::ActorDamage { damage, .. } = event else {
            return Vec::new();
        };
        if result == EventResult::Cancelled {
            return vec![format!("{} -> {}: hit cancelled", attacker.name, victim.name)];
        }

        let mut event = PluginEvent::ActorKnockback {
            actor: actor_of(&victim),
            source: Some(attacker_ref),
            knockback: BASE_KNOCKBACK,
        };
        let result = self.fire_mut(&mut event);
        let knockback = match (result, event) {
            (EventResult::Continue, PluginEvent::ActorKnockback { knockback, .. }) => {
                format!("knockback {:.3} {:.3} {:.3}", knockback.x, knockback.y, knockback.z)
            }
            _ => "no knockback".to_string(),
        };
        vec![format!(
            "{} -> {}: {damage:.2} damage, {knockback}",
            attacker.name, victim.name
        )]
    }

    fn fall(&mut self, args: &[String]) -> Vec<String> {
        let (Some(name), Some(damage)) = (args.first(), args.get(1).and_then(|d| d.parse::<f32>().ok())) else {
            return vec!["Usage: fall <player> <damage>".into()];
        };
        let Some(player) = self.player(name).cloned() else {
            return vec![format!("{name} is not online")];
        };
        let mut event = PluginEvent::ActorDamage {
            actor: actor_of(&player),
            damage,
            source: DamageSource {
                cause: DamageCause::Fall,
                attacker: None,
            },
        };
        match (self.fire_mut(&mut event), event) {
            (EventResult::Continue, PluginEvent::ActorDamage { damage, .. }) => {
                vec![format!("{} took {damage:.2} fall damage", player.name)]
            }
            _ => vec![format!("{} fall damage cancelled", player.name)],
        }
    }

    fn block_action(&mut self, verb: &str, args: &[String]) -> Vec<String> {
        let (Some(name), Some(pos), Some(block_type)) =
            (args.first(), parse_vec3(args.get(1..4)), args.get(4))
        else {
            return vec![format!("Usage: {verb} <player> <x> <y> <z> <block>")];
        };
        let Some(player) = self.player(name).cloned() else {
            return vec![format!("{name} is not online")];
        };
        let block = BlockInfo {
            position: BlockPos {
                x: pos.x.floor() as i32,
                y: pos.y.floor() as i32,
                z: pos.z.floor() as i32,
            },
            dimension: player.dimension.clone(),
            block_type: block_type.clone(),
            states: args.get(5..).map(|s| s.to_vec()).unwrap_or_default(),
        };
        let event = match verb {
            "break" => PluginEvent::BlockBreak { player, block },
            "place" => {
                let mut against = block.clone();
                against.position.y -= 1;
                PluginEvent::BlockPlace {
                    player,
                    against,
                    placed: block,
                }
            }
            _ => PluginEvent::PlayerInteract {
                player,
                block: Some(block),
            },
        };
        match self.fire(event) {
            EventResult::Continue => vec![format!("{verb} {block_type}: ok")],
            EventResult::Cancelled => vec![format!("{verb} {block_type}: cancelled")],
        }
    }

    // ─── Plumbing ───────────────────────────────────────────────────────────

    fn fire(&mut self, mut event: PluginEvent) -> EventResult {
        self.fire_mut(&mut event)
    }

    fn fire_mut(&mut self, event: &mut PluginEvent) -> EventResult {
        let snapshot = self.snapshot();
        let (result, actions) = self.plugins.dispatch(event, &snapshot);
        self.apply(actions);
        result
    }

    fn deliver(&mut self, recipient: &str, text: &str) {
        info!("[-> {recipient}] {text}");
        self.inbox.push(Delivery {
            recipient: recipient.to_string(),
            text: text.to_string(),
        });
    }

    fn broadcast(&mut self, text: &str) {
        let names: Vec<String> = self.players.iter().map(|p| p.name.clone()).collect();
        for name in names {
            self.deliver(&name, text);
        }
    }

    /// Apply plugin side effects in order. Effects that raise further events
    /// (kicks, transfers, dispatched commands) queue their own actions behind.
    fn apply(&mut self, actions: Vec<PendingAction>) {
        let mut queue: VecDeque<PendingAction> = actions.into();
        while let Some(action) = queue.pop_front() {
            match action {
                PendingAction::SendMessage {
                    player_name,
                    message,
                } => {
                    if self.player(&player_name).is_some() {
                        self.deliver(&player_name, &message);
                    }
                }
                PendingAction::SendPopup {
                    player_name,
                    message,
                } => {
                    if self.player(&player_name).is_some() {
                        self.deliver(&player_name, &format!("[popup] {message}"));
                    }
                }
                PendingAction::BroadcastMessage { message } => self.broadcast(&message),
                PendingAction::KickPlayer {
                    player_name,
                    reason,
                } => {
                    info!("Kicking {player_name}: {reason}");
                    self.disconnect_queued(&player_name, &reason, &mut queue);
                }
                PendingAction::TeleportPlayer {
                    player_name,
                    dimension,
                    position,
                } => {
                    if let Some(p) = self
                        .players
                        .iter_mut()
                        .find(|p| p.name.eq_ignore_ascii_case(&player_name))
                    {
                        p.position = position;
                        p.dimension = dimension;
                        info!(
                            "Teleported {} to {:.1} {:.1} {:.1} in {}",
                            p.name, position.x, position.y, position.z, p.dimension
                        );
                    }
                }
                PendingAction::TransferPlayer {
                    player_name,
                    address,
                    port,
                } => {
                    info!("Transferring {player_name} to {address}:{port}");
                    self.disconnect_queued(&player_name, "Transferred", &mut queue);
                }
                PendingAction::SetGameMode {
                    player_name,
                    game_mode,
                } => {
                    if let Some(p) = self
                        .players
                        .iter_mut()
                        .find(|p| p.name.eq_ignore_ascii_case(&player_name))
                    {
                        p.game_mode = game_mode;
                    }
                }
                PendingAction::DispatchCommand { command } => {
                    let args = split_args(&command);
                    if let Some((name, rest)) = args.split_first() {
                        let (response, actions) = self.execute(&CommandSender::Console, name, rest);
                        match response {
                            Some(result) => {
                                for line in result.messages {
                                    info!("[{command}] {line}");
                                }
                            }
                            None => warn!("Dispatched unknown command: {command}"),
                        }
                        queue.extend(actions);
                    }
                }
                PendingAction::ForwardWorldCommand { world, command } => {
                    info!("[world {world}] {command}");
                }
                PendingAction::ReloadData => {
                    info!("Reloading plugin data");
                    self.plugins.load_configs();
                }
                other => debug!("Ignoring host action {other:?}"),
            }
        }
    }

    fn disconnect_queued(
        &mut self,
        name: &str,
        reason: &str,
        queue: &mut VecDeque<PendingAction>,
    ) {
        let Some(index) = self.players.iter().position(|p| p.name.eq_ignore_ascii_case(name)) else {
            return;
        };
        let player = self.players.remove(index);
        info!("{} disconnected: {reason}", player.name);
        let mut event = PluginEvent::PlayerQuit { player };
        let snapshot = self.snapshot();
        let (_, actions) = self.plugins.dispatch(&mut event, &snapshot);
        queue.extend(actions);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn actor_of(player: &PluginPlayer) -> ActorRef {
    ActorRef {
        kind: "minecraft:player".into(),
        unique_id: player.unique_id,
        player_name: Some(player.name.clone()),
        tags: player.tags.clone(),
        velocity: player.velocity,
    }
}

/// Derive a repeatable XUID from a gamertag so rejoining keeps the same identity.
fn stable_xuid(name: &str) -> String {
    let hash = name
        .to_lowercase()
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
    (BASE_XUID + hash % 1_000_000_000_000).to_string()
}

fn parse_vec3(parts: Option<&[String]>) -> Option<Vec3> {
    let parts = parts?;
    let x = parts.first()?.parse().ok()?;
    let y = parts.get(1)?.parse().ok()?;
    let z = parts.get(2)?.parse().ok()?;
    Some(Vec3::new(x, y, z))
}

/// Split a command line on whitespace, keeping `"quoted words"` together.
pub fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.trim().chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        args.push(current);
    }
    args
}
