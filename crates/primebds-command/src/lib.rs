//! Command registry, argument helpers, and selector guard.
//!
//! Handlers are plain functions over a caller-owned state `S`, so the plugin
//! decides what context a command sees.

pub mod args;
pub mod selector;

use std::collections::HashMap;

use primebds_plugin_api::{CommandResult, CommandSender, ServerApi};
use tracing::debug;

/// Context passed to a command handler.
pub struct CommandContext {
    /// Who executed the command.
    pub sender: CommandSender,
    /// Arguments after the command name.
    pub args: Vec<String>,
}

impl CommandContext {
    pub fn new(sender: CommandSender, args: Vec<String>) -> Self {
        Self { sender, args }
    }

    /// Argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// Function pointer type for command handlers.
pub type CommandFn<S> = fn(&mut S, &CommandContext, &mut dyn ServerApi) -> CommandResult;

/// Static description of a command.
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Usage lines shown on bad input.
    pub usage: &'static [&'static str],
    /// Permission node required to run the command.
    pub permission: &'static str,
    pub aliases: &'static [&'static str],
}

/// A registered command.
pub struct CommandEntry<S> {
    pub spec: CommandSpec,
    pub handler: CommandFn<S>,
}

impl<S> CommandEntry<S> {
    /// Usage text as a single message.
    pub fn usage(&self) -> String {
        format!("Usage: {}", self.spec.usage.join(" | "))
    }
}

/// Registry of plugin commands keyed by name, with alias lookup.
pub struct CommandRegistry<S> {
    commands: HashMap<&'static str, CommandEntry<S>>,
    aliases: HashMap<&'static str, &'static str>,
}

impl<S> CommandRegistry<S> {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Register a command and its aliases.
    pub fn register(&mut self, spec: CommandSpec, handler: CommandFn<S>) {
        for &alias in spec.aliases {
            self.aliases.insert(alias, spec.name);
        }
        debug!("Registered command /{}", spec.name);
        self.commands.insert(spec.name, CommandEntry { spec, handler });
    }

    /// Look up a command by name or alias (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&CommandEntry<S>> {
        let lower = name.to_lowercase();
        let canonical = self
            .aliases
            .get(lower.as_str())
            .copied()
            .unwrap_or(lower.as_str());
        self.commands.get(canonical)
    }

    /// Execute a command by name or alias. Returns `None` if unknown.
    pub fn execute(
        &self,
        state: &mut S,
        name: &str,
        ctx: &CommandContext,
        api: &mut dyn ServerApi,
    ) -> Option<CommandResult> {
        self.get(name).map(|entry| (entry.handler)(state, ctx, api))
    }

    /// All registered commands.
    pub fn entries(&self) -> impl Iterator<Item = &CommandEntry<S>> {
        self.commands.values()
    }

    /// Every name the host should route to us: command names plus aliases.
    pub fn routable_names(&self) -> Vec<(&'static str, &'static str)> {
        let mut names: Vec<(&'static str, &'static str)> = self
            .commands
            .values()
            .flat_map(|e| {
                std::iter::once(e.spec.name)
                    .chain(e.spec.aliases.iter().copied())
                    .map(move |n| (n, e.spec.description))
            })
            .collect();
        names.sort();
        names
    }
}

impl<S> Default for CommandRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
