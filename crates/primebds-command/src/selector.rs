//! Entity selector guard: @s, @a, @p, @r, @e.
//!
//! Moderation and lookup commands take literal player names only, so any
//! argument carrying selector syntax is refused before a handler runs.

/// A parsed entity selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// @s: the command sender.
    Sender,
    /// @a: all online players.
    AllPlayers,
    /// @p: nearest player to the sender.
    NearestPlayer,
    /// @r: a random online player.
    RandomPlayer,
    /// @e: all entities.
    AllEntities,
}

/// Try to parse a string as an entity selector, ignoring bracket arguments.
///
/// Returns `None` if the string is not a valid selector.
pub fn parse_selector(s: &str) -> Option<Selector> {
    let head = s.split('[').next().unwrap_or(s);
    match head {
        "@s" => Some(Selector::Sender),
        "@a" => Some(Selector::AllPlayers),
        "@p" => Some(Selector::NearestPlayer),
        "@r" => Some(Selector::RandomPlayer),
        "@e" => Some(Selector::AllEntities),
        _ => None,
    }
}

/// Refuse any argument containing `@`.
///
/// Any `@` counts, not just well-formed selectors, so `"@a"` wrapped in
/// quotes or followed by brackets is rejected too.
pub fn reject_selectors(args: &[String]) -> Result<(), String> {
    match args.iter().find(|a| a.contains('@')) {
        None => Ok(()),
        Some(arg) => match parse_selector(arg.trim_matches('"')) {
            Some(selector) => Err(format!(
                "§c@ selectors are invalid for this command ({selector:?})"
            )),
            None => Err("§c@ selectors are invalid for this command".to_string()),
        },
    }
}

// ===========================================================================
// Tests
// ===========================================================================
