//! Small helpers for picking apart command arguments.

/// Strip surrounding double quotes from a player name argument.
pub fn player_name(arg: &str) -> &str {
    arg.trim().trim_matches('"')
}

/// Join `args[from..]` into a reason, or fall back to `default` when empty.
pub fn reason(args: &[String], from: usize, default: &str) -> String {
    match args.get(from..) {
        Some(rest) if !rest.is_empty() => rest.join(" "),
        _ => default.to_string(),
    }
}
