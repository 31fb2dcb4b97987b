//! Chat formatting: colour codes, message prefixes, durations and timestamps.

use chrono::{DateTime, FixedOffset};

/// Bedrock `§` colour codes.
pub mod color {
    pub const GREEN: &str = "§a";
    pub const AQUA: &str = "§b";
    pub const RED: &str = "§c";
    pub const YELLOW: &str = "§e";
    pub const WHITE: &str = "§f";
    pub const GOLD: &str = "§6";
    pub const GRAY: &str = "§7";
    pub const DARK_GRAY: &str = "§8";
    pub const ITALIC: &str = "§o";
    pub const RESET: &str = "§r";
}

use color::*;

pub const INFO: &str = "§8[§bPrimeBDS§8] §r";
pub const ERROR: &str = "§8[§cPrimeBDS§8] §c";
pub const NOTICE: &str = "§8[§6PrimeBDS§8] §6";
pub const MOD_LOG: &str = "§8[§cMod Log§8] §6";

/// Eastern Standard Time, without daylight saving.
const EST_OFFSET_SECS: i32 = 5 * 3600;

const UNITS: [(&str, i64); 4] = [("day", 86_400), ("hour", 3_600), ("minute", 60), ("second", 1)];

/// Human duration with at most three parts, e.g. `2 days, 3 hours`.
pub fn format_duration(secs: i64) -> String {
    let mut rest = secs.max(0);
    let mut parts = Vec::new();
    for (name, size) in UNITS {
        let n = rest / size;
        rest %= size;
        if n > 0 {
            parts.push(format!("{n} {name}{}", if n == 1 { "" } else { "s" }));
        }
        if parts.len() == 3 {
            break;
        }
    }
    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    }
}

/// Time left until `expiration`, or `Permanent`.
pub fn format_time_remaining(expiration: Option<i64>, now: i64) -> String {
    match expiration {
        None => "Permanent".to_string(),
        Some(exp) if exp <= now => "expired".to_string(),
        Some(exp) => format_duration(exp - now),
    }
}

/// `in 2 days, 3 hours` or `never`, for "expires ..." phrasing.
pub fn describe_expiration(expiration: Option<i64>, now: i64) -> String {
    match expiration {
        None => "never".to_string(),
        Some(_) => format!("in {}", format_time_remaining(expiration, now)),
    }
}

/// Unix seconds as an EST wall-clock string.
pub fn est_timestamp(ts: i64) -> String {
    let Some(offset) = FixedOffset::west_opt(EST_OFFSET_SECS) else {
        return ts.to_string();
    };
    match DateTime::from_timestamp(ts, 0) {
        Some(utc) => utc
            .with_timezone(&offset)
            .format("%Y-%m-%d %I:%M:%S %p EST")
            .to_string(),
        None => ts.to_string(),
    }
}

/// Disconnect message for a banned player.
pub fn ban_message(level_name: &str, expires: &str, reason: &str) -> String {
    format!(
        "{RED}You are banned from {YELLOW}{level_name}\n\
         {RED}Reason: {YELLOW}{reason}\n\
         {RED}Expires: {YELLOW}{expires}"
    )
}

/// Notice shown to a muted player.
pub fn mute_notice(reason: &str, expires: &str) -> String {
    format!("{GOLD}You are muted for {YELLOW}\"{reason}\" {GOLD}which expires {YELLOW}{expires}")
}
