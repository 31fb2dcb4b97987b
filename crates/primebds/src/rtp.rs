//! Random-teleport warmups and cooldowns.
//!
//! A warmup is a repeating host task that checks once a second whether the
//! player has moved. Pending warmups are keyed by XUID and by task id, so a
//! task that fires after its warmup was cancelled finds nothing and does
//! nothing.

use std::collections::HashMap;
use std::f64::consts::TAU;

use primebds_config::RtpSection;
use primebds_plugin_api::Vec3;
use rand::Rng;

/// Sampling attempts before giving up.
pub const MAX_ATTEMPTS: usize = 40;
/// Minimum spacing between two sampled columns.
pub const ATTEMPT_SEPARATION: f64 = 12.0;
/// Moving further than this from the start cancels the warmup.
pub const MOVE_TOLERANCE: f32 = 0.25;
/// Host ticks between warmup checks.
pub const CHECK_INTERVAL_TICKS: u64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Warmup {
    pub task_id: u32,
    pub player_name: String,
    pub dimension: String,
    pub start: Vec3,
    pub destination: Vec3,
    pub started_at: f64,
    pub delay: f64,
}

impl Warmup {
    pub fn remaining(&self, now: f64) -> f64 {
        (self.delay - (now - self.started_at)).max(0.0)
    }

    pub fn moved(&self, position: &Vec3) -> bool {
        self.start.distance(position) > MOVE_TOLERANCE
    }
}

#[derive(Debug, Default)]
pub struct RtpTracker {
    cooldowns: HashMap<String, f64>,
    pending: HashMap<String, Warmup>,
    by_task: HashMap<u32, String>,
    next_task_id: u32,
}

impl RtpTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self, xuid: &str) -> bool {
        self.pending.contains_key(xuid)
    }

    pub fn pending(&self, xuid: &str) -> Option<&Warmup> {
        self.pending.get(xuid)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Seconds left on the cooldown, if still cooling down.
    pub fn cooldown_remaining(&self, xuid: &str, now: f64, cooldown: f64) -> Option<f64> {
        let last = self.cooldowns.get(xuid)?;
        let elapsed = now - last;
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }

    pub fn mark_used(&mut self, xuid: &str, now: f64) {
        self.cooldowns.insert(xuid.to_string(), now);
    }

    pub fn allocate_task_id(&mut self) -> u32 {
        self.next_task_id = self.next_task_id.wrapping_add(1);
        self.next_task_id
    }

    pub fn begin(&mut self, xuid: &str, warmup: Warmup) {
        self.by_task.insert(warmup.task_id, xuid.to_string());
        self.pending.insert(xuid.to_string(), warmup);
    }

    /// The warmup a task belongs to, if it is still pending.
    pub fn for_task(&self, task_id: u32) -> Option<(&str, &Warmup)> {
        let xuid = self.by_task.get(&task_id)?;
        self.pending.get(xuid).map(|w| (xuid.as_str(), w))
    }

    /// Remove the pending warmup for `xuid`, returning it so the caller can
    /// cancel its task.
    pub fn cancel(&mut self, xuid: &str) -> Option<Warmup> {
        let warmup = self.pending.remove(xuid)?;
        self.by_task.remove(&warmup.task_id);
        Some(warmup)
    }

    /// Drop every pending warmup, returning their task ids.
    pub fn clear(&mut self) -> Vec<u32> {
        self.by_task.clear();
        self.cooldowns.clear();
        self.pending.drain().map(|(_, w)| w.task_id).collect()
    }
}

/// Pick a column on the ring between `min_distance` and `radius` around the
/// configured centre. `highest_y` returns the top block of a column, or
/// `None` when the column is unusable.
pub fn find_destination<R, F>(rng: &mut R, rtp: &RtpSection, mut highest_y: F) -> Option<Vec3>
where
    R: Rng,
    F: FnMut(i32, i32) -> Option<i32>,
{
    let (low, high) = if rtp.min_distance <= rtp.radius {
        (rtp.min_distance, rtp.radius)
    } else {
        (rtp.radius, rtp.min_distance)
    };
    let mut attempted: Vec<(f64, f64)> = Vec::new();

    for _ in 0..MAX_ATTEMPTS {
        let angle = rng.gen::<f64>() * TAU;
        let dist = if high > low {
            rng.gen_range(low..=high)
        } else {
            low
        };
        let x = rtp.x + angle.cos() * dist;
        let z = rtp.z + angle.sin() * dist;

        let too_close = attempted
            .iter()
            .any(|(ax, az)| ((x - ax).powi(2) + (z - az).powi(2)).sqrt() < ATTEMPT_SEPARATION);
        if too_close {
            continue;
        }
        attempted.push((x, z));

        if let Some(y) = highest_y(x.floor() as i32, z.floor() as i32) {
            return Some(Vec3::new(x as f32, (y + 1) as f32, z as f32));
        }
    }
    None
}
