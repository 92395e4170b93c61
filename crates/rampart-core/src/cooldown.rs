//! Per-player cooldowns.

use crate::clock::{deadline, until};
use crate::ids::PlayerId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Deadlines keyed by player. An entry is ignored once its deadline passes
/// and dropped by [`CooldownMap::purge_expired`] or the next lookup.
#[derive(Debug, Default)]
pub struct CooldownMap {
    deadlines: Mutex<HashMap<PlayerId, u64>>,
}

impl CooldownMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left on the player's cooldown, if one is running.
    pub fn remaining(&self, player: &PlayerId, now: u64) -> Option<Duration> {
        let mut deadlines = self.deadlines.lock();
        match deadlines.get(player) {
            Some(&ends) if now < ends => Some(until(now, ends)),
            Some(_) => {
                deadlines.remove(player);
                None
            }
            None => None,
        }
    }

    /// Start (or restart) the player's cooldown.
    pub fn start(&self, player: PlayerId, now: u64, length: Duration) {
        self.deadlines.lock().insert(player, deadline(now, length));
    }

    /// Clear the player's cooldown. Clearing twice is harmless.
    pub fn clear(&self, player: &PlayerId) {
        self.deadlines.lock().remove(player);
    }

    /// Drop every elapsed entry. Returns how many were dropped.
    pub fn purge_expired(&self, now: u64) -> usize {
        let mut deadlines = self.deadlines.lock();
        let before = deadlines.len();
        deadlines.retain(|_, ends| now < *ends);
        before - deadlines.len()
    }

    /// Entries currently held, elapsed or not.
    pub fn len(&self) -> usize {
        self.deadlines.lock().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.deadlines.lock().is_empty()
    }
}
