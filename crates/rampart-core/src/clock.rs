//! Wall-clock time source.
//!
//! All deadlines in the core (maturation, expiration, cooldowns, invite
//! lifetime, inactivity) are unix milliseconds read from a [`Clock`], so
//! tests can move time forward without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current unix time in milliseconds.
pub trait Clock: Send + Sync + 'static {
    /// Milliseconds since the unix epoch.
    fn now_millis(&self) -> u64;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start at the given unix millisecond.
    pub fn starting_at(millis: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(millis)),
        }
    }

    /// Move forward.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// `now + window`, saturating.
pub fn deadline(now: u64, window: Duration) -> u64 {
    now.saturating_add(window.as_millis() as u64)
}

/// Time left until `deadline`, zero once it has passed.
pub fn until(now: u64, deadline: u64) -> Duration {
    Duration::from_millis(deadline.saturating_sub(now))
}

/// Render a remaining duration for player-facing reasons, e.g. `1h 4m 9s`.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        (total % 86_400) / 3_600,
        (total % 3_600) / 60,
        total % 60,
    );

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::starting_at(1_000);
        clock.advance(Duration::from_secs(2));
        assert_eq!(clock.now_millis(), 3_000);

        let shared = clock.clone();
        shared.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn until_saturates() {
        assert_eq!(until(500, 200), Duration::ZERO);
        assert_eq!(until(200, 500), Duration::from_millis(300));
    }

    #[test]
    fn remaining_format() {
        assert_eq!(format_remaining(Duration::ZERO), "0s");
        assert_eq!(format_remaining(Duration::from_secs(59)), "59s");
        assert_eq!(format_remaining(Duration::from_secs(3_600 + 240 + 9)), "1h 4m 9s");
        assert_eq!(format_remaining(Duration::from_secs(86_400 + 60)), "1d 1m");
    }

    #[test]
    fn system_clock_is_past_2020() {
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
