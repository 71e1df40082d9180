// Mention spam counter - running mention totals per (guild, user).
//
// A bucket opens on a user's first mention and lasts for the guild's mention
// window. Once the window has passed the next message starts a fresh bucket.

use super::moderation_models::MentionCheck;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Handle the moderation pipeline uses to reset a user's counter after
/// enforcement.
pub trait SpamCounter: Send + Sync {
    fn clear(&self, guild_id: u64, user_id: u64);
}

#[derive(Debug, Clone, Copy)]
struct MentionBucket {
    total: u32,
    opened_at: Instant,
    window: Duration,
}

impl MentionBucket {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.opened_at) >= self.window
    }
}

pub struct MentionSpamTracker {
    buckets: DashMap<(u64, u64), MentionBucket>,
}

impl MentionSpamTracker {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Add `mentions` to the user's total and compare it with `threshold`.
    ///
    /// The threshold is the number of mentions allowed, so going over it
    /// (not reaching it) is what counts as exceeded.
    pub fn record(
        &self,
        guild_id: u64,
        user_id: u64,
        mentions: u32,
        threshold: u32,
        window: Duration,
    ) -> MentionCheck {
        self.record_at(guild_id, user_id, mentions, threshold, window, Instant::now())
    }

    fn record_at(
        &self,
        guild_id: u64,
        user_id: u64,
        mentions: u32,
        threshold: u32,
        window: Duration,
        now: Instant,
    ) -> MentionCheck {
        let mut bucket = self
            .buckets
            .entry((guild_id, user_id))
            .or_insert(MentionBucket {
                total: 0,
                opened_at: now,
                window,
            });

        if bucket.is_expired(now) {
            *bucket = MentionBucket {
                total: 0,
                opened_at: now,
                window,
            };
        }

        bucket.total = bucket.total.saturating_add(mentions);
        let total = bucket.total;

        if total > threshold {
            MentionCheck::Exceeded { total }
        } else {
            MentionCheck::Ok { total }
        }
    }

    /// Current total for a user, 0 if there is no bucket.
    #[allow(dead_code)]
    pub fn total(&self, guild_id: u64, user_id: u64) -> u32 {
        self.buckets
            .get(&(guild_id, user_id))
            .map(|b| b.total)
            .unwrap_or(0)
    }

    /// Drop buckets whose window has passed. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_expired(now));
        before - self.buckets.len()
    }
}

impl SpamCounter for MentionSpamTracker {
    fn clear(&self, guild_id: u64, user_id: u64) {
        self.buckets.remove(&(guild_id, user_id));
    }
}

impl Default for MentionSpamTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(5);

    #[test]
    fn test_threshold_is_exceeded_only_when_passed() {
        let tracker = MentionSpamTracker::new();
        let now = Instant::now();

        assert_eq!(
            tracker.record_at(1, 10, 3, 5, WINDOW, now),
            MentionCheck::Ok { total: 3 }
        );
        assert_eq!(
            tracker.record_at(1, 10, 2, 5, WINDOW, now),
            MentionCheck::Ok { total: 5 }
        );
        assert_eq!(
            tracker.record_at(1, 10, 1, 5, WINDOW, now),
            MentionCheck::Exceeded { total: 6 }
        );
    }

    #[test]
    fn test_totals_are_per_guild_and_user() {
        let tracker = MentionSpamTracker::new();
        let now = Instant::now();

        tracker.record_at(1, 10, 4, 5, WINDOW, now);
        tracker.record_at(2, 10, 4, 5, WINDOW, now);
        tracker.record_at(1, 11, 4, 5, WINDOW, now);

        assert_eq!(tracker.total(1, 10), 4);
        assert_eq!(tracker.total(2, 10), 4);
        assert_eq!(tracker.total(1, 11), 4);
    }

    #[test]
    fn test_window_expiry_starts_a_new_bucket() {
        let tracker = MentionSpamTracker::new();
        let start = Instant::now();

        tracker.record_at(1, 10, 5, 5, WINDOW, start);
        let later = start + WINDOW + Duration::from_millis(1);

        assert_eq!(
            tracker.record_at(1, 10, 2, 5, WINDOW, later),
            MentionCheck::Ok { total: 2 }
        );
    }

    #[test]
    fn test_clear_resets_counter() {
        let tracker = MentionSpamTracker::new();
        tracker.record(1, 10, 9, 5, WINDOW);
        tracker.clear(1, 10);

        assert_eq!(tracker.total(1, 10), 0);
    }

    #[test]
    fn test_sweep_drops_only_expired_buckets() {
        let tracker = MentionSpamTracker::new();
        let start = Instant::now();

        tracker.record_at(1, 10, 1, 5, Duration::from_secs(1), start);
        tracker.record_at(1, 11, 1, 5, Duration::from_secs(60), start);

        let removed = tracker.sweep(start + Duration::from_secs(2));
        assert_eq!(removed, 1);
        assert_eq!(tracker.total(1, 10), 0);
        assert_eq!(tracker.total(1, 11), 1);
    }
}
