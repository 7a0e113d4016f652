//! Sliding-window counter for free actions.
//!
//! A window holds at most `capacity` timestamps younger than `window`. Entries
//! with `t >= now - window` are kept; an entry exactly `window` old still counts.
//! The store performs prune, capacity check and append in one statement; this
//! type applies the same rule in memory.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::config::FreePostConfig;

use crate::ledger::LedgerError;

/// Capacity and length of a free-action window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindowPolicy {
    /// Maximum entries inside one window.
    pub capacity: u32,
    /// Window length.
    pub window: TimeDelta,
}

impl RateWindowPolicy {
    /// Three free posts per 24 hours.
    pub const FREE_POSTS: Self = Self {
        capacity: 3,
        window: TimeDelta::hours(24),
    };

    /// Earliest timestamp still inside the window at `now`.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }
}

impl Default for RateWindowPolicy {
    fn default() -> Self {
        Self::FREE_POSTS
    }
}

/// Longest accepted window, one leap year.
pub const MAX_WINDOW_SECS: i64 = 366 * 86_400;

impl TryFrom<FreePostConfig> for RateWindowPolicy {
    type Error = LedgerError;

    fn try_from(config: FreePostConfig) -> Result<Self, Self::Error> {
        if config.capacity == 0 {
            return Err(LedgerError::Validation(
                "free post capacity must be positive".to_string(),
            ));
        }
        if config.window_secs <= 0 || config.window_secs > MAX_WINDOW_SECS {
            return Err(LedgerError::Validation(format!(
                "free post window must be between 1 and {MAX_WINDOW_SECS} seconds, got {}",
                config.window_secs
            )));
        }
        let window = TimeDelta::try_seconds(config.window_secs).ok_or_else(|| {
            LedgerError::Validation("free post window out of range".to_string())
        })?;
        Ok(Self {
            capacity: config.capacity,
            window,
        })
    }
}

/// Ordered timestamps of consumed free actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindowState {
    entries: Vec<DateTime<Utc>>,
}

impl RateWindowState {
    /// Builds a state from stored timestamps in any order.
    #[must_use]
    pub fn new(mut entries: Vec<DateTime<Utc>>) -> Self {
        entries.sort_unstable();
        Self { entries }
    }

    /// Stored timestamps, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[DateTime<Utc>] {
        &self.entries
    }

    /// Drops entries older than the window.
    pub fn prune(&mut self, now: DateTime<Utc>, policy: &RateWindowPolicy) {
        let cutoff = policy.cutoff(now);
        self.entries.retain(|t| *t >= cutoff);
    }

    /// Entries inside the window at `now`.
    #[must_use]
    pub fn used(&self, now: DateTime<Utc>, policy: &RateWindowPolicy) -> u32 {
        let cutoff = policy.cutoff(now);
        let used = self.entries.iter().filter(|t| **t >= cutoff).count();
        u32::try_from(used).unwrap_or(u32::MAX)
    }

    /// Free actions still available at `now`.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>, policy: &RateWindowPolicy) -> u32 {
        policy.capacity.saturating_sub(self.used(now, policy))
    }

    /// When the oldest live entry leaves the window, if the window is full.
    #[must_use]
    pub fn retry_at(&self, now: DateTime<Utc>, policy: &RateWindowPolicy) -> Option<DateTime<Utc>> {
        if self.remaining(now, policy) > 0 {
            return None;
        }
        let cutoff = policy.cutoff(now);
        self.entries
            .iter()
            .find(|t| **t >= cutoff)
            .map(|oldest| *oldest + policy.window)
    }

    /// Prunes, checks capacity, and records `now`. Returns the remaining count.
    ///
    /// # Errors
    ///
    /// `RateLimitExceeded` when the window is full; the state is only pruned.
    pub fn consume(&mut self, now: DateTime<Utc>, policy: &RateWindowPolicy) -> Result<u32, LedgerError> {
        self.prune(now, policy);
        if self.remaining(now, policy) == 0 {
            return Err(LedgerError::RateLimitExceeded {
                capacity: policy.capacity,
                retry_at: self.retry_at(now, policy),
            });
        }
        let at = self.entries.partition_point(|t| *t <= now);
        self.entries.insert(at, now);
        Ok(self.remaining(now, policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fourth_within_window_fails() {
        let policy = RateWindowPolicy::FREE_POSTS;
        let mut state = RateWindowState::default();
        assert_eq!(state.consume(t0(), &policy).unwrap(), 2);
        assert_eq!(state.consume(t0() + TimeDelta::hours(1), &policy).unwrap(), 1);
        assert_eq!(state.consume(t0() + TimeDelta::hours(2), &policy).unwrap(), 0);

        let err = state.consume(t0() + TimeDelta::hours(3), &policy).unwrap_err();
        match err {
            LedgerError::RateLimitExceeded { capacity, retry_at } => {
                assert_eq!(capacity, 3);
                assert_eq!(retry_at, Some(t0() + TimeDelta::hours(24)));
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(state.entries().len(), 3);
    }

    #[test]
    fn test_consumption_after_oldest_ages_out() {
        let policy = RateWindowPolicy::FREE_POSTS;
        let mut state = RateWindowState::new(vec![
            t0() + TimeDelta::hours(2),
            t0(),
            t0() + TimeDelta::hours(1),
        ]);
        let later = t0() + TimeDelta::hours(24) + TimeDelta::seconds(1);
        assert_eq!(state.consume(later, &policy).unwrap(), 0);
        assert_eq!(state.entries().len(), 3);
        assert_eq!(state.entries()[0], t0() + TimeDelta::hours(1));
        assert_eq!(state.entries()[2], later);
    }

    #[test]
    fn test_entry_exactly_window_old_still_counts() {
        let policy = RateWindowPolicy::FREE_POSTS;
        let state = RateWindowState::new(vec![t0(), t0(), t0()]);
        assert_eq!(state.remaining(t0() + TimeDelta::hours(24), &policy), 0);
        assert_eq!(
            state.remaining(t0() + TimeDelta::hours(24) + TimeDelta::milliseconds(1), &policy),
            3
        );
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RateWindowPolicy::try_from(FreePostConfig {
            capacity: 5,
            window_secs: 3_600,
        })
        .unwrap();
        assert_eq!(policy.capacity, 5);
        assert_eq!(policy.window, TimeDelta::hours(1));

        let policy = RateWindowPolicy::try_from(FreePostConfig::default()).unwrap();
        assert_eq!(policy, RateWindowPolicy::FREE_POSTS);
    }

    #[test]
    fn test_policy_rejects_bad_config() {
        let cases = [
            (0, 86_400),
            (3, 0),
            (3, -60),
            (3, MAX_WINDOW_SECS + 1),
            (3, i64::MAX),
            (3, i64::MIN),
        ];
        for (capacity, window_secs) in cases {
            let result = RateWindowPolicy::try_from(FreePostConfig {
                capacity,
                window_secs,
            });
            assert!(
                matches!(result, Err(LedgerError::Validation(_))),
                "capacity {capacity}, window {window_secs}s should be rejected"
            );
        }

        let longest = RateWindowPolicy::try_from(FreePostConfig {
            capacity: 1,
            window_secs: MAX_WINDOW_SECS,
        })
        .unwrap();
        assert_eq!(longest.window, TimeDelta::days(366));
    }

    proptest! {
        /// **Property: The window never holds more than capacity live entries**
        #[test]
        fn prop_window_bounded(offsets in prop::collection::vec(0i64..200_000, 1..60), capacity in 1u32..6) {
            let policy = RateWindowPolicy { capacity, window: TimeDelta::hours(24) };
            let mut sorted = offsets;
            sorted.sort_unstable();
            let mut state = RateWindowState::default();
            for offset in sorted {
                let now = t0() + TimeDelta::seconds(offset);
                let before = state.remaining(now, &policy);
                match state.consume(now, &policy) {
                    Ok(remaining) => prop_assert_eq!(remaining + 1, before),
                    Err(LedgerError::RateLimitExceeded { retry_at, .. }) => {
                        prop_assert_eq!(before, 0);
                        prop_assert!(retry_at.is_some_and(|at| at > now));
                    }
                    Err(other) => prop_assert!(false, "unexpected error {other}"),
                }
                prop_assert!(state.used(now, &policy) <= capacity);
                prop_assert!(state.entries().windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }
}
