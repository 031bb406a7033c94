use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use crate::clock::{Clock, SystemClock};

pub const DEFAULT_QUOTA: u32 = 100;
pub const RESET_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RateLimitState {
    pub calls: u32,
    pub window_start: SystemTime,
    pub quota: u32,
}

/// Quota details reported when a request is refused.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RateLimitSnapshot {
    pub remaining_quota: u32,
    pub reset_time: SystemTime,
}

/// Fixed-window limiter for search creation calls.
///
/// Windows roll over lazily: the first check made `reset_interval` or more
/// after `window_start` resets the call counter. There is no timer.
///
/// `can_make_request` and `record_request` are separate calls and only
/// honour the quota when a single caller drives them in order. Concurrent
/// submitters should use [`RateLimiter::try_acquire`], which checks and
/// records under one lock.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    reset_interval: Duration,
    state: Mutex<RateLimitState>,
}

impl RateLimiter {
    pub fn new(quota: u32) -> Self {
        Self::with_clock(quota, RESET_INTERVAL, Arc::new(SystemClock))
    }

    pub fn with_clock(quota: u32, reset_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let window_start = clock.now();
        Self {
            clock,
            reset_interval,
            state: Mutex::new(RateLimitState {
                calls: 0,
                window_start,
                quota,
            }),
        }
    }

    pub fn can_make_request(&self) -> bool {
        let state = self.rolled_over_state();
        state.calls < state.quota
    }

    pub fn record_request(&self) {
        let mut state = self.lock_state();
        state.calls = state.calls.saturating_add(1);
    }

    pub fn try_acquire(&self) -> Result<u32, RateLimitSnapshot> {
        let mut state = self.rolled_over_state();
        if state.calls >= state.quota {
            return Err(RateLimitSnapshot {
                remaining_quota: state.quota.saturating_sub(state.calls),
                reset_time: state.window_start,
            });
        }

        state.calls += 1;
        Ok(state.quota - state.calls)
    }

    pub fn remaining_quota(&self) -> u32 {
        let state = self.rolled_over_state();
        state.quota.saturating_sub(state.calls)
    }

    /// Start of the current window. Add [`RateLimiter::reset_interval`] for
    /// the moment the quota refills.
    pub fn reset_time(&self) -> SystemTime {
        self.lock_state().window_start
    }

    pub fn reset_deadline(&self) -> SystemTime {
        self.reset_time() + self.reset_interval
    }

    pub fn reset_interval(&self) -> Duration {
        self.reset_interval
    }

    pub fn quota(&self) -> u32 {
        self.lock_state().quota
    }

    pub fn state(&self) -> RateLimitState {
        *self.lock_state()
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        let state = self.rolled_over_state();
        RateLimitSnapshot {
            remaining_quota: state.quota.saturating_sub(state.calls),
            reset_time: state.window_start,
        }
    }

    fn rolled_over_state(&self) -> MutexGuard<'_, RateLimitState> {
        let now = self.clock.now();
        let mut state = self.lock_state();
        // A clock that moved backwards counts as no time elapsed.
        let elapsed = now
            .duration_since(state.window_start)
            .unwrap_or(Duration::ZERO);
        if elapsed >= self.reset_interval {
            tracing::debug!(
                previous_calls = state.calls,
                quota = state.quota,
                "rate limit window rolled over"
            );
            state.calls = 0;
            state.window_start = now;
        }
        state
    }

    fn lock_state(&self) -> MutexGuard<'_, RateLimitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA)
    }
}
