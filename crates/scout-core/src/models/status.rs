use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::models::{SearchQuery, SearchResult};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    #[default]
    Idle,
    Pending,
    Running,
    Completed,
    Failed,
}

impl SearchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn is_busy(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

/// What a search page renders for the latest submission.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchState {
    pub current_query: Option<SearchQuery>,
    pub query_id: Option<String>,
    pub results: Vec<SearchResult>,
    pub status: SearchStatus,
    pub error: Option<String>,
    pub total_results: u64,
    pub execution_time: f64,
    pub remaining_quota: u32,
    /// Start of the quota window reported by the rate limiter.
    pub reset_time: SystemTime,
    pub rate_limited: bool,
}

impl SearchState {
    pub fn initial(remaining_quota: u32, reset_time: SystemTime) -> Self {
        Self {
            current_query: None,
            query_id: None,
            results: Vec::new(),
            status: SearchStatus::Idle,
            error: None,
            total_results: 0,
            execution_time: 0.0,
            remaining_quota,
            reset_time,
            rate_limited: false,
        }
    }

    /// Countdown shown next to a rate-limit error: `reset_time + reset_interval - now`,
    /// floored at zero.
    pub fn time_until_reset(&self, now: SystemTime, reset_interval: Duration) -> Duration {
        (self.reset_time + reset_interval)
            .duration_since(now)
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use super::*;

    #[test]
    fn countdown_floors_at_zero() {
        let window_start = UNIX_EPOCH + Duration::from_secs(10_000);
        let state = SearchState::initial(0, window_start);
        let hour = Duration::from_secs(3600);

        assert_eq!(
            state.time_until_reset(window_start + Duration::from_secs(600), hour),
            Duration::from_secs(3000)
        );
        assert_eq!(
            state.time_until_reset(window_start + Duration::from_secs(7200), hour),
            Duration::ZERO
        );
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(SearchStatus::Completed.is_terminal());
        assert!(SearchStatus::Failed.is_terminal());
        assert!(!SearchStatus::Running.is_terminal());
        assert!(SearchStatus::Pending.is_busy());
        assert!(!SearchStatus::Idle.is_busy());
    }
}
