use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Failure reported by a [`crate::transport::SearchTransport`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TransportError {
    #[error("API request failed: {status} {status_text}{}", body_suffix(.body))]
    Http {
        status: u16,
        status_text: String,
        body: Option<String>,
    },
    #[error("cannot reach search backend: {0}")]
    Network(String),
    #[error("malformed search backend response: {0}")]
    Decode(String),
    #[error("no authentication token available")]
    MissingToken,
    #[error("unknown search query '{0}'")]
    UnknownQuery(String),
    #[error("transport task failed: {0}")]
    Join(String),
}

fn body_suffix(body: &Option<String>) -> String {
    body.as_deref()
        .map(|body| format!(" - {body}"))
        .unwrap_or_default()
}

impl TransportError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Http { status, .. } => *status,
            Self::UnknownQuery(_) => 404,
            Self::MissingToken => 401,
            Self::Network(_) | Self::Decode(_) | Self::Join(_) => 500,
        }
    }
}

/// Classified terminal failure of a search submission.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SearchError {
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited {
        remaining_quota: u32,
        /// Start of the current quota window.
        reset_time: SystemTime,
    },
    #[error("Timeout waiting for results after {attempts} attempts: {last_error}")]
    Timeout {
        attempts: u32,
        last_error: TransportError,
    },
    #[error("{context}: {source}")]
    Request {
        context: &'static str,
        source: TransportError,
    },
    #[error("search was cancelled")]
    Cancelled,
}

impl SearchError {
    pub(crate) fn creation_failed(source: TransportError) -> Self {
        Self::Request {
            context: "Failed to create search query",
            source,
        }
    }

    pub(crate) fn fetch_failed(source: TransportError) -> Self {
        Self::Request {
            context: "Failed to fetch search results",
            source,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::RateLimited { .. } => 429,
            Self::Timeout { .. } => 408,
            Self::Request { .. } => 500,
            Self::Cancelled => 499,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn remaining_quota(&self) -> Option<u32> {
        match self {
            Self::RateLimited {
                remaining_quota, ..
            } => Some(*remaining_quota),
            _ => None,
        }
    }

    pub fn reset_time(&self) -> Option<SystemTime> {
        match self {
            Self::RateLimited { reset_time, .. } => Some(*reset_time),
            _ => None,
        }
    }

    pub fn reset_time_ms(&self) -> Option<u64> {
        self.reset_time().map(epoch_millis)
    }
}

pub(crate) fn epoch_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn http_errors_include_body_when_present() {
        let error = TransportError::Http {
            status: 503,
            status_text: "Service Unavailable".to_string(),
            body: Some(r#"{"detail":"warming up"}"#.to_string()),
        };
        assert_eq!(
            error.to_string(),
            r#"API request failed: 503 Service Unavailable - {"detail":"warming up"}"#
        );

        let bare = TransportError::Http {
            status: 502,
            status_text: "Bad Gateway".to_string(),
            body: None,
        };
        assert_eq!(bare.to_string(), "API request failed: 502 Bad Gateway");
    }

    #[test]
    fn transport_status_codes() {
        assert_eq!(TransportError::MissingToken.status_code(), 401);
        assert_eq!(TransportError::UnknownQuery("q".to_string()).status_code(), 404);
        assert_eq!(TransportError::Network("refused".to_string()).status_code(), 500);
        assert_eq!(TransportError::Decode("eof".to_string()).status_code(), 500);
    }

    #[test]
    fn rate_limit_errors_expose_quota_details() {
        let reset_time = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        let error = SearchError::RateLimited {
            remaining_quota: 0,
            reset_time,
        };

        assert_eq!(error.status_code(), 429);
        assert!(error.is_rate_limited());
        assert_eq!(error.remaining_quota(), Some(0));
        assert_eq!(error.reset_time_ms(), Some(1_700_000_000_123));
    }

    #[test]
    fn request_errors_keep_the_cause() {
        let error = SearchError::creation_failed(TransportError::MissingToken);
        assert_eq!(error.status_code(), 500);
        assert_eq!(
            error.to_string(),
            "Failed to create search query: no authentication token available"
        );
        assert!(std::error::Error::source(&error).is_some());
        assert_eq!(error.remaining_quota(), None);
    }
}
