//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `SCOUT_*` environment variables (`__` separates nested keys, e.g.
//! `SCOUT_RATE_LIMIT__QUOTA=10`).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{DEFAULT_TTL, ResultCache};
use crate::clock::Clock;
use crate::orchestration::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::orchestration::session::DEFAULT_DEBOUNCE;
use crate::orchestration::{RetryPolicy, SearchOrchestrator};
use crate::rate_limit::{DEFAULT_QUOTA, RESET_INTERVAL, RateLimiter};
use crate::transport::SearchTransport;
use crate::transport::http::{DEFAULT_API_PREFIX, DEFAULT_BASE_URL};

pub const ENV_PREFIX: &str = "SCOUT_";
const TOKEN_KEY: &str = "backend.token";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub backend: BackendConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub polling: PollingConfig,
    pub session: SessionConfig,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_prefix: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub quota: u32,
    pub reset_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            quota: DEFAULT_QUOTA,
            reset_interval_secs: RESET_INTERVAL.as_secs(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval_ms: u64::try_from(DEFAULT_POLL_INTERVAL.as_millis()).unwrap_or(2000),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub debounce_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: u64::try_from(DEFAULT_DEBOUNCE.as_millis()).unwrap_or(500),
        }
    }
}

impl ScoutConfig {
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(ScoutConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }

        let env = Env::prefixed(ENV_PREFIX).split("__");
        // Tokens are opaque text even when they look numeric.
        let token = env.clone().only(&[TOKEN_KEY]).iter().next().map(|(_, value)| value);
        figment = figment.merge(env.ignore(&[TOKEN_KEY]));
        match token {
            Some(token) => figment.merge(Serialized::default(TOKEN_KEY, token)),
            None => figment,
        }
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: ScoutConfig = Self::figment(path).extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.backend.base_url.starts_with("http://")
            || self.backend.base_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(format!(
                "backend.base_url must be an http(s) URL, got '{}'",
                self.backend.base_url
            )));
        }
        if self.rate_limit.quota == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.quota must be positive".to_string(),
            ));
        }
        if self.rate_limit.reset_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.reset_interval_secs must be positive".to_string(),
            ));
        }
        if self.polling.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "polling.max_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy safe to print: the bearer token is masked.
    pub fn redacted(&self) -> Self {
        let mut redacted = self.clone();
        if redacted.backend.token.is_some() {
            redacted.backend.token = Some("***".to_string());
        }
        redacted
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.polling.max_attempts,
            Duration::from_millis(self.polling.interval_ms),
        )
    }

    pub fn rate_limiter(&self, clock: Arc<dyn Clock>) -> RateLimiter {
        RateLimiter::with_clock(
            self.rate_limit.quota,
            Duration::from_secs(self.rate_limit.reset_interval_secs),
            clock,
        )
    }

    pub fn result_cache(&self, clock: Arc<dyn Clock>) -> ResultCache {
        ResultCache::with_clock(Duration::from_secs(self.cache.ttl_secs), clock)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.session.debounce_ms)
    }

    pub fn orchestrator(
        &self,
        transport: Arc<dyn SearchTransport>,
        clock: Arc<dyn Clock>,
    ) -> SearchOrchestrator {
        SearchOrchestrator::new(
            transport,
            Arc::new(self.rate_limiter(clock.clone())),
            Arc::new(self.result_cache(clock)),
            self.retry_policy(),
        )
    }
}
