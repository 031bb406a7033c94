pub mod cache;
pub mod clock;
pub mod config;
pub mod models;
pub mod orchestration;
pub mod rate_limit;
pub mod transport;

pub use cache::ResultCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ScoutConfig};
pub use orchestration::{CancellationToken, RetryPolicy, SearchOrchestrator, SearchSession};
pub use rate_limit::RateLimiter;
