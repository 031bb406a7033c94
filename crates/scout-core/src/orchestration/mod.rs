pub mod cancellation;
pub mod orchestrator;
pub mod retry;
pub mod session;

pub use cancellation::CancellationToken;
pub use orchestrator::SearchOrchestrator;
pub use retry::{RetryError, RetryPolicy};
pub use session::SearchSession;

use crate::models::SearchError;

pub type OrchestrationResult<T> = Result<T, SearchError>;
