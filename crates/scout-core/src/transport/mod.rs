pub mod http;
pub mod mock;

use crate::models::{SearchQuery, SearchResponse, TransportError};

pub use http::HttpSearchTransport;
pub use mock::MockSearchTransport;

pub type TransportResult<T> = Result<T, TransportError>;

/// Backend that executes candidate searches.
///
/// Calls may block; the orchestrator runs them on the blocking pool.
pub trait SearchTransport: Send + Sync {
    fn search(&self, query: &SearchQuery) -> TransportResult<SearchResponse>;

    /// Fails while the query is unknown or not ready yet.
    fn get_results(&self, query_id: &str) -> TransportResult<SearchResponse>;
}
