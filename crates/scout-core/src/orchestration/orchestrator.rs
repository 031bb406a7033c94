use std::sync::Arc;

use crate::cache::ResultCache;
use crate::models::{SearchError, SearchQuery, SearchResponse, TransportError};
use crate::orchestration::{CancellationToken, OrchestrationResult, RetryError, RetryPolicy};
use crate::rate_limit::RateLimiter;
use crate::transport::{SearchTransport, TransportResult};

/// Drives one search from submission to a terminal outcome.
///
/// Cache hits return without consulting the rate limiter or the transport.
/// Misses take one unit of quota, create the query, then poll for results
/// with the configured [`RetryPolicy`]. Only successful responses are cached.
#[derive(Clone)]
pub struct SearchOrchestrator {
    transport: Arc<dyn SearchTransport>,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResultCache>,
    retry: RetryPolicy,
}

impl SearchOrchestrator {
    pub fn new(
        transport: Arc<dyn SearchTransport>,
        rate_limiter: Arc<RateLimiter>,
        cache: Arc<ResultCache>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            rate_limiter,
            cache,
            retry,
        }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Takes one unit of quota and asks the backend to start the search.
    /// Never retried.
    pub async fn create_search(&self, query: &SearchQuery) -> OrchestrationResult<String> {
        if let Err(snapshot) = self.rate_limiter.try_acquire() {
            tracing::warn!(
                remaining_quota = snapshot.remaining_quota,
                "search rejected by rate limiter"
            );
            return Err(SearchError::RateLimited {
                remaining_quota: snapshot.remaining_quota,
                reset_time: snapshot.reset_time,
            });
        }

        let query = query.normalized();
        let response = self
            .run_blocking(move |transport| transport.search(&query))
            .await
            .map_err(|error| {
                tracing::error!(
                    status = error.status_code(),
                    error = %error,
                    "failed to create search query"
                );
                SearchError::creation_failed(error)
            })?;

        tracing::info!(query_id = %response.query_id, "search query created");
        Ok(response.query_id)
    }

    pub async fn poll_results(&self, query_id: &str) -> OrchestrationResult<SearchResponse> {
        self.poll_results_with(query_id, &self.retry, &CancellationToken::new()).await
    }

    /// Polls until the first successful fetch, the end of the attempt budget,
    /// or cancellation.
    pub async fn poll_results_with(
        &self,
        query_id: &str,
        policy: &RetryPolicy,
        token: &CancellationToken,
    ) -> OrchestrationResult<SearchResponse> {
        let outcome = policy
            .run(token, |_attempt| {
                let query_id = query_id.to_string();
                self.run_blocking(move |transport| transport.get_results(&query_id))
            })
            .await;

        match outcome {
            Ok(response) => Ok(response),
            Err(RetryError::Exhausted {
                attempts,
                last_error,
            }) => {
                tracing::warn!(
                    query_id,
                    attempts,
                    error = %last_error,
                    "timed out waiting for search results"
                );
                Err(SearchError::Timeout {
                    attempts,
                    last_error,
                })
            }
            Err(RetryError::Rejected { attempt, error }) => {
                tracing::error!(
                    query_id,
                    attempt,
                    error = %error,
                    "search results fetch failed"
                );
                Err(SearchError::fetch_failed(error))
            }
            Err(RetryError::Cancelled) => {
                tracing::debug!(query_id, "polling cancelled");
                Err(SearchError::Cancelled)
            }
        }
    }

    pub async fn search(&self, query: &SearchQuery) -> OrchestrationResult<Arc<SearchResponse>> {
        self.search_with(query, &CancellationToken::new(), |_| {}).await
    }

    /// Like [`SearchOrchestrator::search`], reporting the backend query id
    /// through `on_created` before polling starts.
    pub async fn search_with(
        &self,
        query: &SearchQuery,
        token: &CancellationToken,
        on_created: impl FnOnce(&str),
    ) -> OrchestrationResult<Arc<SearchResponse>> {
        let query = query.normalized();
        let key = query.cache_key();

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(query_id = %cached.query_id, "search served from cache");
            return Ok(cached);
        }
        tracing::debug!(criteria = query.criteria.len(), "search cache miss");

        if token.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let query_id = self.create_search(&query).await?;
        on_created(&query_id);

        let response = Arc::new(self.poll_results_with(&query_id, &self.retry, token).await?);
        self.cache.set(key, response.clone());
        Ok(response)
    }

    async fn run_blocking<T, F>(&self, operation: F) -> TransportResult<T>
    where
        F: FnOnce(&dyn SearchTransport) -> TransportResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || operation(transport.as_ref()))
            .await
            .map_err(|join_error| TransportError::Join(join_error.to_string()))?
    }
}
