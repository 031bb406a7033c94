use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use crate::models::{SearchError, SearchQuery, SearchResponse, SearchState, SearchStatus};
use crate::orchestration::{CancellationToken, OrchestrationResult, SearchOrchestrator};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Single-flight search state for one user session.
///
/// Each submission gets a generation number. Starting a new submission
/// cancels the previous one, and only the latest generation may write to
/// the shared [`SearchState`].
pub struct SearchSession {
    orchestrator: Arc<SearchOrchestrator>,
    debounce: Duration,
    inner: Mutex<SessionInner>,
}

struct SessionInner {
    generation: u64,
    token: Option<CancellationToken>,
    state: SearchState,
}

impl SearchSession {
    pub fn new(orchestrator: Arc<SearchOrchestrator>) -> Self {
        Self::with_debounce(orchestrator, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(orchestrator: Arc<SearchOrchestrator>, debounce: Duration) -> Self {
        let limiter = orchestrator.rate_limiter();
        let state = SearchState::initial(limiter.remaining_quota(), limiter.reset_time());
        Self {
            orchestrator,
            debounce,
            inner: Mutex::new(SessionInner {
                generation: 0,
                token: None,
                state,
            }),
        }
    }

    pub fn orchestrator(&self) -> &Arc<SearchOrchestrator> {
        &self.orchestrator
    }

    pub fn snapshot(&self) -> SearchState {
        self.lock_inner().state.clone()
    }

    pub fn status(&self) -> SearchStatus {
        self.lock_inner().state.status
    }

    pub fn is_busy(&self) -> bool {
        self.status().is_busy()
    }

    pub fn is_rate_limited(&self) -> bool {
        let inner = self.lock_inner();
        inner.state.status == SearchStatus::Failed && inner.state.rate_limited
    }

    pub fn time_until_reset(&self, now: SystemTime) -> Duration {
        let reset_interval = self.orchestrator.rate_limiter().reset_interval();
        self.lock_inner().state.time_until_reset(now, reset_interval)
    }

    pub async fn submit(&self, query: SearchQuery) -> OrchestrationResult<Arc<SearchResponse>> {
        let (generation, token) = self.begin();
        self.run(generation, token, query).await
    }

    /// Waits out the debounce window first. If another submission arrives
    /// meanwhile this one is dropped without reaching the backend.
    pub async fn submit_debounced(
        &self,
        query: SearchQuery,
    ) -> OrchestrationResult<Arc<SearchResponse>> {
        let (generation, token) = self.begin();

        tokio::select! {
            () = tokio::time::sleep(self.debounce) => {}
            () = token.cancelled() => {
                tracing::debug!(generation, "debounced search superseded");
                return Err(SearchError::Cancelled);
            }
        }

        self.run(generation, token, query).await
    }

    pub fn cancel(&self) {
        let mut inner = self.lock_inner();
        inner.generation = inner.generation.wrapping_add(1);
        if let Some(token) = inner.token.take() {
            token.cancel();
        }
        inner.state.status = SearchStatus::Idle;
        inner.state.error = None;
    }

    /// Forgets cached results and session state, as on logout.
    pub fn reset(&self) {
        self.cancel();
        self.orchestrator.cache().clear();
        let limiter = self.orchestrator.rate_limiter();
        let state = SearchState::initial(limiter.remaining_quota(), limiter.reset_time());
        self.lock_inner().state = state;
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let mut inner = self.lock_inner();
        inner.generation = inner.generation.wrapping_add(1);
        if let Some(previous) = inner.token.take() {
            tracing::debug!(generation = inner.generation, "superseding in-flight search");
            previous.cancel();
        }
        let token = CancellationToken::new();
        inner.token = Some(token.clone());
        (inner.generation, token)
    }

    async fn run(
        &self,
        generation: u64,
        token: CancellationToken,
        query: SearchQuery,
    ) -> OrchestrationResult<Arc<SearchResponse>> {
        let query = query.normalized();
        self.update(generation, |state| {
            state.status = SearchStatus::Pending;
            state.error = None;
            state.rate_limited = false;
        });

        let outcome = self
            .orchestrator
            .search_with(&query, &token, |query_id| {
                self.update(generation, |state| {
                    state.current_query = Some(query.clone());
                    state.query_id = Some(query_id.to_string());
                    state.status = SearchStatus::Running;
                });
            })
            .await;

        let quota = self.orchestrator.rate_limiter().snapshot();
        match &outcome {
            Ok(response) => {
                self.update(generation, |state| {
                    state.results = response.results.clone();
                    state.total_results = response.total_results;
                    state.execution_time = response.execution_time;
                    state.status = SearchStatus::Completed;
                    state.remaining_quota = quota.remaining_quota;
                    state.reset_time = quota.reset_time;
                });
            }
            // A cancelled submission no longer owns the state.
            Err(SearchError::Cancelled) => {}
            Err(error) => {
                self.update(generation, |state| {
                    state.status = SearchStatus::Failed;
                    state.error = Some(error.to_string());
                    state.rate_limited = error.is_rate_limited();
                    state.remaining_quota =
                        error.remaining_quota().unwrap_or(quota.remaining_quota);
                    state.reset_time = error.reset_time().unwrap_or(quota.reset_time);
                });
            }
        }

        let mut inner = self.lock_inner();
        if inner.generation == generation {
            inner.token = None;
        }
        drop(inner);

        outcome
    }

    fn update(&self, generation: u64, apply: impl FnOnce(&mut SearchState)) -> bool {
        let mut inner = self.lock_inner();
        if inner.generation != generation {
            return false;
        }
        apply(&mut inner.state);
        true
    }

    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
