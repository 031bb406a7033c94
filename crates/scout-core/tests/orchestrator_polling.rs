use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use scout_core::cache::ResultCache;
use scout_core::models::{
    SearchError, SearchField, SearchOperator, SearchQuery, SearchResponse, TransportError,
};
use scout_core::orchestration::{CancellationToken, RetryPolicy, SearchOrchestrator};
use scout_core::rate_limit::RateLimiter;
use scout_core::transport::{SearchTransport, TransportResult};
use time::OffsetDateTime;

struct ScriptedTransport {
    failing_fetches: usize,
    fail_creation: bool,
    search_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    fetch_times: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    fn new(failing_fetches: usize) -> Self {
        Self {
            failing_fetches,
            fail_creation: false,
            search_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            fetch_times: Mutex::new(Vec::new()),
        }
    }

    fn failing_creation() -> Self {
        Self {
            fail_creation: true,
            ..Self::new(0)
        }
    }
}

fn response(query_id: &str) -> SearchResponse {
    SearchResponse {
        query_id: query_id.to_string(),
        total_results: 0,
        results: Vec::new(),
        execution_time: 0.2,
        created_at: OffsetDateTime::now_utc(),
    }
}

impl SearchTransport for ScriptedTransport {
    fn search(&self, _query: &SearchQuery) -> TransportResult<SearchResponse> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_creation {
            return Err(TransportError::Network("connection refused".to_string()));
        }
        Ok(response("q-1"))
    }

    fn get_results(&self, query_id: &str) -> TransportResult<SearchResponse> {
        let attempt = self.fetch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.fetch_times.lock().unwrap().push(Instant::now());
        if attempt <= self.failing_fetches {
            return Err(TransportError::Http {
                status: 404,
                status_text: "Not Found".to_string(),
                body: Some(format!("attempt {attempt}")),
            });
        }
        let mut ready = response(query_id);
        ready.total_results = attempt as u64;
        Ok(ready)
    }
}

fn orchestrator(
    transport: Arc<ScriptedTransport>,
    quota: u32,
    policy: RetryPolicy,
) -> SearchOrchestrator {
    SearchOrchestrator::new(
        transport,
        Arc::new(RateLimiter::new(quota)),
        Arc::new(ResultCache::new()),
        policy,
    )
}

fn query() -> SearchQuery {
    SearchQuery::new().criterion(SearchField::Title, SearchOperator::Contains, "engineer")
}

#[tokio::test]
async fn exhausted_polling_times_out_after_exactly_max_attempts() {
    let transport = Arc::new(ScriptedTransport::new(usize::MAX));
    let orchestrator = orchestrator(
        transport.clone(),
        10,
        RetryPolicy::fixed(3, Duration::from_millis(10)),
    );

    let error = orchestrator.poll_results("q-1").await.unwrap_err();

    assert_eq!(transport.fetch_calls.load(Ordering::SeqCst), 3);
    let times = transport.fetch_times.lock().unwrap().clone();
    for pair in times.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(10));
    }

    assert_eq!(error.status_code(), 408);
    match error {
        SearchError::Timeout {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(
                last_error,
                TransportError::Http {
                    status: 404,
                    status_text: "Not Found".to_string(),
                    body: Some("attempt 3".to_string()),
                }
            );
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn polling_stops_at_the_first_success() {
    let transport = Arc::new(ScriptedTransport::new(1));
    let orchestrator = orchestrator(
        transport.clone(),
        10,
        RetryPolicy::fixed(5, Duration::from_millis(10)),
    );

    let response = orchestrator.poll_results("q-7").await.unwrap();

    assert_eq!(response.query_id, "q-7");
    assert_eq!(response.total_results, 2);
    assert_eq!(transport.fetch_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rate_limited_creation_never_reaches_the_transport() {
    let transport = Arc::new(ScriptedTransport::new(0));
    let orchestrator = orchestrator(transport.clone(), 1, RetryPolicy::default());
    orchestrator.rate_limiter().record_request();

    let error = orchestrator.create_search(&query()).await.unwrap_err();

    assert_eq!(transport.search_calls.load(Ordering::SeqCst), 0);
    assert_eq!(error.status_code(), 429);
    assert_eq!(error.remaining_quota(), Some(0));
    assert_eq!(
        error.reset_time(),
        Some(orchestrator.rate_limiter().reset_time())
    );
}

#[tokio::test]
async fn creation_failures_are_wrapped_and_still_consume_quota() {
    let transport = Arc::new(ScriptedTransport::failing_creation());
    let orchestrator = orchestrator(transport.clone(), 5, RetryPolicy::default());

    let error = orchestrator.create_search(&query()).await.unwrap_err();

    assert_eq!(error.status_code(), 500);
    assert_eq!(
        error,
        SearchError::Request {
            context: "Failed to create search query",
            source: TransportError::Network("connection refused".to_string()),
        }
    );
    assert_eq!(transport.search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.rate_limiter().remaining_quota(), 4);
}

#[tokio::test]
async fn cancelling_stops_further_poll_attempts() {
    let transport = Arc::new(ScriptedTransport::new(usize::MAX));
    let orchestrator = orchestrator(
        transport.clone(),
        10,
        RetryPolicy::fixed(50, Duration::from_millis(20)),
    );
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let error = orchestrator
        .poll_results_with("q-1", orchestrator.retry_policy(), &token)
        .await
        .unwrap_err();

    assert_eq!(error, SearchError::Cancelled);
    let calls_at_cancel = transport.fetch_calls.load(Ordering::SeqCst);
    assert!(calls_at_cancel < 50);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(transport.fetch_calls.load(Ordering::SeqCst), calls_at_cancel);
}

#[tokio::test]
async fn non_retryable_fetch_errors_fail_immediately() {
    let transport = Arc::new(ScriptedTransport::new(usize::MAX));
    let policy = RetryPolicy::fixed(5, Duration::from_millis(10))
        .with_predicate(|error| error.status_code() != 404);
    let orchestrator = orchestrator(transport.clone(), 10, policy);

    let error = orchestrator.poll_results("q-1").await.unwrap_err();

    assert_eq!(transport.fetch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(error.status_code(), 500);
    assert!(error.to_string().starts_with("Failed to fetch search results"));
}
