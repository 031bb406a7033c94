use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand::Rng;
use rand::distr::Alphanumeric;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::models::{SearchQuery, SearchResponse, SearchResult, TransportError};
use crate::transport::{SearchTransport, TransportResult};

const MOCK_EXECUTION_TIME: f64 = 0.5;
const QUERY_ID_LEN: usize = 7;

/// In-process backend serving a fixed candidate list.
///
/// Every `search` issues a new query id whose response stays available to
/// `get_results` for the lifetime of the transport.
pub struct MockSearchTransport {
    candidates: Vec<SearchResult>,
    issued: Mutex<HashMap<String, SearchResponse>>,
}

impl MockSearchTransport {
    pub fn new() -> Self {
        Self::with_candidates(fixture_candidates())
    }

    pub fn with_candidates(candidates: Vec<SearchResult>) -> Self {
        Self {
            candidates,
            issued: Mutex::new(HashMap::new()),
        }
    }

    pub fn issued_queries(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for MockSearchTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTransport for MockSearchTransport {
    fn search(&self, _query: &SearchQuery) -> TransportResult<SearchResponse> {
        let query_id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(QUERY_ID_LEN)
            .map(|byte| char::from(byte).to_ascii_lowercase())
            .collect();

        let response = SearchResponse {
            query_id: query_id.clone(),
            total_results: self.candidates.len() as u64,
            results: self.candidates.clone(),
            execution_time: MOCK_EXECUTION_TIME,
            created_at: OffsetDateTime::now_utc(),
        };

        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(query_id, response.clone());
        Ok(response)
    }

    fn get_results(&self, query_id: &str) -> TransportResult<SearchResponse> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(query_id)
            .cloned()
            .ok_or_else(|| TransportError::UnknownQuery(query_id.to_string()))
    }
}

pub fn fixture_candidates() -> Vec<SearchResult> {
    vec![
        SearchResult {
            linkedin_id: "1".to_string(),
            name: "John Doe".to_string(),
            title: Some("Senior Software Engineer".to_string()),
            company: Some("Google".to_string()),
            location: Some("Mountain View, CA".to_string()),
            profile_url: "https://linkedin.com/in/johndoe".to_string(),
            relevance_score: 0.95,
            last_updated: datetime!(2024-03-20 10:00:00 UTC),
        },
        SearchResult {
            linkedin_id: "2".to_string(),
            name: "Jane Smith".to_string(),
            title: Some("Full Stack Developer".to_string()),
            company: Some("Microsoft".to_string()),
            location: Some("Seattle, WA".to_string()),
            profile_url: "https://linkedin.com/in/janesmith".to_string(),
            relevance_score: 0.85,
            last_updated: datetime!(2024-03-19 15:30:00 UTC),
        },
        SearchResult {
            linkedin_id: "3".to_string(),
            name: "Alex Johnson".to_string(),
            title: Some("Frontend Developer".to_string()),
            company: Some("Amazon".to_string()),
            location: Some("San Francisco, CA".to_string()),
            profile_url: "https://linkedin.com/in/alexjohnson".to_string(),
            relevance_score: 0.75,
            last_updated: datetime!(2024-03-18 09:15:00 UTC),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_queries_can_be_fetched_again() {
        let transport = MockSearchTransport::new();
        let created = transport.search(&SearchQuery::new()).unwrap();

        assert_eq!(created.query_id.len(), QUERY_ID_LEN);
        assert_eq!(created.total_results, 3);
        assert_eq!(transport.get_results(&created.query_id).unwrap(), created);
        assert_eq!(transport.issued_queries(), 1);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let transport = MockSearchTransport::new();
        assert_eq!(
            transport.get_results("nope"),
            Err(TransportError::UnknownQuery("nope".to_string()))
        );
    }
}
