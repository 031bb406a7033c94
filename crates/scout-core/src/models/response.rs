use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub linkedin_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub profile_url: String,
    /// Backend relevance in `[0, 1]`.
    pub relevance_score: f64,
    #[serde(with = "crate::models::timestamp")]
    pub last_updated: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query_id: String,
    pub total_results: u64,
    pub results: Vec<SearchResult>,
    /// Seconds spent by the backend executing the query.
    pub execution_time: f64,
    #[serde(with = "crate::models::timestamp")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_payload_with_missing_optional_fields() {
        let payload = r#"{
            "query_id": "q-1",
            "total_results": 1,
            "results": [{
                "linkedin_id": "42",
                "name": "Ada Lovelace",
                "company": "Analytical Engines",
                "profile_url": "https://linkedin.com/in/ada",
                "relevance_score": 0.9,
                "last_updated": "2024-03-20T10:00:00Z"
            }],
            "execution_time": 0.25,
            "created_at": "2024-03-20T10:00:01Z"
        }"#;

        let response: SearchResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.query_id, "q-1");
        assert_eq!(response.results[0].title, None);
        assert_eq!(
            response.results[0].company.as_deref(),
            Some("Analytical Engines")
        );
        assert_eq!(response.created_at.unix_timestamp(), 1_710_928_801);
    }

    #[test]
    fn decodes_timestamps_without_an_offset() {
        let payload = r#"{
            "query_id": "q-2",
            "total_results": 1,
            "results": [{
                "linkedin_id": "7",
                "name": "Grace Hopper",
                "profile_url": "https://linkedin.com/in/grace",
                "relevance_score": 0.8,
                "last_updated": "2024-03-20T10:00:00"
            }],
            "execution_time": 0.1,
            "created_at": "2024-03-20T10:00:00.123456"
        }"#;

        let response: SearchResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.created_at.unix_timestamp(), 1_710_928_800);
        assert_eq!(response.results[0].last_updated.unix_timestamp(), 1_710_928_800);

        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["created_at"], "2024-03-20T10:00:00.123456Z");
    }
}
