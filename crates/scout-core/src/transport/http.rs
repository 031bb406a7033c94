use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::BackendConfig;
use crate::models::{SearchQuery, SearchResponse, TransportError};
use crate::transport::{SearchTransport, TransportResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

pub struct HttpSearchTransport {
    agent: ureq::Agent,
    base_url: String,
    api_prefix: String,
    token: RwLock<Option<String>>,
}

impl HttpSearchTransport {
    pub fn new(
        base_url: impl Into<String>,
        api_prefix: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("scout/", env!("CARGO_PKG_VERSION")))
            .build();
        let base_url: String = base_url.into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_prefix: api_prefix.into(),
            token: RwLock::new(None),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        let transport = Self::new(
            config.base_url.as_str(),
            config.api_prefix.as_str(),
            config.timeout(),
        );
        transport.set_token(config.token.clone());
        transport
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Raw profile document for a search result.
    pub fn get_profile(&self, profile_id: &str) -> TransportResult<serde_json::Value> {
        let segment = path_segment(profile_id)?;
        let url = self.endpoint(&format!("/search/profiles/{segment}"));
        let request = self.authorized(self.agent.get(&url))?;
        decode(request.call().map_err(map_ureq_error)?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }

    fn authorized(&self, request: ureq::Request) -> TransportResult<ureq::Request> {
        let token = self.token().ok_or(TransportError::MissingToken)?;
        Ok(request.set("Authorization", &format!("Bearer {token}")))
    }
}

impl SearchTransport for HttpSearchTransport {
    fn search(&self, query: &SearchQuery) -> TransportResult<SearchResponse> {
        let request = self.authorized(self.agent.post(&self.endpoint("/search")))?;
        let response = request
            .set("Content-Type", "application/json")
            .send_json(query)
            .map_err(map_ureq_error)?;
        decode(response)
    }

    fn get_results(&self, query_id: &str) -> TransportResult<SearchResponse> {
        let segment = path_segment(query_id)?;
        let url = self.endpoint(&format!("/search/{segment}"));
        let request = self.authorized(self.agent.get(&url))?;
        decode(request.call().map_err(map_ureq_error)?)
    }
}

fn path_segment(id: &str) -> TransportResult<&str> {
    let trimmed = id.trim();
    if trimmed.is_empty() || trimmed.contains(['/', '?', '#']) {
        return Err(TransportError::UnknownQuery(id.to_string()));
    }
    Ok(trimmed)
}

fn decode<T: DeserializeOwned>(response: ureq::Response) -> TransportResult<T> {
    response
        .into_json()
        .map_err(|error| TransportError::Decode(error.to_string()))
}

fn map_ureq_error(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Status(status, response) => {
            let status_text = response.status_text().to_string();
            let body = response
                .into_string()
                .ok()
                .filter(|body| !body.trim().is_empty());
            TransportError::Http {
                status,
                status_text,
                body,
            }
        }
        ureq::Error::Transport(transport) => TransportError::Network(transport.to_string()),
    }
}
