mod http;
mod offline;

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

pub use http::HttpTransport;
pub use offline::OfflineTarget;

pub const CONTENT_TYPE: &str = "content-type";
pub const LOCATION: &str = "location";
pub const IDEMPOTENCY_KEY: &str = "Idempotency-Key";
pub const CORRELATION_ID: &str = "X-Correlation-Id";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Issues one POST and reports what came back. Implementations must be safe
/// to share across virtual-user threads.
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;
    fn post(&self, request: &PostRequest) -> Result<PostResponse, TransportError>;
}

#[derive(Clone, Debug)]
pub struct PostRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub timeout: Duration,
}

impl PostRequest {
    pub fn json(url: &str, idempotency_key: &str, correlation_id: &str, body: String) -> Self {
        Self {
            url: url.to_string(),
            headers: vec![
                ("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()),
                (IDEMPOTENCY_KEY.to_string(), idempotency_key.to_string()),
                (CORRELATION_ID.to_string(), correlation_id.to_string()),
            ],
            body,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct PostResponse {
    pub status: u16,
    /// Header names are stored lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub duration: Duration,
}

impl PostResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Lower-cased `Content-Type`, empty when absent.
    pub fn content_type(&self) -> String {
        self.header(CONTENT_TYPE)
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// Best-effort JSON body; `None` when the body does not parse.
    pub fn json(&self) -> Option<JsonValue> {
        serde_json::from_str(&self.body).ok()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}
