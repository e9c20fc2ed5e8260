use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::{PostRequest, PostResponse, Transport, TransportError};

const USER_AGENT: &str = concat!("quote-loadgen/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP transport. Redirects are not followed so the raw status
/// and `Location` header reach validation untouched.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .build()
            .map_err(|err| Error::HttpClient(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    fn post(&self, request: &PostRequest) -> std::result::Result<PostResponse, TransportError> {
        let mut builder = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let started = Instant::now();
        let response = builder
            .send()
            .map_err(|err| classify_error(err, request))?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .map_err(|err| classify_error(err, request))?;
        let duration = started.elapsed();

        debug!(
            url = %request.url,
            status,
            duration_ms = duration.as_millis() as u64,
            "POST completed"
        );

        Ok(PostResponse {
            status,
            headers,
            body,
            duration,
        })
    }
}

fn classify_error(err: reqwest::Error, request: &PostRequest) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(request.timeout)
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
