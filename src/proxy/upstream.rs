//! HTTP client for the upstream inference server.
//!
//! No overall request timeout is set: generations can run for minutes. The
//! connect timeout bounds dead hosts and the optional read timeout bounds a
//! stalled connection (it resets after every successful read, so a slow but
//! live stream is never cut short).
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};

use crate::errors::AppError;
use crate::models::llm::Payload;

#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(connect_timeout: Duration, read_timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(32)
            .connect_timeout(connect_timeout);

        if let Some(timeout) = read_timeout {
            builder = builder.read_timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// POST a JSON payload. Only transport failures are errors here; the
    /// caller decides what a non-2xx status means.
    pub async fn post_json(&self, url: &str, payload: &Payload) -> Result<reqwest::Response, AppError> {
        self.client
            .post(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(url, e))
    }

    pub async fn get(&self, url: &str) -> Result<reqwest::Response, AppError> {
        self.client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| transport_error(url, e))
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> AppError {
    tracing::error!(url, "upstream request failed: {}", e);
    AppError::ForwardingFailed(e.to_string())
}

/// Content type to relay for a passthrough body, defaulting to JSON.
pub fn content_type_of(resp: &reqwest::Response) -> HeaderValue {
    resp.headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"))
}
