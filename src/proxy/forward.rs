//! Forwarding engine: relays an authenticated payload to the upstream
//! inference server under one of two disciplines.
//!
//! * Buffered: one POST, the full body is read and decoded by
//!   [`aggregate::decode_buffered`], then returned as a single JSON answer.
//! * Streamed: one long-lived POST whose body is relayed chunk by chunk
//!   through [`stream_bridge::relay`] without parsing.
//!
//! In both modes a non-2xx upstream status is reported as
//! [`AppError::Upstream`] before anything is sent to the client. Only a
//! failure in the middle of a streamed body escapes this (see the stream
//! bridge docs).

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::llm::Payload;
use crate::proxy::upstream::{self, UpstreamClient};
use crate::proxy::{aggregate, stream_bridge};

/// Result of a successful forward, ready to become the client response.
pub enum Forwarded {
    Buffered { status: StatusCode, body: Value },
    Streamed { status: StatusCode, body: Body },
    Passthrough {
        status: StatusCode,
        content_type: HeaderValue,
        body: bytes::Bytes,
    },
}

impl IntoResponse for Forwarded {
    fn into_response(self) -> Response {
        match self {
            Forwarded::Buffered { status, body } => (status, Json(body)).into_response(),
            Forwarded::Streamed { status, body } => (
                status,
                [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                body,
            )
                .into_response(),
            Forwarded::Passthrough {
                status,
                content_type,
                body,
            } => (status, [(header::CONTENT_TYPE, content_type)], body).into_response(),
        }
    }
}

#[derive(Clone)]
pub struct ForwardingEngine {
    client: UpstreamClient,
    base_url: String,
    stream_buffer: usize,
}

impl ForwardingEngine {
    pub fn new(client: UpstreamClient, base_url: impl Into<String>, stream_buffer: usize) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            stream_buffer: stream_buffer.max(1),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// POST `payload` to `endpoint` (e.g. `/api/generate`).
    #[tracing::instrument(skip(self, payload), fields(url = %self.url(endpoint)))]
    pub async fn forward(
        &self,
        endpoint: &str,
        payload: &Payload,
        stream: bool,
    ) -> Result<Forwarded, AppError> {
        let url = self.url(endpoint);
        tracing::debug!(stream, "forwarding request");

        let resp = self.client.post_json(&url, payload).await?;
        let (status, resp) = ensure_success(resp).await?;

        if stream {
            Ok(Forwarded::Streamed {
                status,
                body: stream_bridge::relay(resp, self.stream_buffer),
            })
        } else {
            let bytes = resp.bytes().await.map_err(|e| {
                tracing::error!("failed reading upstream body: {}", e);
                AppError::ForwardingFailed(e.to_string())
            })?;
            let body = aggregate::decode_buffered(&bytes)?;
            tracing::debug!(status = status.as_u16(), "buffered response from upstream");
            Ok(Forwarded::Buffered { status, body })
        }
    }

    /// GET `endpoint` and relay the body and content type untouched.
    #[tracing::instrument(skip(self), fields(url = %self.url(endpoint)))]
    pub async fn forward_get(&self, endpoint: &str) -> Result<Forwarded, AppError> {
        let url = self.url(endpoint);
        let resp = self.client.get(&url).await?;
        let (status, resp) = ensure_success(resp).await?;

        let content_type = upstream::content_type_of(&resp);
        let body = resp
            .bytes()
            .await
            .map_err(|e| AppError::ForwardingFailed(e.to_string()))?;

        Ok(Forwarded::Passthrough {
            status,
            content_type,
            body,
        })
    }
}

/// Turn a non-2xx upstream answer into [`AppError::Upstream`] carrying the
/// upstream's status and body.
async fn ensure_success(
    resp: reqwest::Response,
) -> Result<(StatusCode, reqwest::Response), AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok((status, resp));
    }

    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(status = status.as_u16(), "failed reading upstream error body: {}", e);
            format!("upstream returned {} with an unreadable body: {}", status, e)
        }
    };
    tracing::error!(status = status.as_u16(), body = %body, "error response from upstream");
    Err(AppError::Upstream { status, body })
}
