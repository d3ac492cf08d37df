//! HTTP loading of upstream contents.
//!
//! # Responsibilities
//! - Send the request described by a `FetchDefinition`
//! - Classify the upstream response (redirect, error, stream, composable)
//! - Turn composable HTML into a `MemoryContent`
//!
//! # Design Decisions
//! - Redirects are never followed; they are handed to the client as-is
//! - Non-HTML bodies, or responses marked `X-No-Composition`, are streamed
//! - Every request carries its own deadline

use std::time::Instant;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::composition::content::{Content, MemoryContent};
use crate::fetch::document::split_document;
use crate::fetch::{FetchDefinition, FetchError};
use crate::observability::metrics;

/// Response header an upstream sets to opt out of composition.
pub const NO_COMPOSITION_HEADER: &str = "x-no-composition";

/// Largest composable body the loader buffers.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Loads fetch definitions over HTTP.
#[derive(Clone)]
pub struct HttpContentLoader {
    client: Client<HttpConnector, Body>,
}

impl Default for HttpContentLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpContentLoader {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }

    /// Load one definition.
    pub async fn load(&self, def: &FetchDefinition) -> Result<MemoryContent, FetchError> {
        let start = Instant::now();
        let result = self.load_inner(def).await;

        let status = match &result {
            Ok(content) => content_status_label(content),
            Err(FetchError::Status { status, .. }) => status.as_u16().to_string(),
            Err(FetchError::Timeout { .. }) => "timeout".to_string(),
            Err(_) => "error".to_string(),
        };
        metrics::record_fetch(&status, start);
        result
    }

    async fn load_inner(&self, def: &FetchDefinition) -> Result<MemoryContent, FetchError> {
        let mut builder = Request::builder().method(def.method.clone()).uri(&def.url);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(def.headers.clone());
        }
        let request = builder
            .body(Body::empty())
            .map_err(|e| FetchError::InvalidRequest {
                url: def.url.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(url = %def.url, method = %def.method, "Fetching content");

        let response = match tokio::time::timeout(def.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(FetchError::Transport {
                    url: def.url.clone(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: def.url.clone(),
                    timeout_ms: def.timeout.as_millis() as u64,
                })
            }
        };

        let (parts, incoming) = response.into_parts();
        let name = def.content_name();
        let with_transport = |content: MemoryContent| {
            content
                .with_status(parts.status)
                .with_headers(parts.headers.clone())
                .with_hash(def.hash())
        };

        if is_forward(parts.status) {
            return Ok(with_transport(MemoryContent::new(name)));
        }

        if parts.status.as_u16() >= 400 {
            if parts.status == StatusCode::NOT_FOUND || parts.status == StatusCode::BAD_GATEWAY {
                tracing::warn!(url = %def.url, status = %parts.status, "Upstream returned error status");
            }
            return Err(FetchError::Status {
                url: def.url.clone(),
                status: parts.status,
            });
        }

        let body = Body::new(incoming);
        if !is_composable(&parts.headers) {
            return Ok(with_transport(MemoryContent::new(name)).with_stream(body));
        }

        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| FetchError::Body {
                url: def.url.clone(),
                message: e.to_string(),
            })?;
        let markup = String::from_utf8_lossy(&bytes);

        Ok(with_transport(split_document(name, &markup)))
    }
}

/// Statuses handed to the client as redirects.
pub fn is_forward(status: StatusCode) -> bool {
    (300..=308).contains(&status.as_u16())
}

fn is_composable(headers: &axum::http::HeaderMap) -> bool {
    if headers.contains_key(NO_COMPOSITION_HEADER) {
        return false;
    }
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/html"))
        .unwrap_or(false)
}

fn content_status_label(content: &MemoryContent) -> String {
    content
        .status_code()
        .map(|s| s.as_u16().to_string())
        .unwrap_or_else(|| "none".to_string())
}
