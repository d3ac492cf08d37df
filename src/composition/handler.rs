//! Response orchestration for one composed page.
//!
//! # Pipeline
//! ```text
//! no fetch definitions        → 500 "Internal server error"
//! HEAD                        → status + headers of the first result, no body
//! for each result, in order:
//!     ok, 300..=308           → forward status + headers, stop
//!     ok, raw stream          → pass the stream through, stop
//!     ok                      → merge into the composition
//!     failed + required       → definition's error handler, stop
//!     failed + optional       → warn, skip
//! render                      → 200/first status, text/html, Content-Length
//! render failure              → purge cache hashes, 500 with the error text
//! ```
//!
//! # Design Decisions
//! - Classification and rendering are synchronous once results are in
//! - Only allow-listed upstream headers reach the client
//! - The first result decides status and headers, merged or not

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use crate::composition::cache::Cache;
use crate::composition::dedup::{default_strategy, DeduplicationStrategy};
use crate::composition::fragment::MetaData;
use crate::composition::merge::ContentMerge;
use crate::fetch::loader::is_forward;
use crate::fetch::{ContentFetcherFactory, FetchResult, FetchResultSupplier};
use crate::http::request::request_id;
use crate::http::response::copy_forward_headers;
use crate::observability::metrics;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Serves composed pages.
#[derive(Clone)]
pub struct CompositionHandler {
    fetcher_factory: Arc<dyn ContentFetcherFactory>,
    dedup: Arc<dyn DeduplicationStrategy>,
    cache: Option<Arc<dyn Cache>>,
}

impl CompositionHandler {
    pub fn new(fetcher_factory: Arc<dyn ContentFetcherFactory>) -> Self {
        Self {
            fetcher_factory,
            dedup: default_strategy(),
            cache: None,
        }
    }

    /// Purge `cache` whenever a composition fails to render.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_deduplication(mut self, dedup: Arc<dyn DeduplicationStrategy>) -> Self {
        self.dedup = dedup;
        self
    }

    /// Handle an inbound request end to end.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let (parts, _body) = request.into_parts();
        let span = tracing::info_span!(
            "compose",
            request_id = %request_id(&parts.headers),
            method = %parts.method,
            path = %parts.uri.path(),
        );

        let Some(fetcher) = self.fetcher_factory.fetcher_for(&parts) else {
            span.in_scope(|| tracing::warn!("No page matched"));
            return (StatusCode::NOT_FOUND, "No matching page found").into_response();
        };

        self.serve(&parts.method, fetcher).instrument(span).await
    }

    /// Wait for the fetch stage and build the response.
    pub async fn serve(&self, method: &Method, fetcher: Box<dyn FetchResultSupplier>) -> Response {
        if fetcher.is_empty() {
            tracing::error!("No fetchers available for composition, throwing error 500");
            metrics::record_composition("empty");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }

        let meta = fetcher.meta_data();
        let results = fetcher.wait_for_results().await;
        self.compose(method, results, meta)
    }

    /// Classify `results`, merge the composable ones and render.
    pub fn compose(&self, method: &Method, mut results: Vec<FetchResult>, meta: MetaData) -> Response {
        if method == Method::HEAD {
            if let Some(first) = results.first() {
                metrics::record_composition("head");
                return head_response(first);
            }
        }

        let mut merge = ContentMerge::with_strategy(meta, self.dedup.clone());

        for res in results.iter_mut() {
            match &mut res.content {
                Ok(content) => {
                    if let Some(status) = content.status_code().filter(|s| is_forward(*s)) {
                        tracing::debug!(url = %res.def.url, status = %status, "Forwarding upstream redirect");
                        metrics::record_composition("forward");
                        return build_response(status, content.headers(), Body::empty());
                    }

                    if let Some(stream) = content.take_stream() {
                        tracing::debug!(url = %res.def.url, "Streaming upstream response");
                        metrics::record_composition("stream");
                        let status = content.status_code().unwrap_or(StatusCode::OK);
                        return build_response(status, content.headers(), stream);
                    }

                    merge.add_content(&**content, res.def.priority);
                }
                Err(err) if res.def.required => {
                    let status = err.status_code();
                    // the loader already reports 404 and 502
                    if status != Some(StatusCode::NOT_FOUND) && status != Some(StatusCode::BAD_GATEWAY) {
                        tracing::error!(url = %res.def.url, error = %err, "Error loading required content");
                    }
                    metrics::record_composition("required_failure");
                    return res.def.error_handler.handle(err, status);
                }
                Err(err) => {
                    tracing::warn!(url = %res.def.url, error = %err, "Optional content not loaded");
                }
            }
        }

        let (status, mut headers) = match results.first().map(|r| &r.content) {
            Some(Ok(content)) => {
                let mut headers = HeaderMap::new();
                copy_forward_headers(content.headers(), &mut headers);
                (content.status_code().unwrap_or(StatusCode::OK), headers)
            }
            _ => (StatusCode::OK, HeaderMap::new()),
        };
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));

        let hashes = merge.hashes().to_vec();
        let html = match merge.get_html() {
            Ok(html) => html,
            Err(err) => {
                if let Some(cache) = &self.cache {
                    cache.purge_entries(&hashes);
                }
                tracing::error!(error = %err, "Composition failed");
                metrics::record_composition("merge_error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
                    format!("Internal Server Error: {}", err),
                )
                    .into_response();
            }
        };

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(html.len()));
        metrics::record_composition("composed");

        let mut response = Response::new(Body::from(html));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

fn head_response(first: &FetchResult) -> Response {
    match &first.content {
        Ok(content) => build_response(
            content.status_code().unwrap_or(StatusCode::OK),
            content.headers(),
            Body::empty(),
        ),
        Err(err) => {
            let status = err.status_code().unwrap_or(StatusCode::BAD_GATEWAY);
            build_response(status, &HeaderMap::new(), Body::empty())
        }
    }
}

fn build_response(status: StatusCode, upstream: &HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    copy_forward_headers(upstream, response.headers_mut());
    response
}
