//! Fetch definitions and their failure handlers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::fetch::FetchError;

/// Default upstream timeout when a definition does not set one.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Renders the response for a failed required fetch.
pub trait ErrorHandler: Send + Sync + fmt::Debug {
    fn handle(&self, err: &FetchError, status: Option<StatusCode>) -> Response;
}

/// Proxies upstream error statuses; everything else becomes 502.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, err: &FetchError, status: Option<StatusCode>) -> Response {
        let status = status
            .filter(|s| s.as_u16() >= 400)
            .unwrap_or(StatusCode::BAD_GATEWAY);
        (status, format!("Error: {}", err)).into_response()
    }
}

/// One upstream resource to load for a page.
#[derive(Debug, Clone)]
pub struct FetchDefinition {
    /// Origin name of the loaded content; defaults to the URL.
    pub name: Option<String>,
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub timeout: Duration,
    /// A failed required fetch aborts the whole composition.
    pub required: bool,
    /// Any value above zero enables head deduplication.
    pub priority: u32,
    pub error_handler: Arc<dyn ErrorHandler>,
}

impl FetchDefinition {
    /// Required GET definition with default timeout and error handling.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: None,
            url: url.into(),
            method: Method::GET,
            headers: HeaderMap::new(),
            timeout: DEFAULT_FETCH_TIMEOUT,
            required: true,
            priority: 0,
            error_handler: Arc::new(DefaultErrorHandler),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    /// Origin name given to the content this definition loads.
    pub fn content_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    /// Cache key of this fetch.
    pub fn hash(&self) -> String {
        format!("{} {}", self.method, self.url)
    }

    /// Only side-effect free fetches may be served from cache.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let def = FetchDefinition::new("http://example.com/page");
        assert!(def.required);
        assert_eq!(def.priority, 0);
        assert_eq!(def.content_name(), "http://example.com/page");
        assert_eq!(def.hash(), "GET http://example.com/page");
        assert!(def.is_cacheable());

        let def = def.optional().with_name("layout").with_priority(2);
        assert!(!def.required);
        assert_eq!(def.content_name(), "layout");
        assert_eq!(def.priority, 2);
    }

    #[test]
    fn test_default_error_handler_status() {
        let err = FetchError::Status {
            url: "http://up".into(),
            status: StatusCode::NOT_FOUND,
        };
        let res = DefaultErrorHandler.handle(&err, err.status_code());
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let err = FetchError::Timeout {
            url: "http://up".into(),
            timeout_ms: 100,
        };
        let res = DefaultErrorHandler.handle(&err, err.status_code());
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

        let res = DefaultErrorHandler.handle(&err, Some(StatusCode::OK));
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }
}
