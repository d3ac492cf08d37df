//! Outcome of loading one fetch definition.

use axum::http::StatusCode;
use thiserror::Error;

use crate::composition::content::Content;
use crate::fetch::FetchDefinition;

/// Errors raised while loading upstream content.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The upstream answered with an error status.
    #[error("http {status} from {url}")]
    Status { url: String, status: StatusCode },

    /// Connection or protocol failure.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// The definition could not be turned into a request.
    #[error("invalid request for {url}: {message}")]
    InvalidRequest { url: String, message: String },

    /// The response body could not be read.
    #[error("reading body of {url} failed: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// Upstream status behind this error, if the upstream answered at all.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A fetch definition paired with what loading it produced.
pub struct FetchResult {
    pub def: FetchDefinition,
    pub content: Result<Box<dyn Content>, FetchError>,
}

impl FetchResult {
    pub fn new(def: FetchDefinition, content: Result<Box<dyn Content>, FetchError>) -> Self {
        Self { def, content }
    }

    pub fn is_ok(&self) -> bool {
        self.content.is_ok()
    }

    /// Status code to report for this result.
    pub fn status_code(&self) -> Option<StatusCode> {
        match &self.content {
            Ok(content) => content.status_code(),
            Err(err) => err.status_code(),
        }
    }
}

impl std::fmt::Debug for FetchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResult")
            .field("url", &self.def.url)
            .field("required", &self.def.required)
            .field("ok", &self.content.is_ok())
            .field("status", &self.status_code())
            .finish()
    }
}
