//! Structured representation of one fetched upstream resource.

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};

use crate::composition::fragment::FragmentRef;

/// Capability to report the cache key a content was loaded under.
pub trait HasContentHash {
    /// Hash of the fetch that produced this content, if it is cacheable.
    fn content_hash(&self) -> Option<&str>;
}

/// A parsed upstream response.
///
/// Either carries fragments (composable) or a raw body stream
/// (passed through untouched), never both.
pub trait Content: HasContentHash + Send {
    /// Origin name used to build fully-qualified fragment names.
    fn name(&self) -> &str;

    fn head(&self) -> Option<&FragmentRef>;

    fn body_attributes(&self) -> Option<&FragmentRef>;

    /// Body fragments by local name; the empty name is the default fragment.
    fn body(&self) -> &HashMap<String, FragmentRef>;

    fn tail(&self) -> Option<&FragmentRef>;

    /// Upstream status code; `None` if the upstream did not set one.
    fn status_code(&self) -> Option<StatusCode>;

    fn headers(&self) -> &HeaderMap;

    /// Whether this content is a non-composable stream.
    fn is_stream(&self) -> bool;

    /// Take ownership of the raw body stream, if there is one.
    fn take_stream(&mut self) -> Option<Body>;
}

/// The fragment side of a content: everything but the stream.
///
/// Cheap to clone and shareable between threads, which makes it the unit
/// the cache stores.
#[derive(Debug, Clone, Default)]
pub struct ContentParts {
    name: String,
    head: Option<FragmentRef>,
    body_attributes: Option<FragmentRef>,
    body: HashMap<String, FragmentRef>,
    tail: Option<FragmentRef>,
    status: Option<StatusCode>,
    headers: HeaderMap,
    hash: Option<String>,
}

/// In-memory `Content` built by the loader or by tests.
#[derive(Debug, Default)]
pub struct MemoryContent {
    parts: ContentParts,
    stream: Option<Body>,
}

impl MemoryContent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            parts: ContentParts {
                name: name.into(),
                ..ContentParts::default()
            },
            stream: None,
        }
    }

    pub fn with_head(mut self, f: FragmentRef) -> Self {
        self.parts.head = Some(f);
        self
    }

    pub fn with_body_attributes(mut self, f: FragmentRef) -> Self {
        self.parts.body_attributes = Some(f);
        self
    }

    pub fn with_body(mut self, local_name: impl Into<String>, f: FragmentRef) -> Self {
        self.parts.body.insert(local_name.into(), f);
        self
    }

    pub fn with_tail(mut self, f: FragmentRef) -> Self {
        self.parts.tail = Some(f);
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.parts.status = Some(status);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.parts.headers = headers;
        self
    }

    pub fn with_stream(mut self, stream: Body) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.parts.hash = Some(hash.into());
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.parts.name = name.into();
    }

    /// Copy of the fragment side. `None` for streams, which cannot be replayed.
    pub fn snapshot(&self) -> Option<ContentParts> {
        if self.stream.is_some() {
            return None;
        }
        Some(self.parts.clone())
    }
}

impl From<ContentParts> for MemoryContent {
    fn from(parts: ContentParts) -> Self {
        Self { parts, stream: None }
    }
}

impl HasContentHash for MemoryContent {
    fn content_hash(&self) -> Option<&str> {
        self.parts.hash.as_deref()
    }
}

impl Content for MemoryContent {
    fn name(&self) -> &str {
        &self.parts.name
    }

    fn head(&self) -> Option<&FragmentRef> {
        self.parts.head.as_ref()
    }

    fn body_attributes(&self) -> Option<&FragmentRef> {
        self.parts.body_attributes.as_ref()
    }

    fn body(&self) -> &HashMap<String, FragmentRef> {
        &self.parts.body
    }

    fn tail(&self) -> Option<&FragmentRef> {
        self.parts.tail.as_ref()
    }

    fn status_code(&self) -> Option<StatusCode> {
        self.parts.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    fn is_stream(&self) -> bool {
        self.stream.is_some()
    }

    fn take_stream(&mut self) -> Option<Body> {
        self.stream.take()
    }
}
