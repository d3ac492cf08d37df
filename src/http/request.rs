//! Inbound request inspection.
//!
//! # Responsibilities
//! - Derive the render metadata (`host`, `base_url`, `params`) of a request
//! - Select the request headers passed on to upstream fetches
//! - Expose the request id set by the middleware stack
//!
//! # Design Decisions
//! - Forwarded headers take their first comma-separated value
//! - Query parameters always map to arrays, in request order

use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName};
use serde_json::Value;

use crate::composition::MetaData;

/// Request id header set on every inbound request.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request headers copied onto upstream fetches.
pub static FORWARD_REQUEST_HEADERS: [HeaderName; 9] = [
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
    header::COOKIE,
    header::REFERER,
    header::USER_AGENT,
    HeaderName::from_static("x-forwarded-for"),
    HeaderName::from_static("x-forwarded-host"),
    HeaderName::from_static("x-forwarded-proto"),
    HeaderName::from_static(X_REQUEST_ID),
];

/// The request id, or `unknown` outside the middleware stack.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Metadata every fragment of the page renders against.
pub fn meta_data_for_request(req: &Parts) -> MetaData {
    let host = host_from_request(req);
    let proto = first_value(&req.headers, "x-forwarded-proto").unwrap_or("http");

    let mut meta = MetaData::new();
    meta.insert("base_url".to_string(), Value::String(format!("{proto}://{host}")));
    meta.insert("host".to_string(), Value::String(host));
    meta.insert("params".to_string(), Value::Object(query_params(req.uri.query())));
    meta
}

/// Copy the allow-listed request headers.
pub fn forward_request_headers(from: &HeaderMap) -> HeaderMap {
    let mut to = HeaderMap::new();
    for name in FORWARD_REQUEST_HEADERS.iter() {
        for value in from.get_all(name) {
            to.append(name.clone(), value.clone());
        }
    }
    to
}

fn host_from_request(req: &Parts) -> String {
    first_value(&req.headers, "x-forwarded-for")
        .or_else(|| req.headers.get(header::HOST).and_then(|v| v.to_str().ok()))
        .or_else(|| req.uri.authority().map(|a| a.as_str()))
        .unwrap_or_default()
        .to_string()
}

fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn query_params(query: Option<&str>) -> serde_json::Map<String, Value> {
    let mut params = serde_json::Map::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        let entry = params
            .entry(key.into_owned())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(values) = entry {
            values.push(Value::String(value.into_owned()));
        }
    }
    params
}
