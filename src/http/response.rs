//! Upstream response headers passed to the client.
//!
//! Only allow-listed headers survive; hop-by-hop and upstream-internal
//! headers never reach the client.

use axum::http::{header, HeaderMap, HeaderName};

/// Upstream response headers copied onto the client response.
pub static FORWARD_RESPONSE_HEADERS: [HeaderName; 16] = [
    header::AGE,
    header::ALLOW,
    header::CACHE_CONTROL,
    header::CONTENT_DISPOSITION,
    header::CONTENT_SECURITY_POLICY,
    header::CONTENT_TYPE,
    header::DATE,
    header::ETAG,
    header::EXPIRES,
    header::LAST_MODIFIED,
    header::LINK,
    header::LOCATION,
    header::PRAGMA,
    header::SET_COOKIE,
    header::VARY,
    header::WWW_AUTHENTICATE,
];

/// Copy every allow-listed header of `from` into `to`, keeping repeated values.
pub fn copy_forward_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for name in FORWARD_RESPONSE_HEADERS.iter() {
        let mut values = from.get_all(name).iter();
        if let Some(first) = values.next() {
            to.insert(name.clone(), first.clone());
            for value in values {
                to.append(name.clone(), value.clone());
            }
        }
    }
}
