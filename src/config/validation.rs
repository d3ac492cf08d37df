//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every page has something to fetch
//! - Validate value ranges (timeouts > 0, addresses parse, URLs are http)
//! - Detect duplicate page names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ComposerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::ComposerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: String },

    #[error("duplicate page name: {0}")]
    DuplicatePage(String),

    #[error("page {0} has no fetch definitions")]
    EmptyPage(String),

    #[error("page {page}: invalid url {url}: {reason}")]
    InvalidUrl { page: String, url: String, reason: String },

    #[error("page {page}: invalid method {method}")]
    InvalidMethod { page: String, method: String },
}

/// Check `config`, reporting every problem found.
pub fn validate_config(config: &ComposerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    for (field, value) in [
        ("listener.max_connections", config.listener.max_connections as u64),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.fetch_ms", config.timeouts.fetch_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroValue { field: field.to_string() });
        }
    }
    if config.cache.enabled && config.cache.ttl_secs == 0 {
        errors.push(ValidationError::ZeroValue {
            field: "cache.ttl_secs".to_string(),
        });
    }

    let mut names = HashSet::new();
    for page in &config.pages {
        if !names.insert(page.name.as_str()) {
            errors.push(ValidationError::DuplicatePage(page.name.clone()));
        }
        if page.fetch.is_empty() {
            errors.push(ValidationError::EmptyPage(page.name.clone()));
        }

        for fetch in &page.fetch {
            if let Err(reason) = check_url(&fetch.url) {
                errors.push(ValidationError::InvalidUrl {
                    page: page.name.clone(),
                    url: fetch.url.clone(),
                    reason,
                });
            }
            if Method::from_bytes(fetch.method.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidMethod {
                    page: page.name.clone(),
                    method: fetch.method.clone(),
                });
            }
            if fetch.timeout_ms == Some(0) {
                errors.push(ValidationError::ZeroValue {
                    field: format!("pages.{}.fetch.timeout_ms", page.name),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(raw: &str) -> Result<(), String> {
    let url = url::Url::parse(raw).map_err(|e| e.to_string())?;
    // the loader speaks plain http only
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {}", url.scheme()));
    }
    Ok(())
}
