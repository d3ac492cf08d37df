//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::composition::DeduplicationKind;

/// Root configuration for the composition gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ComposerConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Page composition settings.
    pub composition: CompositionConfig,

    /// Upstream content cache.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Composed pages, matched against inbound requests.
    pub pages: Vec<PageConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time for one inbound request in seconds.
    pub request_secs: u64,

    /// Default upstream fetch timeout in milliseconds.
    pub fetch_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            fetch_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CompositionConfig {
    /// How duplicate stylesheet links are collapsed.
    pub stylesheet_deduplication: DeduplicationKind,
}

/// Upstream content cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Entry lifetime in seconds.
    pub ttl_secs: u64,

    /// Entry limit; the oldest entry is evicted first.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 60,
            max_entries: 1_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A page assembled from one or more upstream fetches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageConfig {
    /// Page identifier for logging.
    pub name: String,

    /// Host header to match (exact match).
    pub host: Option<String>,

    /// Path prefix to match.
    pub path_prefix: Option<String>,

    /// Page priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,

    /// Upstream fetches, in merge order. The first one decides status and
    /// headers of the composed response.
    #[serde(default)]
    pub fetch: Vec<FetchConfig>,
}

/// One upstream fetch of a page.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Content name; fragments are addressed as `name#local`.
    pub name: Option<String>,

    /// Upstream URL.
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    /// A failed required fetch aborts the page.
    #[serde(default = "default_required")]
    pub required: bool,

    /// Non-zero priority lets this content's head win duplicate meta tags.
    #[serde(default)]
    pub priority: u32,

    /// Overrides `timeouts.fetch_ms`.
    pub timeout_ms: Option<u64>,

    /// Append the inbound path and query to `url`.
    #[serde(default)]
    pub forward_path: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_required() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ComposerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.fetch_ms, 10_000);
        assert!(!config.cache.enabled);
        assert_eq!(config.composition.stylesheet_deduplication, DeduplicationKind::Identity);
        assert!(config.pages.is_empty());
    }

    #[test]
    fn test_page_with_fetches() {
        let config: ComposerConfig = toml::from_str(
            r#"
            [composition]
            stylesheet_deduplication = "href"

            [[pages]]
            name = "shop"
            path_prefix = "/shop"

            [[pages.fetch]]
            name = "layout"
            url = "http://layout.local/page"

            [[pages.fetch]]
            name = "teaser"
            url = "http://teaser.local"
            required = false
            priority = 10
            timeout_ms = 500
            forward_path = true
            "#,
        )
        .unwrap();

        assert_eq!(config.composition.stylesheet_deduplication, DeduplicationKind::Href);
        let page = &config.pages[0];
        assert_eq!(page.name, "shop");
        assert_eq!(page.priority, 0);
        assert_eq!(page.fetch.len(), 2);

        let layout = &page.fetch[0];
        assert_eq!(layout.method, "GET");
        assert!(layout.required);
        assert!(!layout.forward_path);

        let teaser = &page.fetch[1];
        assert!(!teaser.required);
        assert_eq!(teaser.priority, 10);
        assert_eq!(teaser.timeout_ms, Some(500));
        assert!(teaser.forward_path);
    }
}
