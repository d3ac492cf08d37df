//! Configured pages as the fetch stage of the composition handler.
//!
//! # Responsibilities
//! - Match the inbound request against the current page router
//! - Turn the page's fetch entries into `FetchDefinition`s
//! - Swap in a new page router on config reload

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method};

use crate::composition::MemoryCache;
use crate::config::{ComposerConfig, FetchConfig, PageConfig};
use crate::fetch::{ContentFetcher, ContentFetcherFactory, FetchDefinition, FetchResultSupplier, HttpContentLoader};
use crate::http::request::{forward_request_headers, meta_data_for_request};
use crate::routing::PageRouter;

/// `ContentFetcherFactory` backed by the page configuration.
pub struct PageFetcherFactory {
    router: ArcSwap<PageRouter>,
    loader: HttpContentLoader,
    cache: Option<MemoryCache>,
    fetch_timeout: Duration,
}

impl PageFetcherFactory {
    pub fn new(config: &ComposerConfig, loader: HttpContentLoader, cache: Option<MemoryCache>) -> Self {
        Self {
            router: ArcSwap::from_pointee(PageRouter::from_config(config.pages.clone())),
            loader,
            cache,
            fetch_timeout: Duration::from_millis(config.timeouts.fetch_ms),
        }
    }

    /// Replace the served pages. In-flight requests keep the old set.
    pub fn reload(&self, pages: Vec<PageConfig>) {
        let router = PageRouter::from_config(pages);
        tracing::info!(pages = router.len(), "Page configuration reloaded");
        self.router.store(Arc::new(router));
    }

    fn definition(&self, fetch: &FetchConfig, req: &Parts, headers: &HeaderMap) -> FetchDefinition {
        let url = if fetch.forward_path {
            forwarded_url(&fetch.url, req)
        } else {
            fetch.url.clone()
        };
        // methods are checked by config validation
        let method = Method::from_bytes(fetch.method.as_bytes()).unwrap_or(Method::GET);
        let timeout = fetch.timeout_ms.map(Duration::from_millis).unwrap_or(self.fetch_timeout);

        let mut def = FetchDefinition::new(url)
            .with_method(method)
            .with_headers(headers.clone())
            .with_timeout(timeout)
            .with_priority(fetch.priority);
        if let Some(name) = &fetch.name {
            def = def.with_name(name.clone());
        }
        if !fetch.required {
            def = def.optional();
        }
        def
    }
}

impl ContentFetcherFactory for PageFetcherFactory {
    fn fetcher_for(&self, req: &Parts) -> Option<Box<dyn FetchResultSupplier>> {
        let router = self.router.load();
        let page = router.match_request(req)?;
        tracing::debug!(page = %page.name, fetches = page.fetch.len(), "Page matched");

        let headers = forward_request_headers(&req.headers);
        let definitions = page
            .fetch
            .iter()
            .map(|fetch| self.definition(fetch, req, &headers))
            .collect();

        let fetcher = ContentFetcher::new(self.loader.clone(), definitions, meta_data_for_request(req))
            .with_cache(self.cache.clone());
        Some(Box::new(fetcher))
    }
}

/// `base` with the inbound path and query appended.
fn forwarded_url(base: &str, req: &Parts) -> String {
    let path_and_query = req.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{}{}", base.trim_end_matches('/'), path_and_query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageConfig;
    use axum::http::{header, Request};

    fn fetch(name: &str, url: &str) -> FetchConfig {
        FetchConfig {
            name: Some(name.to_string()),
            url: url.to_string(),
            method: "GET".to_string(),
            required: true,
            priority: 0,
            timeout_ms: None,
            forward_path: false,
        }
    }

    fn config(pages: Vec<PageConfig>) -> ComposerConfig {
        let mut config = ComposerConfig::default();
        config.timeouts.fetch_ms = 250;
        config.pages = pages;
        config
    }

    fn shop() -> PageConfig {
        let mut teaser = fetch("teaser", "http://teaser.local/");
        teaser.required = false;
        teaser.priority = 5;
        teaser.timeout_ms = Some(40);
        teaser.forward_path = true;

        PageConfig {
            name: "shop".to_string(),
            host: None,
            path_prefix: Some("/shop".to_string()),
            priority: 0,
            fetch: vec![fetch("layout", "http://layout.local/page"), teaser],
        }
    }

    fn request(uri: &str) -> Parts {
        Request::builder()
            .uri(uri)
            .header(header::HOST, "gateway.local")
            .header(header::COOKIE, "s=1")
            .header(header::CONNECTION, "close")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_definitions_from_page() {
        let factory = PageFetcherFactory::new(&config(vec![shop()]), HttpContentLoader::new(), None);
        let req = request("/shop/cart?id=7");
        let page = shop();
        let (layout, teaser) = (&page.fetch[0], &page.fetch[1]);
        let headers = forward_request_headers(&req.headers);

        let def = factory.definition(layout, &req, &headers);
        assert_eq!(def.url, "http://layout.local/page");
        assert_eq!(def.content_name(), "layout");
        assert!(def.required);
        assert_eq!(def.timeout, Duration::from_millis(250));
        assert_eq!(def.headers[header::COOKIE], "s=1");
        assert!(def.headers.get(header::CONNECTION).is_none());

        let def = factory.definition(teaser, &req, &headers);
        assert_eq!(def.url, "http://teaser.local/shop/cart?id=7");
        assert!(!def.required);
        assert_eq!(def.priority, 5);
        assert_eq!(def.timeout, Duration::from_millis(40));
    }

    #[test]
    fn test_fetcher_for_matched_page_only() {
        let factory = PageFetcherFactory::new(&config(vec![shop()]), HttpContentLoader::new(), None);

        let fetcher = factory.fetcher_for(&request("/shop")).unwrap();
        assert!(!fetcher.is_empty());
        assert_eq!(fetcher.meta_data()["host"], "gateway.local");

        assert!(factory.fetcher_for(&request("/blog")).is_none());
    }

    #[test]
    fn test_reload_swaps_pages() {
        let factory = PageFetcherFactory::new(&config(vec![]), HttpContentLoader::new(), None);
        assert!(factory.fetcher_for(&request("/shop")).is_none());

        factory.reload(vec![shop()]);
        assert!(factory.fetcher_for(&request("/shop")).is_some());
    }
}
