//! Page lookup.
//!
//! # Responsibilities
//! - Store compiled pages
//! - Look up the page for a request
//! - Return the matched page or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in priority order (acceptable for typical page counts)
//! - Ties keep configuration order

use axum::http::request::Parts;

use crate::config::PageConfig;
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};

#[derive(Debug)]
struct CompiledPage {
    matcher: AndMatcher,
    page: PageConfig,
}

/// Maps inbound requests to configured pages.
#[derive(Debug, Default)]
pub struct PageRouter {
    pages: Vec<CompiledPage>,
}

impl PageRouter {
    /// Compile `pages`, highest priority first.
    pub fn from_config(mut pages: Vec<PageConfig>) -> Self {
        // stable sort keeps configuration order for equal priorities
        pages.sort_by(|a, b| b.priority.cmp(&a.priority));

        let pages = pages
            .into_iter()
            .map(|page| {
                let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
                if let Some(host) = &page.host {
                    matchers.push(Box::new(HostMatcher::new(host.clone())));
                }
                if let Some(prefix) = &page.path_prefix {
                    matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
                }
                CompiledPage {
                    matcher: AndMatcher::new(matchers),
                    page,
                }
            })
            .collect();

        Self { pages }
    }

    /// First page whose conditions all match.
    pub fn match_request(&self, req: &Parts) -> Option<&PageConfig> {
        self.pages
            .iter()
            .find(|compiled| compiled.matcher.matches(req))
            .map(|compiled| &compiled.page)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn page(name: &str, host: Option<&str>, prefix: Option<&str>, priority: u32) -> PageConfig {
        PageConfig {
            name: name.to_string(),
            host: host.map(str::to_string),
            path_prefix: prefix.map(str::to_string),
            priority,
            fetch: vec![],
        }
    }

    fn request(host: &str, path: &str) -> Parts {
        Request::builder()
            .uri(path)
            .header("Host", host)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_priority_ordering() {
        let router = PageRouter::from_config(vec![
            page("catch-all", None, None, 0),
            page("shop", None, Some("/shop"), 10),
            page("shop-de", Some("shop.de"), Some("/shop"), 20),
        ]);
        assert_eq!(router.len(), 3);

        let name = |host, path| router.match_request(&request(host, path)).map(|p| p.name.as_str());
        assert_eq!(name("shop.de", "/shop/cart"), Some("shop-de"));
        assert_eq!(name("shop.com", "/shop/cart"), Some("shop"));
        assert_eq!(name("shop.com", "/blog"), Some("catch-all"));
    }

    #[test]
    fn test_equal_priority_keeps_config_order() {
        let router = PageRouter::from_config(vec![
            page("first", None, Some("/a"), 5),
            page("second", None, Some("/"), 5),
        ]);
        assert_eq!(router.match_request(&request("x", "/a")).unwrap().name, "first");
        assert_eq!(router.match_request(&request("x", "/b")).unwrap().name, "second");
    }

    #[test]
    fn test_no_match() {
        let router = PageRouter::from_config(vec![page("shop", None, Some("/shop"), 0)]);
        assert!(router.match_request(&request("x", "/blog")).is_none());
        assert!(PageRouter::default().is_empty());
    }
}
