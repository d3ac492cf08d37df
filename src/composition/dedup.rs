//! Stylesheet deduplication strategies.
//!
//! The engine collects every `<link>` tag of the fragments it renders and
//! hands the full list to a strategy before writing the head. The strategy
//! is injected per engine; [`default_strategy`] is the identity.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::composition::fragment::LinkTag;

/// Policy collapsing duplicate `<link>` tags.
pub trait DeduplicationStrategy: Send + Sync + fmt::Debug {
    /// Return the tags to write, in order.
    fn deduplicate(&self, link_tags: Vec<LinkTag>) -> Vec<LinkTag>;
}

/// Keeps every tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDeduplication;

impl DeduplicationStrategy for IdentityDeduplication {
    fn deduplicate(&self, link_tags: Vec<LinkTag>) -> Vec<LinkTag> {
        link_tags
    }
}

/// Keeps the first tag for every `href`. Tags without `href` are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct HrefDeduplication;

impl DeduplicationStrategy for HrefDeduplication {
    fn deduplicate(&self, link_tags: Vec<LinkTag>) -> Vec<LinkTag> {
        let mut seen = HashSet::new();
        link_tags
            .into_iter()
            .filter(|attrs| match attrs.iter().find(|a| a.key.eq_ignore_ascii_case("href")) {
                Some(href) => seen.insert(href.value.clone()),
                None => true,
            })
            .collect()
    }
}

/// Strategy selector as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeduplicationKind {
    #[default]
    Identity,
    Href,
}

impl DeduplicationKind {
    pub fn strategy(self) -> Arc<dyn DeduplicationStrategy> {
        match self {
            DeduplicationKind::Identity => Arc::new(IdentityDeduplication),
            DeduplicationKind::Href => Arc::new(HrefDeduplication),
        }
    }
}

/// Strategy used when none is configured.
pub fn default_strategy() -> Arc<dyn DeduplicationStrategy> {
    DeduplicationKind::default().strategy()
}
