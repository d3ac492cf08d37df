//! Concurrent loading of every fetch definition of a page.
//!
//! # Responsibilities
//! - Load all definitions in parallel, each under its own timeout
//! - Return results in definition order
//! - Serve and fill the content cache for cacheable fetches

use axum::http::request::Parts;
use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;

use crate::composition::cache::MemoryCache;
use crate::composition::content::Content;
use crate::composition::fragment::MetaData;
use crate::fetch::loader::HttpContentLoader;
use crate::fetch::{FetchDefinition, FetchError, FetchResult};

/// The fetch stage of one inbound request.
pub trait FetchResultSupplier: Send {
    /// True if there is nothing to fetch.
    fn is_empty(&self) -> bool;

    /// Request metadata handed to every fragment render.
    fn meta_data(&self) -> MetaData;

    /// Wait for every fetch and return the results in definition order.
    fn wait_for_results(self: Box<Self>) -> BoxFuture<'static, Vec<FetchResult>>;
}

/// Builds the fetch stage for an inbound request.
pub trait ContentFetcherFactory: Send + Sync {
    /// `None` if no page is configured for the request.
    fn fetcher_for(&self, request: &Parts) -> Option<Box<dyn FetchResultSupplier>>;
}

/// `FetchResultSupplier` loading over HTTP.
pub struct ContentFetcher {
    loader: HttpContentLoader,
    cache: Option<MemoryCache>,
    definitions: Vec<FetchDefinition>,
    meta: MetaData,
}

impl ContentFetcher {
    pub fn new(loader: HttpContentLoader, definitions: Vec<FetchDefinition>, meta: MetaData) -> Self {
        Self {
            loader,
            cache: None,
            definitions,
            meta,
        }
    }

    pub fn with_cache(mut self, cache: Option<MemoryCache>) -> Self {
        self.cache = cache;
        self
    }
}

impl FetchResultSupplier for ContentFetcher {
    fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn meta_data(&self) -> MetaData {
        self.meta.clone()
    }

    fn wait_for_results(self: Box<Self>) -> BoxFuture<'static, Vec<FetchResult>> {
        let ContentFetcher {
            loader,
            cache,
            definitions,
            ..
        } = *self;

        async move {
            let handles: Vec<_> = definitions
                .into_iter()
                .map(|def| {
                    let loader = loader.clone();
                    let cache = cache.clone();
                    let task_def = def.clone();
                    let handle = tokio::spawn(async move {
                        let content = fetch_one(&loader, cache.as_ref(), &task_def).await;
                        FetchResult::new(task_def, content)
                    });
                    (def, handle)
                })
                .collect();

            let (defs, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
            join_all(handles)
                .await
                .into_iter()
                .zip(defs)
                .map(|(joined, def)| match joined {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(url = %def.url, error = %e, "Fetch task failed");
                        let err = FetchError::Transport {
                            url: def.url.clone(),
                            message: e.to_string(),
                        };
                        FetchResult::new(def, Err(err))
                    }
                })
                .collect()
        }
        .boxed()
    }
}

async fn fetch_one(
    loader: &HttpContentLoader,
    cache: Option<&MemoryCache>,
    def: &FetchDefinition,
) -> Result<Box<dyn Content>, FetchError> {
    let cache = cache.filter(|_| def.is_cacheable());
    let hash = def.hash();

    if let Some(mut cached) = cache.and_then(|c| c.get(&hash)) {
        tracing::debug!(url = %def.url, "Serving content from cache");
        cached.set_name(def.content_name());
        return Ok(Box::new(cached));
    }

    let content = loader.load(def).await?;
    if let Some(cache) = cache {
        if !content.is_stream() && content.status_code().map_or(true, |s| s.is_success()) {
            cache.set(hash, &content);
        }
    }
    Ok(Box::new(content))
}

/// Supplier over results that are already known. Used where the fetch
/// stage runs elsewhere, and in tests.
pub struct StaticSupplier {
    results: Vec<FetchResult>,
    meta: MetaData,
}

impl StaticSupplier {
    pub fn new(results: Vec<FetchResult>, meta: MetaData) -> Self {
        Self { results, meta }
    }
}

impl FetchResultSupplier for StaticSupplier {
    fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn meta_data(&self) -> MetaData {
        self.meta.clone()
    }

    fn wait_for_results(self: Box<Self>) -> BoxFuture<'static, Vec<FetchResult>> {
        let StaticSupplier { results, .. } = *self;
        futures_util::future::ready(results).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_results_keep_definition_order() {
        let defs = vec![
            FetchDefinition::new("http://127.0.0.1:1/first").optional(),
            FetchDefinition::new("not a url"),
            FetchDefinition::new("http://127.0.0.1:1/third"),
        ];
        let fetcher: Box<dyn FetchResultSupplier> =
            Box::new(ContentFetcher::new(HttpContentLoader::new(), defs, MetaData::new()));
        assert!(!fetcher.is_empty());

        let results = fetcher.wait_for_results().await;
        let urls: Vec<_> = results.iter().map(|r| r.def.url.as_str()).collect();
        assert_eq!(urls, vec!["http://127.0.0.1:1/first", "not a url", "http://127.0.0.1:1/third"]);
        assert!(results.iter().all(|r| !r.is_ok()));
    }

    #[tokio::test]
    async fn test_cached_content_is_served_without_fetching() {
        let cache = MemoryCache::new(std::time::Duration::from_secs(60), 10);
        let def = FetchDefinition::new("http://127.0.0.1:1/cached").with_name("cached");
        cache.set(
            def.hash(),
            &crate::composition::MemoryContent::new("old-name").with_hash(def.hash()),
        );

        let fetcher = Box::new(
            ContentFetcher::new(HttpContentLoader::new(), vec![def], MetaData::new())
                .with_cache(Some(cache)),
        );
        let results = fetcher.wait_for_results().await;
        let content = results[0].content.as_ref().unwrap();
        assert_eq!(content.name(), "cached");
    }

    #[tokio::test]
    async fn test_static_supplier() {
        let supplier: Box<dyn FetchResultSupplier> = Box::new(StaticSupplier::new(vec![], MetaData::new()));
        assert!(supplier.is_empty());
        assert!(supplier.wait_for_results().await.is_empty());
    }
}
