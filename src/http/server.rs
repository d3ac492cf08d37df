//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the composition handler as catch-all
//! - Wire up middleware (request ID, tracing, concurrency limit, timeout)
//! - Build the page fetch stage, content cache and dedup strategy from config
//! - Serve until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::composition::{CompositionHandler, MemoryCache};
use crate::config::ComposerConfig;
use crate::fetch::HttpContentLoader;
use crate::http::pages::PageFetcherFactory;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: CompositionHandler,
}

/// HTTP server for the composition gateway.
pub struct HttpServer {
    router: Router,
    config: ComposerConfig,
    pages: Arc<PageFetcherFactory>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ComposerConfig) -> Self {
        let cache = config.cache.enabled.then(|| {
            MemoryCache::new(Duration::from_secs(config.cache.ttl_secs), config.cache.max_entries)
        });
        let pages = Arc::new(PageFetcherFactory::new(&config, HttpContentLoader::new(), cache.clone()));

        let mut handler = CompositionHandler::new(pages.clone())
            .with_deduplication(config.composition.stylesheet_deduplication.strategy());
        if let Some(cache) = cache {
            handler = handler.with_cache(Arc::new(cache));
        }

        let router = Self::build_router(&config, AppState { handler });
        Self { router, config, pages }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ComposerConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(compose_handler))
            .route("/", any(compose_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            pages = self.config.pages.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The page set, for reloading.
    pub fn pages(&self) -> Arc<PageFetcherFactory> {
        self.pages.clone()
    }
}

async fn compose_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.handler.handle(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unmatched_request_gets_request_id() {
        let server = HttpServer::new(ComposerConfig::default());
        let response = server
            .router
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_kept() {
        let server = HttpServer::new(ComposerConfig::default());
        let response = server
            .router
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "upstream-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "upstream-id");
    }
}
