//! Server-side UI fragment composition gateway.
//!
//! Every inbound request is matched to a configured page. The page's
//! upstream documents are fetched concurrently, split into head, body
//! attributes and a default body fragment (stylesheets and external scripts
//! lifted out as assets), and merged into one HTML document by expanding
//! `§[> fragment ]§` includes from the `layout` content's default fragment.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing (page) ──▶ fetch (concurrent loads)
//!                                                              │
//!                                                              ▼
//!     Client Response                                  composition::handler
//!     ◀────────────── redirect / stream / error / composed HTML ◀┘
//!
//!     Cross-cutting: config (+ hot reload), observability, lifecycle
//! ```

// Core subsystems
pub mod composition;
pub mod fetch;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use composition::{CompositionHandler, ContentMerge};
pub use config::schema::ComposerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
