//! Fetch stage: loads the upstream contents of a page.
//!
//! # Data Flow
//! ```text
//! PageConfig (matched by the router)
//!     → definition.rs (one FetchDefinition per upstream)
//!     → fetcher.rs (spawn every load, keep definition order)
//!     → loader.rs (HTTP request, classify response)
//!     → document.rs (split HTML into head / body attributes / body)
//!     → result.rs (FetchResult handed to the composition handler)
//! ```

pub mod definition;
pub mod document;
pub mod fetcher;
pub mod loader;
pub mod result;

pub use definition::{DefaultErrorHandler, ErrorHandler, FetchDefinition};
pub use fetcher::{ContentFetcher, ContentFetcherFactory, FetchResultSupplier, StaticSupplier};
pub use loader::HttpContentLoader;
pub use result::{FetchError, FetchResult};
