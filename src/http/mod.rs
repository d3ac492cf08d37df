//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, request ID)
//!     → pages.rs (match page, build fetch definitions)
//!     → request.rs (render metadata, forwarded request headers)
//!     → composition handler
//!     → response.rs (allow-listed upstream headers)
//!     → Send to client
//! ```

pub mod pages;
pub mod request;
pub mod response;
pub mod server;

pub use pages::PageFetcherFactory;
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
