//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (page lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched PageConfig or no match
//!
//! Page Compilation (at startup and on reload):
//!     PageConfig[]
//!     → Sort by priority
//!     → Compile matchers
//!     → Freeze as immutable PageRouter
//! ```
//!
//! # Design Decisions
//! - Pages compiled once, swapped whole on reload
//! - No regex in hot path (prefix matching only)
//! - First match wins (ordered by priority)

pub mod matcher;
pub mod router;

pub use router::PageRouter;
