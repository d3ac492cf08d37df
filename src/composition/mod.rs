//! Fragment composition subsystem.
//!
//! # Data Flow
//! ```text
//! fetch results (ordered)
//!     → handler.rs (classify: forward / stream / merge / fail)
//!     → merge.rs (aggregate contents, resolve fragment names)
//!     → template.rs (expand §[ var ]§ and §[> fragment ]§ placeholders)
//!     → head.rs (drop duplicate title/meta when a priority is set)
//!     → dedup.rs (collapse collected <link> tags)
//!     → composed HTML document
//!
//! On render failure:
//!     handler.rs → cache.rs (purge every hash that took part)
//! ```
//!
//! # Design Decisions
//! - One `ContentMerge` per request; nothing mutable is shared across requests
//! - Rendering is synchronous and single pass
//! - Unknown variables render empty, unknown fragments fail the render

pub mod cache;
pub mod content;
pub mod dedup;
pub mod fragment;
pub mod handler;
pub mod head;
pub mod merge;
pub mod template;

use thiserror::Error;

pub use cache::{Cache, MemoryCache};
pub use content::{Content, ContentParts, HasContentHash, MemoryContent};
pub use dedup::{DeduplicationKind, DeduplicationStrategy, HrefDeduplication, IdentityDeduplication};
pub use fragment::{Fragment, FragmentRef, MetaData, StringFragment};
pub use handler::CompositionHandler;
pub use merge::ContentMerge;

/// Errors raised while rendering a composition.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// A fragment include named a fragment nobody registered.
    #[error("Fragment does not exist: {name}. Existing fragments: {}", quoted_list(.known))]
    MissingFragment { name: String, known: Vec<String> },

    /// A `§[` placeholder was never closed.
    #[error("Unterminated placeholder at byte {offset}: missing closing \"]§\"")]
    UnterminatedPlaceholder { offset: usize },
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"{}\"", n))
        .collect::<Vec<_>>()
        .join(", ")
}
