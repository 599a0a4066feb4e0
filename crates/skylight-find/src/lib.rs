//! Skylight Find Engine
//!
//! Single-flight incremental search over the visible text of one browsing
//! context. Match ranges are logical (node plus offset span); each range
//! owns one highlight overlay per layout rectangle it currently occupies.
//! Document mutation, scroll and resize trigger a frame-debounced relayout
//! of existing highlights, never a re-search.

mod debounce;
mod engine;
mod error;
mod messages;

pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use engine::FindEngine;
pub use error::FindError;
pub use messages::{FindRequest, FindResponse};

pub type Result<T> = std::result::Result<T, FindError>;
