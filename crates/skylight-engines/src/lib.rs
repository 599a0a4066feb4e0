//! Skylight Engine Catalog
//!
//! An engine is a configured web destination (origin, display name, focus
//! selector, friend-domain rules, action scripts). The store persists the
//! ordered catalog and seeds a built-in default set on first run.

mod defaults;
mod engine;
mod error;
mod store;

pub use defaults::{
    default_engines, ACTION_HISTORY, ACTION_NEW_SESSION, ACTION_SHARE, ACTION_TEMPORARY_SESSION,
};
pub use engine::Engine;
pub use error::EngineError;
pub use store::EngineStore;

pub type Result<T> = std::result::Result<T, EngineError>;
