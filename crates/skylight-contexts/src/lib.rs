//! Skylight Browsing Context Pool
//!
//! Owns every rendering surface, addressed by (engine origin, session
//! index). Contexts are created lazily on first activation, at most one is
//! visible across the whole pool, and engine removal tears down all ten of
//! an engine's sessions.

mod context;
mod error;
mod pool;
mod state;
mod zoom;

pub use context::{BrowsingContext, ContextKey};
pub use error::PoolError;
pub use pool::{ContextEventListener, ContextPool, SESSIONS_PER_ENGINE};
pub use state::ContextState;
pub use zoom::{ZoomController, ZOOM_DEFAULT, ZOOM_MAX, ZOOM_MIN, ZOOM_STEP};

pub type Result<T> = std::result::Result<T, PoolError>;
