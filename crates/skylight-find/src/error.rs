//! Find error types
//!
//! Internal only: every bridge failure degrades to a "no match" response
//! at the engine boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FindError {
    #[error("Surface bridge failed: {0}")]
    Bridge(#[from] skylight_surface::SurfaceError),

    #[error("Search pattern rejected: {0}")]
    Pattern(String),
}
