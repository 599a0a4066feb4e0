//! Surface error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Surface bridge failed: {0}")]
    Bridge(String),

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),
}
