//! Skylight Core
//!
//! Central coordination layer: the `Shell` wires the engine catalog, the
//! browsing-context pool, the navigation policy effects, the find engine
//! and the download manager behind one host-facing API.

mod config;
mod error;
mod shell;

pub use config::Config;
pub use error::ShellError;
pub use shell::Shell;

// Re-export core components
pub use skylight_contexts::{
    BrowsingContext, ContextEventListener, ContextKey, ContextPool, ContextState, PoolError,
    ZoomController, SESSIONS_PER_ENGINE, ZOOM_DEFAULT, ZOOM_MAX, ZOOM_MIN, ZOOM_STEP,
};
pub use skylight_download::{Download, DownloadError, DownloadManager, DownloadState};
pub use skylight_engines::{default_engines, Engine, EngineError, EngineStore};
pub use skylight_find::{Debouncer, FindEngine, FindError, FindRequest, FindResponse};
pub use skylight_navigation::{
    Disposition, EnginePolicy, LinkClassifier, NavigationKind, NavigationPolicy,
    NavigationRequest, NavigationResponse, PlatformOpener, RecordingOpener, SystemOpener,
};
pub use skylight_storage::{Database, StorageError};
pub use skylight_surface::{
    HeadlessFactory, HeadlessSurface, RenderSurface, SurfaceError, SurfaceEvent, SurfaceFactory,
};

pub type Result<T> = std::result::Result<T, ShellError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
