//! Skylight Rendering Surface
//!
//! The abstraction wrapping the platform's webview primitive. A
//! `RenderSurface` is an embedded, independently addressable rendering
//! surface: the browsing-context pool owns them, the navigation policy
//! decides what they may load, and the find engine reads their document
//! through the bridge methods. `HeadlessSurface` is a deterministic
//! in-memory implementation used by tests and by embedders that have no
//! platform webview.

mod error;
mod headless;
mod surface;
mod types;

pub use error::SurfaceError;
pub use headless::{HeadlessFactory, HeadlessSurface};
pub use surface::{EventListener, FrameCallback, RenderSurface, SurfaceFactory};
pub use types::{ContainerKind, NodeId, OverlayId, Rect, SubscriptionId, SurfaceEvent, TextNode};

pub type Result<T> = std::result::Result<T, SurfaceError>;
