//! Shared surface types

use url::Url;

/// Identifier of a text node within the current document
pub type NodeId = u64;

/// Identifier of a highlight overlay element
pub type OverlayId = u64;

/// Handle returned by `RenderSurface::subscribe`
pub type SubscriptionId = u64;

/// A layout rectangle in page coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Element kind containing a text node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Content,
    Script,
    Style,
    NoScript,
}

impl ContainerKind {
    /// Whether text inside this container participates in in-page search
    pub fn is_searchable(&self) -> bool {
        matches!(self, ContainerKind::Content)
    }
}

/// A text node snapshot taken through the surface bridge
#[derive(Debug, Clone)]
pub struct TextNode {
    pub id: NodeId,
    pub text: String,
    pub container: ContainerKind,
}

/// Events emitted by a rendering surface
#[derive(Debug, Clone)]
pub enum SurfaceEvent {
    /// The current main-frame navigation completed
    NavigationFinished { url: Url },
    /// Document title changed
    TitleChanged(String),
    /// Loading state toggled
    LoadingChanged(bool),
    /// The content process died; the owner is expected to reload
    ProcessTerminated,
    /// The document mutated. `highlights_only` is true when every touched
    /// node belongs to the find engine's own overlay/style elements.
    Mutated { highlights_only: bool },
    /// The page scrolled
    Scrolled,
    /// The viewport was resized
    Resized,
}
