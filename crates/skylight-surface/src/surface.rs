//! The `RenderSurface` trait
//!
//! One trait object per browsing context. Chrome-level operations
//! (load/visibility/zoom/focus) are consumed by the pool; the document
//! bridge, overlay primitives and frame clock are consumed by the find
//! engine. Every document-reading call is a round trip into the rendering
//! surface and may fail; callers degrade instead of propagating.

use std::sync::Arc;
use url::Url;

use crate::types::{NodeId, OverlayId, Rect, SubscriptionId, SurfaceEvent, TextNode};
use crate::Result;

pub type EventListener = Arc<dyn Fn(&SurfaceEvent) + Send + Sync>;
pub type FrameCallback = Box<dyn FnOnce() + Send>;

pub trait RenderSurface: Send + Sync {
    // === Lifecycle ===

    /// Begin loading `url` in the main frame
    fn load(&self, url: &Url);

    /// Reload the current document
    fn reload(&self);

    /// URL of the current document, if any navigation ever committed
    fn current_url(&self) -> Option<Url>;

    fn is_loading(&self) -> bool;

    /// Monotonic counter bumped on every committed navigation. Per-document
    /// state keyed by this value disappears naturally when the document
    /// goes away.
    fn document_generation(&self) -> u64;

    // === Presentation ===

    fn set_hidden(&self, hidden: bool);

    fn is_hidden(&self) -> bool;

    fn set_page_zoom(&self, level: f64);

    fn page_zoom(&self) -> f64;

    /// Focus the first element matching `selector`; empty selectors are a
    /// no-op.
    fn focus_element(&self, selector: &str);

    /// Evaluate a script in the page
    fn evaluate(&self, script: &str) -> Result<()>;

    // === Events ===

    fn subscribe(&self, listener: EventListener) -> SubscriptionId;

    fn unsubscribe(&self, subscription: SubscriptionId);

    // === Document bridge ===

    /// Snapshot of the document's text nodes in document order
    fn text_nodes(&self) -> Result<Vec<TextNode>>;

    /// Whether `node` is still attached to the document
    fn node_alive(&self, node: NodeId) -> bool;

    /// Layout rectangles currently occupied by `node[start..end]`. A span
    /// that wraps across lines yields one rectangle per line; a detached
    /// node yields none.
    fn client_rects(&self, node: NodeId, start: usize, end: usize) -> Vec<Rect>;

    /// Scroll the element containing `node` into nearest view
    fn scroll_into_view(&self, node: NodeId);

    // === Highlight overlays ===

    fn insert_highlight(&self, rect: Rect) -> OverlayId;

    fn move_highlight(&self, overlay: OverlayId, rect: Rect);

    fn set_highlight_hidden(&self, overlay: OverlayId, hidden: bool);

    fn set_highlight_active(&self, overlay: OverlayId, active: bool);

    fn remove_highlight(&self, overlay: OverlayId);

    fn install_highlight_style(&self);

    fn remove_highlight_style(&self);

    // === Frame clock ===

    /// Run `callback` on the next animation frame
    fn request_frame(&self, callback: FrameCallback);
}

/// Creates rendering surfaces for the pool
pub trait SurfaceFactory: Send + Sync {
    fn create_surface(&self) -> Arc<dyn RenderSurface>;
}
