//! In-memory rendering surface
//!
//! A deterministic `RenderSurface` for tests and for embedders without a
//! platform webview. The document is a flat list of text nodes laid out on
//! a fixed character grid (8x16 cells, one paragraph per node) that wraps
//! at the viewport width, so layout rectangles for any span are exact and
//! reproducible. Mutation, scroll, resize, crash and navigation events are
//! driven explicitly by the caller.

use parking_lot::Mutex;
use scraper::{Html, Node, Selector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

use crate::surface::{EventListener, FrameCallback, RenderSurface, SurfaceFactory};
use crate::types::{ContainerKind, NodeId, OverlayId, Rect, SubscriptionId, SurfaceEvent, TextNode};
use crate::{Result, SurfaceError};

const CHAR_WIDTH: f64 = 8.0;
const LINE_HEIGHT: f64 = 16.0;
const DEFAULT_VIEWPORT_COLS: usize = 80;

#[derive(Debug, Clone)]
struct DocNode {
    id: NodeId,
    text: String,
    container: ContainerKind,
    alive: bool,
}

#[derive(Debug, Clone, Copy)]
struct Overlay {
    rect: Rect,
    hidden: bool,
    active: bool,
}

struct SurfaceState {
    current_url: Option<Url>,
    pending_url: Option<Url>,
    loading: bool,
    generation: u64,
    hidden: bool,
    zoom: f64,
    nodes: Vec<DocNode>,
    overlays: HashMap<OverlayId, Overlay>,
    style_installed: bool,
    frame_queue: Vec<FrameCallback>,
    evaluated_scripts: Vec<String>,
    focused_selectors: Vec<String>,
    scrolled_to: Option<NodeId>,
    viewport_cols: usize,
    bridge_broken: bool,
    auto_finish_loads: bool,
    reload_count: u32,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            current_url: None,
            pending_url: None,
            loading: false,
            generation: 0,
            hidden: true,
            zoom: 1.0,
            nodes: Vec::new(),
            overlays: HashMap::new(),
            style_installed: false,
            frame_queue: Vec::new(),
            evaluated_scripts: Vec::new(),
            focused_selectors: Vec::new(),
            scrolled_to: None,
            viewport_cols: DEFAULT_VIEWPORT_COLS,
            bridge_broken: false,
            auto_finish_loads: true,
            reload_count: 0,
        }
    }
}

pub struct HeadlessSurface {
    state: Mutex<SurfaceState>,
    listeners: Mutex<HashMap<SubscriptionId, EventListener>>,
    next_id: AtomicU64,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SurfaceState::default()),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn emit(&self, event: SurfaceEvent) {
        let listeners: Vec<EventListener> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(&event);
        }
    }

    /// When disabled, `load`/`reload` stay in the loading state until
    /// `finish_navigation` is called explicitly.
    pub fn set_auto_finish_loads(&self, auto: bool) {
        self.state.lock().auto_finish_loads = auto;
    }

    /// Commit the pending navigation: the old document (nodes, overlays,
    /// style) disappears and the generation counter advances.
    pub fn finish_navigation(&self) {
        let url = {
            let mut state = self.state.lock();
            let url = match state.pending_url.take() {
                Some(url) => url,
                None => return,
            };
            state.current_url = Some(url.clone());
            state.loading = false;
            state.generation += 1;
            state.nodes.clear();
            state.overlays.clear();
            state.style_installed = false;
            state.scrolled_to = None;
            url
        };
        tracing::debug!(url = %url, "Headless navigation committed");
        self.emit(SurfaceEvent::LoadingChanged(false));
        self.emit(SurfaceEvent::NavigationFinished { url });
    }

    /// Replace the document with one content text node per line. Used to
    /// stage fixture documents; does not count as a mutation.
    pub fn set_document_text(&self, lines: &[&str]) {
        let mut state = self.state.lock();
        state.nodes = lines
            .iter()
            .map(|line| DocNode {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                text: (*line).to_string(),
                container: ContainerKind::Content,
                alive: true,
            })
            .collect();
    }

    /// Replace the document by parsing `html`, extracting text nodes the
    /// way a tree walk over the live DOM would: one node per text run,
    /// tagged with its containing element kind, whitespace-only runs kept
    /// out by the find engine's filter rather than here.
    pub fn load_html(&self, html: &str) {
        let document = Html::parse_document(html);

        let mut nodes = Vec::new();
        for node in document.tree.nodes() {
            if let Node::Text(text) = node.value() {
                let content = text.text.to_string();
                if content.trim().is_empty() {
                    continue;
                }
                let container = node
                    .ancestors()
                    .find_map(|ancestor| match ancestor.value() {
                        Node::Element(element) => Some(match element.name() {
                            "script" => ContainerKind::Script,
                            "style" => ContainerKind::Style,
                            "noscript" => ContainerKind::NoScript,
                            _ => ContainerKind::Content,
                        }),
                        _ => None,
                    })
                    .unwrap_or(ContainerKind::Content);

                nodes.push(DocNode {
                    id: self.alloc_id(),
                    text: content,
                    container,
                    alive: true,
                });
            }
        }

        let title = Selector::parse("title")
            .ok()
            .and_then(|selector| {
                document
                    .select(&selector)
                    .next()
                    .map(|el| el.text().collect::<String>())
            })
            .filter(|t| !t.is_empty());

        self.state.lock().nodes = nodes;

        if let Some(title) = title {
            self.emit(SurfaceEvent::TitleChanged(title));
        }
    }

    /// Append a content text node, as a page script would
    pub fn append_text_node(&self, text: &str) -> NodeId {
        let id = self.alloc_id();
        self.state.lock().nodes.push(DocNode {
            id,
            text: text.to_string(),
            container: ContainerKind::Content,
            alive: true,
        });
        self.emit(SurfaceEvent::Mutated {
            highlights_only: false,
        });
        id
    }

    pub fn update_node_text(&self, node: NodeId, text: &str) {
        {
            let mut state = self.state.lock();
            if let Some(n) = state.nodes.iter_mut().find(|n| n.id == node) {
                n.text = text.to_string();
            }
        }
        self.emit(SurfaceEvent::Mutated {
            highlights_only: false,
        });
    }

    pub fn remove_node(&self, node: NodeId) {
        {
            let mut state = self.state.lock();
            if let Some(n) = state.nodes.iter_mut().find(|n| n.id == node) {
                n.alive = false;
            }
        }
        self.emit(SurfaceEvent::Mutated {
            highlights_only: false,
        });
    }

    /// A mutation batch that touched nothing but highlight elements
    pub fn emit_highlight_mutation(&self) {
        self.emit(SurfaceEvent::Mutated {
            highlights_only: true,
        });
    }

    pub fn emit_scrolled(&self) {
        self.emit(SurfaceEvent::Scrolled);
    }

    pub fn set_viewport_cols(&self, cols: usize) {
        self.state.lock().viewport_cols = cols.max(1);
        self.emit(SurfaceEvent::Resized);
    }

    /// Simulate the content process dying
    pub fn terminate_content_process(&self) {
        tracing::debug!("Headless content process terminated");
        self.emit(SurfaceEvent::ProcessTerminated);
    }

    /// Make every subsequent bridge round trip fail
    pub fn break_bridge(&self, broken: bool) {
        self.state.lock().bridge_broken = broken;
    }

    /// Run all callbacks scheduled for the next animation frame
    pub fn tick_frame(&self) {
        let callbacks: Vec<FrameCallback> = {
            let mut state = self.state.lock();
            std::mem::take(&mut state.frame_queue)
        };
        for callback in callbacks {
            callback();
        }
    }

    pub fn pending_frame_count(&self) -> usize {
        self.state.lock().frame_queue.len()
    }

    // === Introspection for tests and diagnostics ===

    pub fn highlight_count(&self) -> usize {
        self.state.lock().overlays.len()
    }

    pub fn visible_highlight_count(&self) -> usize {
        self.state
            .lock()
            .overlays
            .values()
            .filter(|o| !o.hidden)
            .count()
    }

    pub fn active_highlight_rects(&self) -> Vec<Rect> {
        self.state
            .lock()
            .overlays
            .values()
            .filter(|o| o.active && !o.hidden)
            .map(|o| o.rect)
            .collect()
    }

    pub fn highlight_rects(&self) -> Vec<Rect> {
        self.state
            .lock()
            .overlays
            .values()
            .filter(|o| !o.hidden)
            .map(|o| o.rect)
            .collect()
    }

    pub fn style_installed(&self) -> bool {
        self.state.lock().style_installed
    }

    pub fn reload_count(&self) -> u32 {
        self.state.lock().reload_count
    }

    pub fn evaluated_scripts(&self) -> Vec<String> {
        self.state.lock().evaluated_scripts.clone()
    }

    pub fn focused_selectors(&self) -> Vec<String> {
        self.state.lock().focused_selectors.clone()
    }

    pub fn scrolled_to(&self) -> Option<NodeId> {
        self.state.lock().scrolled_to
    }

    fn layout_rects(state: &SurfaceState, node: NodeId, start: usize, end: usize) -> Vec<Rect> {
        let cols = state.viewport_cols.max(1);
        let mut first_line = 0usize;

        for n in &state.nodes {
            if n.id == node {
                if !n.alive || start >= end || end > n.text.len() {
                    return Vec::new();
                }
                let mut rects = Vec::new();
                let span_first = start / cols;
                let span_last = (end - 1) / cols;
                for line in span_first..=span_last {
                    let line_start = line * cols;
                    let line_end = line_start + cols;
                    let s = start.max(line_start);
                    let e = end.min(line_end);
                    rects.push(Rect::new(
                        (s - line_start) as f64 * CHAR_WIDTH,
                        (first_line + line) as f64 * LINE_HEIGHT,
                        (e - s) as f64 * CHAR_WIDTH,
                        LINE_HEIGHT,
                    ));
                }
                return rects;
            }
            if n.alive {
                first_line += n.text.len().max(1).div_ceil(cols);
            }
        }

        Vec::new()
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for HeadlessSurface {
    fn load(&self, url: &Url) {
        {
            let mut state = self.state.lock();
            state.pending_url = Some(url.clone());
            state.loading = true;
        }
        self.emit(SurfaceEvent::LoadingChanged(true));
        if self.state.lock().auto_finish_loads {
            self.finish_navigation();
        }
    }

    fn reload(&self) {
        {
            let mut state = self.state.lock();
            let current = match state.current_url.clone() {
                Some(url) => url,
                None => return,
            };
            state.reload_count += 1;
            state.pending_url = Some(current);
            state.loading = true;
        }
        self.emit(SurfaceEvent::LoadingChanged(true));
        if self.state.lock().auto_finish_loads {
            self.finish_navigation();
        }
    }

    fn current_url(&self) -> Option<Url> {
        self.state.lock().current_url.clone()
    }

    fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    fn document_generation(&self) -> u64 {
        self.state.lock().generation
    }

    fn set_hidden(&self, hidden: bool) {
        self.state.lock().hidden = hidden;
    }

    fn is_hidden(&self) -> bool {
        self.state.lock().hidden
    }

    fn set_page_zoom(&self, level: f64) {
        self.state.lock().zoom = level;
    }

    fn page_zoom(&self) -> f64 {
        self.state.lock().zoom
    }

    fn focus_element(&self, selector: &str) {
        if selector.is_empty() {
            return;
        }
        self.state.lock().focused_selectors.push(selector.to_string());
    }

    fn evaluate(&self, script: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.bridge_broken {
            return Err(SurfaceError::Evaluation(
                "content process unreachable".to_string(),
            ));
        }
        state.evaluated_scripts.push(script.to_string());
        Ok(())
    }

    fn subscribe(&self, listener: EventListener) -> SubscriptionId {
        let id = self.alloc_id();
        self.listeners.lock().insert(id, listener);
        id
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.listeners.lock().remove(&subscription);
    }

    fn text_nodes(&self) -> Result<Vec<TextNode>> {
        let state = self.state.lock();
        if state.bridge_broken {
            return Err(SurfaceError::Bridge("document bridge unavailable".to_string()));
        }
        Ok(state
            .nodes
            .iter()
            .filter(|n| n.alive)
            .map(|n| TextNode {
                id: n.id,
                text: n.text.clone(),
                container: n.container,
            })
            .collect())
    }

    fn node_alive(&self, node: NodeId) -> bool {
        self.state
            .lock()
            .nodes
            .iter()
            .any(|n| n.id == node && n.alive)
    }

    fn client_rects(&self, node: NodeId, start: usize, end: usize) -> Vec<Rect> {
        let state = self.state.lock();
        Self::layout_rects(&state, node, start, end)
    }

    fn scroll_into_view(&self, node: NodeId) {
        self.state.lock().scrolled_to = Some(node);
    }

    fn insert_highlight(&self, rect: Rect) -> OverlayId {
        let id = self.alloc_id();
        self.state.lock().overlays.insert(
            id,
            Overlay {
                rect,
                hidden: false,
                active: false,
            },
        );
        self.emit(SurfaceEvent::Mutated {
            highlights_only: true,
        });
        id
    }

    fn move_highlight(&self, overlay: OverlayId, rect: Rect) {
        if let Some(o) = self.state.lock().overlays.get_mut(&overlay) {
            o.rect = rect;
            o.hidden = false;
        }
    }

    fn set_highlight_hidden(&self, overlay: OverlayId, hidden: bool) {
        if let Some(o) = self.state.lock().overlays.get_mut(&overlay) {
            o.hidden = hidden;
        }
    }

    fn set_highlight_active(&self, overlay: OverlayId, active: bool) {
        if let Some(o) = self.state.lock().overlays.get_mut(&overlay) {
            o.active = active;
        }
    }

    fn remove_highlight(&self, overlay: OverlayId) {
        self.state.lock().overlays.remove(&overlay);
        self.emit(SurfaceEvent::Mutated {
            highlights_only: true,
        });
    }

    fn install_highlight_style(&self) {
        self.state.lock().style_installed = true;
        self.emit(SurfaceEvent::Mutated {
            highlights_only: true,
        });
    }

    fn remove_highlight_style(&self) {
        self.state.lock().style_installed = false;
        self.emit(SurfaceEvent::Mutated {
            highlights_only: true,
        });
    }

    fn request_frame(&self, callback: FrameCallback) {
        self.state.lock().frame_queue.push(callback);
    }
}

/// Factory handing out headless surfaces; keeps a handle to every surface
/// it created so tests can drive them afterwards.
pub struct HeadlessFactory {
    auto_finish_loads: bool,
    created: Mutex<Vec<Arc<HeadlessSurface>>>,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self {
            auto_finish_loads: true,
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn manual() -> Self {
        Self {
            auto_finish_loads: false,
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn created(&self) -> Vec<Arc<HeadlessSurface>> {
        self.created.lock().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }
}

impl Default for HeadlessFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceFactory for HeadlessFactory {
    fn create_surface(&self) -> Arc<dyn RenderSurface> {
        let surface = Arc::new(HeadlessSurface::new());
        surface.set_auto_finish_loads(self.auto_finish_loads);
        self.created.lock().push(Arc::clone(&surface));
        surface
    }
}
