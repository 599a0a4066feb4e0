//! Find engine
//!
//! Per-context search state addressed by context identity plus document
//! generation, so it disappears naturally at a navigation boundary. An
//! unchanged query advances the active ordinal without re-searching;
//! anything else rebuilds ranges from a fresh text-node walk.

use parking_lot::Mutex;
use regex::RegexBuilder;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use skylight_surface::{NodeId, OverlayId, RenderSurface, SubscriptionId, SurfaceEvent};

use crate::error::FindError;
use crate::messages::{FindRequest, FindResponse};
use crate::Result;

/// One logical match: a node plus offset span, with one overlay per layout
/// rectangle the span currently occupies
struct MatchRange {
    node: NodeId,
    start: usize,
    end: usize,
    overlays: Vec<OverlayId>,
}

struct SearchState {
    surface: Arc<dyn RenderSurface>,
    query: String,
    generation: u64,
    ranges: Vec<MatchRange>,
    /// 1-based ordinal of the active match; 0 means none
    current: usize,
    style_installed: bool,
    subscription: Option<SubscriptionId>,
    relayout_scheduled: Arc<AtomicBool>,
}

impl SearchState {
    fn new(surface: Arc<dyn RenderSurface>) -> Self {
        Self {
            surface,
            query: String::new(),
            generation: 0,
            ranges: Vec::new(),
            current: 0,
            style_installed: false,
            subscription: None,
            relayout_scheduled: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub struct FindEngine {
    /// Search state keyed by context id
    sessions: Mutex<HashMap<String, Arc<Mutex<SearchState>>>>,
}

impl FindEngine {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Run one search step against a context's surface. Never fails: a
    /// bridge error is reported as "no match" and the engine stays usable
    /// on the next query.
    pub fn find(
        &self,
        context_id: &str,
        surface: &Arc<dyn RenderSurface>,
        request: &FindRequest,
    ) -> FindResponse {
        let query = request.query.trim().to_string();

        // An empty query always resets to the cleared state
        if query.is_empty() {
            self.clear(context_id);
            return FindResponse::NONE;
        }

        let entry = {
            let mut sessions = self.sessions.lock();
            Arc::clone(
                sessions
                    .entry(context_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(SearchState::new(Arc::clone(surface))))),
            )
        };

        let mut state = entry.lock();

        let generation = surface.document_generation();
        let stale =
            request.reset || state.query != query || state.generation != generation;

        if stale {
            Self::drop_ranges(&mut state);
            state.query = query.clone();
            state.generation = generation;

            if let Err(e) = Self::build_ranges(&mut state, &query) {
                // Degrade to "no match"; forget the query so the next
                // request rebuilds from scratch
                tracing::warn!(context_id = %context_id, error = %e, "Find bridge failed");
                state.query.clear();
                return FindResponse::NONE;
            }

            Self::attach_observer(&entry, &mut state);

            tracing::debug!(
                context_id = %context_id,
                query = %query,
                matches = state.ranges.len(),
                "Rebuilt find ranges"
            );
        }

        Self::step(&mut state, request.forward)
    }

    /// Fully dispose a context's search state: overlays removed, observer
    /// disconnected, scroll/resize listeners detached, style removed.
    /// Called when the query is cleared and when the context is hidden or
    /// goes away.
    pub fn clear(&self, context_id: &str) {
        let entry = self.sessions.lock().remove(context_id);
        if let Some(entry) = entry {
            let mut state = entry.lock();
            Self::drop_ranges(&mut state);
            if let Some(subscription) = state.subscription.take() {
                state.surface.unsubscribe(subscription);
            }
            tracing::debug!(context_id = %context_id, "Disposed search state");
        }
    }

    pub fn dispose_all(&self) {
        let ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        for id in ids {
            self.clear(&id);
        }
    }

    /// Whether a context currently holds search state
    pub fn has_state(&self, context_id: &str) -> bool {
        self.sessions.lock().contains_key(context_id)
    }

    fn build_ranges(state: &mut SearchState, query: &str) -> Result<()> {
        let nodes = state.surface.text_nodes()?;

        let pattern = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()
            .map_err(|e| FindError::Pattern(e.to_string()))?;

        for node in &nodes {
            if !node.container.is_searchable() || node.text.trim().is_empty() {
                continue;
            }
            for found in pattern.find_iter(&node.text) {
                state.ranges.push(MatchRange {
                    node: node.id,
                    start: found.start(),
                    end: found.end(),
                    overlays: Vec::new(),
                });
            }
        }

        if state.ranges.is_empty() {
            return Ok(());
        }

        state.surface.install_highlight_style();
        state.style_installed = true;

        for range in &mut state.ranges {
            let rects = state
                .surface
                .client_rects(range.node, range.start, range.end);
            for rect in rects {
                range.overlays.push(state.surface.insert_highlight(rect));
            }
        }

        Ok(())
    }

    /// Subscribe to document mutation and viewport events. Mutations that
    /// touch only our own highlight elements are ignored; everything else
    /// schedules a relayout, once per animation frame.
    fn attach_observer(entry: &Arc<Mutex<SearchState>>, state: &mut SearchState) {
        if state.subscription.is_some() {
            return;
        }

        let weak_entry: Weak<Mutex<SearchState>> = Arc::downgrade(entry);
        let weak_surface = Arc::downgrade(&state.surface);
        let scheduled = Arc::clone(&state.relayout_scheduled);

        let subscription = state.surface.subscribe(Arc::new(move |event| {
            let relevant = match event {
                SurfaceEvent::Mutated { highlights_only } => !highlights_only,
                SurfaceEvent::Scrolled | SurfaceEvent::Resized => true,
                _ => false,
            };
            if !relevant {
                return;
            }
            Self::schedule_relayout(&weak_entry, &weak_surface, &scheduled);
        }));

        state.subscription = Some(subscription);
    }

    fn schedule_relayout(
        entry: &Weak<Mutex<SearchState>>,
        surface: &Weak<dyn RenderSurface>,
        scheduled: &Arc<AtomicBool>,
    ) {
        let surface_now = match surface.upgrade() {
            Some(s) => s,
            None => return,
        };

        // Debounce: one relayout per animation frame
        if scheduled.swap(true, Ordering::SeqCst) {
            return;
        }

        let frame_entry = entry.clone();
        let frame_scheduled = Arc::clone(scheduled);
        surface_now.request_frame(Box::new(move || {
            frame_scheduled.store(false, Ordering::SeqCst);
            if let Some(entry) = frame_entry.upgrade() {
                let state = entry.lock();
                Self::relayout(&state);
            }
        }));
    }

    /// Reposition existing highlights from fresh layout rectangles. Pure
    /// relayout, never a re-search: ranges whose backing node disappeared
    /// are hidden, not removed.
    fn relayout(state: &SearchState) {
        let surface = &state.surface;
        for range in &state.ranges {
            if !surface.node_alive(range.node) {
                for overlay in &range.overlays {
                    surface.set_highlight_hidden(*overlay, true);
                }
                continue;
            }

            let rects = surface.client_rects(range.node, range.start, range.end);
            for (index, overlay) in range.overlays.iter().enumerate() {
                match rects.get(index) {
                    Some(rect) => surface.move_highlight(*overlay, *rect),
                    None => surface.set_highlight_hidden(*overlay, true),
                }
            }
        }
    }

    /// Move the active ordinal circularly and mark the active highlight
    fn step(state: &mut SearchState, forward: bool) -> FindResponse {
        let total = state.ranges.len();
        if total == 0 {
            return FindResponse::NONE;
        }

        let next_index = match state.current {
            0 => {
                if forward {
                    0
                } else {
                    total - 1
                }
            }
            current => {
                let index = current - 1;
                if forward {
                    (index + 1) % total
                } else {
                    (index + total - 1) % total
                }
            }
        };

        if state.current > 0 {
            for overlay in &state.ranges[state.current - 1].overlays {
                state.surface.set_highlight_active(*overlay, false);
            }
        }
        for overlay in &state.ranges[next_index].overlays {
            state.surface.set_highlight_active(*overlay, true);
        }

        state.current = next_index + 1;

        let node = state.ranges[next_index].node;
        if state.surface.node_alive(node) {
            state.surface.scroll_into_view(node);
        }

        FindResponse {
            has_match: true,
            current: state.current,
            total,
        }
    }

    /// Remove every overlay and the highlight style; counters reset
    fn drop_ranges(state: &mut SearchState) {
        for range in &state.ranges {
            for overlay in &range.overlays {
                state.surface.remove_highlight(*overlay);
            }
        }
        state.ranges.clear();
        state.current = 0;

        if state.style_installed {
            state.surface.remove_highlight_style();
            state.style_installed = false;
        }
    }
}

impl Default for FindEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylight_surface::HeadlessSurface;
    use url::Url;

    fn fixture(lines: &[&str]) -> (FindEngine, Arc<HeadlessSurface>, Arc<dyn RenderSurface>) {
        let headless = Arc::new(HeadlessSurface::new());
        headless.set_document_text(lines);
        let surface: Arc<dyn RenderSurface> = Arc::clone(&headless) as Arc<dyn RenderSurface>;
        (FindEngine::new(), headless, surface)
    }

    #[test]
    fn test_counts_and_forward_wraparound() {
        let (engine, _headless, surface) =
            fixture(&["the cat sat on the mat", "a hat for the bat"]);

        // "at" occurs five times across both nodes
        for expected in 1..=5 {
            let response = engine.find("ctx", &surface, &FindRequest::forward("at"));
            assert!(response.has_match);
            assert_eq!(response.total, 5);
            assert_eq!(response.current, expected);
        }

        // One more step wraps back to the first match
        let response = engine.find("ctx", &surface, &FindRequest::forward("at"));
        assert_eq!(response.current, 1);
        assert_eq!(response.total, 5);
    }

    #[test]
    fn test_backward_wraps_to_last() {
        let (engine, _headless, surface) = fixture(&["alpha beta alpha"]);

        let response = engine.find("ctx", &surface, &FindRequest::forward("alpha"));
        assert_eq!(response.current, 1);

        let response = engine.find("ctx", &surface, &FindRequest::backward("alpha"));
        assert_eq!(response.current, 2);
        assert_eq!(response.total, 2);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let (engine, _headless, surface) = fixture(&["Rust and RUST and rust"]);
        let response = engine.find("ctx", &surface, &FindRequest::forward("rust"));
        assert_eq!(response.total, 3);
    }

    #[test]
    fn test_query_is_escaped_not_a_pattern() {
        let (engine, _headless, surface) = fixture(&["price is $4.99 (sale)"]);
        let response = engine.find("ctx", &surface, &FindRequest::forward("$4.99 ("));
        assert_eq!(response.total, 1);
        // A regex metacharacter query matches literally or not at all
        let response = engine.find("ctx", &surface, &FindRequest::forward(".*"));
        assert_eq!(response.total, 0);
    }

    #[test]
    fn test_zero_matches_yields_zero_counters() {
        let (engine, headless, surface) = fixture(&["nothing to see"]);
        let response = engine.find("ctx", &surface, &FindRequest::forward("zebra"));
        assert_eq!(response, FindResponse::NONE);
        assert_eq!(headless.highlight_count(), 0);
    }

    #[test]
    fn test_empty_query_clears_everything() {
        let (engine, headless, surface) = fixture(&["one two one"]);

        engine.find("ctx", &surface, &FindRequest::forward("one"));
        assert_eq!(headless.highlight_count(), 2);
        assert!(headless.style_installed());

        let response = engine.find("ctx", &surface, &FindRequest::forward("   "));
        assert_eq!(response, FindResponse::NONE);
        assert_eq!(headless.highlight_count(), 0);
        assert!(!headless.style_installed());
        assert!(!engine.has_state("ctx"));
    }

    #[test]
    fn test_identical_query_advances_without_research() {
        let (engine, headless, surface) = fixture(&["word word word"]);

        engine.find("ctx", &surface, &FindRequest::forward("word"));
        let rects_before = headless.highlight_rects();

        let response = engine.find("ctx", &surface, &FindRequest::forward("word"));
        assert_eq!(response.current, 2);
        // Highlights were reused, not rebuilt
        assert_eq!(headless.highlight_rects(), rects_before);
    }

    #[test]
    fn test_reset_flag_forces_rebuild() {
        let (engine, headless, surface) = fixture(&["word word"]);

        let response = engine.find("ctx", &surface, &FindRequest::forward("word"));
        assert_eq!(response.total, 2);

        let node = headless.text_nodes().unwrap()[0].id;
        headless.update_node_text(node, "word word word");

        // Same query without reset keeps stale counts
        let response = engine.find("ctx", &surface, &FindRequest::forward("word"));
        assert_eq!(response.total, 2);

        // Reset re-walks the document
        let response = engine.find("ctx", &surface, &FindRequest::fresh("word"));
        assert_eq!(response.total, 3);
        assert_eq!(response.current, 1);
    }

    #[test]
    fn test_script_and_style_text_excluded() {
        let (engine, headless, surface) = fixture(&[]);
        headless.load_html(
            "<html><head><style>needle {}</style></head><body>\
             <p>needle in text</p><script>var needle = 1;</script>\
             <noscript>needle</noscript></body></html>",
        );

        let response = engine.find("ctx", &surface, &FindRequest::forward("needle"));
        assert_eq!(response.total, 1);
    }

    #[test]
    fn test_active_match_scrolls_into_view() {
        let (engine, headless, surface) = fixture(&["first target", "second target"]);
        let nodes = headless.text_nodes().unwrap();

        engine.find("ctx", &surface, &FindRequest::forward("target"));
        assert_eq!(headless.scrolled_to(), Some(nodes[0].id));
        assert_eq!(headless.active_highlight_rects().len(), 1);

        engine.find("ctx", &surface, &FindRequest::forward("target"));
        assert_eq!(headless.scrolled_to(), Some(nodes[1].id));
        // The previous active highlight was demoted
        assert_eq!(headless.active_highlight_rects().len(), 1);
    }

    #[test]
    fn test_wrapped_match_gets_one_overlay_per_line() {
        let (engine, headless, surface) = fixture(&[]);
        headless.set_viewport_cols(8);
        headless.set_document_text(&["abcdefmatchxyz"]);

        let response = engine.find("ctx", &surface, &FindRequest::forward("match"));
        assert_eq!(response.total, 1);
        // "match" spans columns 6..11, crossing the wrap at 8
        assert_eq!(headless.highlight_count(), 2);
    }

    #[test]
    fn test_mutation_schedules_single_relayout() {
        let (engine, headless, surface) = fixture(&["padding line", "the match lives here"]);

        engine.find("ctx", &surface, &FindRequest::forward("match"));
        let rects_before = headless.highlight_rects();

        // Growing the first node pushes the match down a line; several
        // mutations in one frame coalesce into a single relayout task.
        let first = headless.text_nodes().unwrap()[0].id;
        headless.update_node_text(first, "padding line grown far beyond one line of layout width so it wraps onto a second line");
        headless.update_node_text(first, "padding line grown far beyond one line of layout width so it wraps onto a second line!");
        assert_eq!(headless.pending_frame_count(), 1);

        headless.tick_frame();
        let rects_after = headless.highlight_rects();
        assert_ne!(rects_before, rects_after);
        assert_eq!(headless.highlight_count(), 1);
    }

    #[test]
    fn test_highlight_only_mutations_are_ignored() {
        let (engine, headless, surface) = fixture(&["some match here"]);

        engine.find("ctx", &surface, &FindRequest::forward("match"));
        assert_eq!(headless.pending_frame_count(), 0);

        headless.emit_highlight_mutation();
        assert_eq!(headless.pending_frame_count(), 0);
    }

    #[test]
    fn test_scroll_and_resize_schedule_relayout() {
        let (engine, headless, surface) = fixture(&["scroll match target"]);

        engine.find("ctx", &surface, &FindRequest::forward("match"));

        headless.emit_scrolled();
        assert_eq!(headless.pending_frame_count(), 1);
        headless.tick_frame();

        headless.set_viewport_cols(6);
        assert_eq!(headless.pending_frame_count(), 1);
        headless.tick_frame();

        // Narrowing the viewport wrapped the text; the overlay moved
        assert_eq!(headless.highlight_count(), 1);
    }

    #[test]
    fn test_vanished_node_hides_overlays_without_removing() {
        let (engine, headless, surface) = fixture(&["keep this", "match goes away"]);
        let doomed = headless.text_nodes().unwrap()[1].id;

        let response = engine.find("ctx", &surface, &FindRequest::forward("match"));
        assert_eq!(response.total, 1);
        assert_eq!(headless.visible_highlight_count(), 1);

        headless.remove_node(doomed);
        headless.tick_frame();

        assert_eq!(headless.visible_highlight_count(), 0);
        assert_eq!(headless.highlight_count(), 1);

        // The range is hidden, not removed: totals are unchanged
        let response = engine.find("ctx", &surface, &FindRequest::forward("match"));
        assert_eq!(response.total, 1);
    }

    #[test]
    fn test_bridge_failure_degrades_to_no_match() {
        let (engine, headless, surface) = fixture(&["findable text"]);

        headless.break_bridge(true);
        let response = engine.find("ctx", &surface, &FindRequest::forward("findable"));
        assert_eq!(response, FindResponse::NONE);

        // The engine stays usable on the next query
        headless.break_bridge(false);
        let response = engine.find("ctx", &surface, &FindRequest::forward("findable"));
        assert_eq!(response.total, 1);
    }

    #[test]
    fn test_navigation_resets_state_naturally() {
        let (engine, headless, surface) = fixture(&["old document match"]);

        let response = engine.find("ctx", &surface, &FindRequest::forward("match"));
        assert_eq!(response.total, 1);

        // Navigating replaces the document and bumps the generation
        headless.load(&Url::parse("https://example.com/next").unwrap());
        headless.set_document_text(&["match match"]);

        // Same query, no reset flag: the generation mismatch rebuilds
        let response = engine.find("ctx", &surface, &FindRequest::forward("match"));
        assert_eq!(response.total, 2);
        assert_eq!(response.current, 1);
    }

    #[test]
    fn test_clear_disposes_observer() {
        let (engine, headless, surface) = fixture(&["observed match"]);

        engine.find("ctx", &surface, &FindRequest::forward("match"));
        engine.clear("ctx");

        // No relayout work runs against a disposed context
        headless.append_text_node("new content");
        assert_eq!(headless.pending_frame_count(), 0);
        assert_eq!(headless.highlight_count(), 0);
    }
}
