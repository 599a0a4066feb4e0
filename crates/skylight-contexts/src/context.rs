//! Browsing context
//!
//! One rendering surface plus its load-state machine, its injected
//! navigation policy, and the per-context "navigation finished" waiter.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use url::Url;
use uuid::Uuid;

use skylight_navigation::NavigationPolicy;
use skylight_surface::{RenderSurface, SubscriptionId, SurfaceEvent};

use crate::state::ContextState;

/// Two-axis address of a context slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub origin_url: String,
    pub session_index: u8,
}

impl ContextKey {
    pub fn new(origin_url: impl Into<String>, session_index: u8) -> Self {
        Self {
            origin_url: origin_url.into(),
            session_index,
        }
    }
}

impl std::fmt::Display for ContextKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.origin_url, self.session_index)
    }
}

pub struct BrowsingContext {
    id: String,
    key: ContextKey,
    surface: Arc<dyn RenderSurface>,
    policy: Arc<dyn NavigationPolicy>,
    state: Arc<Mutex<ContextState>>,
    /// At most one pending navigation waiter; a newer waiter supersedes
    /// the older one.
    waiter: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    /// Set while the initial origin load is in flight; the focus selector
    /// fires once more when that load finishes.
    initial_focus_pending: Arc<AtomicBool>,
    subscription: SubscriptionId,
    created_at: DateTime<Utc>,
}

impl BrowsingContext {
    pub fn new(
        key: ContextKey,
        surface: Arc<dyn RenderSurface>,
        policy: Arc<dyn NavigationPolicy>,
        focus_selector: String,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        let state = Arc::new(Mutex::new(ContextState::Unloaded));
        let waiter: Arc<Mutex<Option<oneshot::Sender<()>>>> = Arc::new(Mutex::new(None));
        let initial_focus_pending = Arc::new(AtomicBool::new(false));

        let listener_id = id.clone();
        let listener_state = Arc::clone(&state);
        let listener_waiter = Arc::clone(&waiter);
        let listener_surface = Arc::clone(&surface);
        let listener_focus = Arc::clone(&initial_focus_pending);

        let subscription = surface.subscribe(Arc::new(move |event| match event {
            SurfaceEvent::NavigationFinished { .. } => {
                {
                    let mut current = listener_state.lock();
                    if current.can_transition_to(ContextState::Loaded) {
                        *current = ContextState::Loaded;
                    }
                }
                if let Some(tx) = listener_waiter.lock().take() {
                    let _ = tx.send(());
                }
                if listener_focus.swap(false, Ordering::SeqCst) {
                    listener_surface.focus_element(&focus_selector);
                }
            }
            SurfaceEvent::ProcessTerminated => {
                // Self-healing: reload only this context, visibility as-is
                tracing::warn!(
                    context_id = %listener_id,
                    "Content process terminated, reloading"
                );
                {
                    let mut current = listener_state.lock();
                    if current.can_transition_to(ContextState::Loading) {
                        *current = ContextState::Loading;
                    }
                }
                listener_surface.reload();
            }
            _ => {}
        }));

        tracing::debug!(context_id = %id, key = %key, "Created browsing context");

        Self {
            id,
            key,
            surface,
            policy,
            state,
            waiter,
            initial_focus_pending,
            subscription,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> &ContextKey {
        &self.key
    }

    pub fn surface(&self) -> &Arc<dyn RenderSurface> {
        &self.surface
    }

    pub fn policy(&self) -> &Arc<dyn NavigationPolicy> {
        &self.policy
    }

    pub fn state(&self) -> ContextState {
        *self.state.lock()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_visible(&self) -> bool {
        !self.surface.is_hidden()
    }

    /// Kick off the initial origin load. Called exactly once, on creation.
    pub fn begin_load(&self, url: &Url) {
        {
            let mut current = self.state.lock();
            debug_assert!(current.can_transition_to(ContextState::Loading));
            *current = ContextState::Loading;
        }
        self.initial_focus_pending.store(true, Ordering::SeqCst);
        tracing::info!(context_id = %self.id, url = %url, "Loading origin");
        self.surface.load(url);
    }

    pub fn show(&self, zoom: f64, focus_selector: &str) {
        self.surface.set_hidden(false);
        self.surface.set_page_zoom(zoom);
        self.surface.focus_element(focus_selector);
    }

    pub fn hide(&self) {
        // Does not cancel an in-flight navigation; rendering just stops
        self.surface.set_hidden(true);
    }

    pub fn focus(&self, focus_selector: &str) {
        self.surface.focus_element(focus_selector);
    }

    pub fn reload(&self) {
        {
            let mut current = self.state.lock();
            if current.can_transition_to(ContextState::Loading) {
                *current = ContextState::Loading;
            }
        }
        self.surface.reload();
    }

    /// Await the next "navigation finished" signal. Resolves immediately
    /// when the context is already loaded, and after `timeout` at the
    /// latest, so callers never hang. Returns whether the context is
    /// loaded when the wait ends.
    pub async fn wait_until_loaded(&self, timeout: Duration) -> bool {
        if self.state() == ContextState::Loaded {
            return true;
        }

        let (tx, rx) = oneshot::channel();
        {
            let mut slot = self.waiter.lock();
            // Dropping a superseded sender resolves the old waiter
            *slot = Some(tx);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(())) => true,
            _ => self.state() == ContextState::Loaded,
        }
    }

    /// Terminal transition; releases the surface subscription
    pub fn teardown(&self) {
        self.surface.unsubscribe(self.subscription);
        self.surface.set_hidden(true);
        *self.state.lock() = ContextState::TornDown;
        self.waiter.lock().take();

        tracing::info!(context_id = %self.id, key = %self.key, "Tore down browsing context");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylight_navigation::EnginePolicy;
    use skylight_surface::HeadlessSurface;
    use std::path::PathBuf;

    fn context(auto_finish: bool) -> (BrowsingContext, Arc<HeadlessSurface>) {
        let surface = Arc::new(HeadlessSurface::new());
        surface.set_auto_finish_loads(auto_finish);
        let origin = Url::parse("https://chat.example.com").unwrap();
        let policy = Arc::new(EnginePolicy::new(
            origin,
            &[],
            PathBuf::from("/downloads"),
        ));
        let context = BrowsingContext::new(
            ContextKey::new("https://chat.example.com", 0),
            Arc::clone(&surface) as Arc<dyn RenderSurface>,
            policy,
            "#prompt".to_string(),
        );
        (context, surface)
    }

    #[test]
    fn test_load_reaches_loaded_state() {
        let (context, _surface) = context(true);
        assert_eq!(context.state(), ContextState::Unloaded);

        context.begin_load(&Url::parse("https://chat.example.com").unwrap());
        assert_eq!(context.state(), ContextState::Loaded);
    }

    #[tokio::test]
    async fn test_wait_resolves_on_finish() {
        let (context, surface) = context(false);
        context.begin_load(&Url::parse("https://chat.example.com").unwrap());
        assert_eq!(context.state(), ContextState::Loading);

        let wait = context.wait_until_loaded(Duration::from_secs(5));
        surface.finish_navigation();
        assert!(wait.await);
        assert_eq!(context.state(), ContextState::Loaded);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let (context, _surface) = context(false);
        context.begin_load(&Url::parse("https://chat.example.com").unwrap());

        let loaded = context
            .wait_until_loaded(Duration::from_millis(20))
            .await;
        assert!(!loaded);
    }

    #[test]
    fn test_initial_load_focuses_input() {
        let (context, surface) = context(false);
        context.begin_load(&Url::parse("https://chat.example.com").unwrap());
        assert!(surface.focused_selectors().is_empty());

        surface.finish_navigation();
        assert_eq!(surface.focused_selectors(), vec!["#prompt".to_string()]);

        // Later navigations do not re-fire the initial focus
        surface.load(&Url::parse("https://chat.example.com/next").unwrap());
        surface.finish_navigation();
        assert_eq!(surface.focused_selectors().len(), 1);
    }

    #[test]
    fn test_crash_triggers_reload_and_keeps_visibility() {
        let (context, surface) = context(true);
        context.begin_load(&Url::parse("https://chat.example.com").unwrap());
        context.show(1.0, "");
        assert!(context.is_visible());

        surface.terminate_content_process();
        assert_eq!(surface.reload_count(), 1);
        assert!(context.is_visible());
        assert_eq!(context.state(), ContextState::Loaded);
    }

    #[test]
    fn test_teardown_stops_event_handling() {
        let (context, surface) = context(true);
        context.begin_load(&Url::parse("https://chat.example.com").unwrap());
        context.teardown();
        assert_eq!(context.state(), ContextState::TornDown);

        // Events after teardown no longer reach the context
        surface.terminate_content_process();
        assert_eq!(surface.reload_count(), 0);
        assert_eq!(context.state(), ContextState::TornDown);
    }
}
