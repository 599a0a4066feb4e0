//! Context Pool
//!
//! Lazily creates and exclusively owns browsing contexts. Activation is
//! the only way a context becomes visible, and it hides every other
//! context first, so two contexts are never visible at once.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use skylight_engines::Engine;
use skylight_navigation::{EnginePolicy, NavigationPolicy};
use skylight_storage::Database;
use skylight_surface::{RenderSurface, SurfaceEvent, SurfaceFactory};

use crate::context::{BrowsingContext, ContextKey};
use crate::error::PoolError;
use crate::zoom::ZoomController;
use crate::Result;

/// Isolated browsing slots per engine
pub const SESSIONS_PER_ENGINE: usize = 10;

/// Receives title/loading/navigation events forwarded from every context
pub type ContextEventListener = Arc<dyn Fn(&ContextKey, &SurfaceEvent) + Send + Sync>;

pub struct ContextPool {
    /// Live contexts keyed by (engine origin, session index)
    contexts: Arc<RwLock<HashMap<ContextKey, Arc<BrowsingContext>>>>,
    /// Creates a rendering surface per context slot
    factory: Arc<dyn SurfaceFactory>,
    /// Per-engine zoom, persisted by origin
    zoom: ZoomController,
    /// Destination directory handed to each context's policy
    downloads_dir: PathBuf,
    /// Pool-level listeners interested in per-context events
    listeners: Arc<RwLock<Vec<ContextEventListener>>>,
}

impl ContextPool {
    pub fn new(db: Database, factory: Arc<dyn SurfaceFactory>, downloads_dir: PathBuf) -> Self {
        Self {
            contexts: Arc::new(RwLock::new(HashMap::new())),
            factory,
            zoom: ZoomController::new(db),
            downloads_dir,
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Observe title, loading and navigation events across all contexts
    pub fn subscribe(&self, listener: ContextEventListener) {
        self.listeners.write().push(listener);
    }

    /// Activate one (engine, session) slot. The context is created and its
    /// origin loaded on first use; afterwards activation only switches
    /// visibility, re-applies the engine's stored zoom and focuses the
    /// engine's input element. Re-activating the visible slot is a no-op
    /// beyond re-focusing.
    pub fn activate(&self, engine: &Engine, session_index: usize) -> Result<Arc<BrowsingContext>> {
        if session_index >= SESSIONS_PER_ENGINE {
            return Err(PoolError::SessionOutOfRange(session_index));
        }

        // No context is created for an unparseable origin
        let origin = engine
            .origin()
            .map_err(|_| PoolError::InvalidOrigin(engine.origin_url.clone()))?;

        let key = ContextKey::new(engine.origin_url.clone(), session_index as u8);

        if let Some(existing) = self.contexts.read().get(&key).cloned() {
            if existing.is_visible() {
                existing.focus(&engine.focus_selector);
                return Ok(existing);
            }
        }

        let (context, created) = {
            let mut contexts = self.contexts.write();
            match contexts.get(&key) {
                Some(context) => (Arc::clone(context), false),
                None => {
                    let surface = self.factory.create_surface();
                    let policy: Arc<dyn NavigationPolicy> = Arc::new(EnginePolicy::new(
                        origin.clone(),
                        &engine.friend_domains,
                        self.downloads_dir.clone(),
                    ));

                    // Forward title/loading/navigation changes to pool
                    // listeners; the forwarder dies with the surface.
                    let forward_key = key.clone();
                    let forward_listeners = Arc::clone(&self.listeners);
                    surface.subscribe(Arc::new(move |event| {
                        if matches!(
                            event,
                            SurfaceEvent::TitleChanged(_)
                                | SurfaceEvent::LoadingChanged(_)
                                | SurfaceEvent::NavigationFinished { .. }
                        ) {
                            for listener in forward_listeners.read().iter() {
                                listener(&forward_key, event);
                            }
                        }
                    }));

                    let context = Arc::new(BrowsingContext::new(
                        key.clone(),
                        surface,
                        policy,
                        engine.focus_selector.clone(),
                    ));
                    contexts.insert(key.clone(), Arc::clone(&context));
                    (context, true)
                }
            }
        };

        if created {
            // The origin is loaded exactly once per slot
            context.begin_load(&origin);
        }

        // Hide everything else before the target becomes visible
        let all: Vec<Arc<BrowsingContext>> = self.contexts.read().values().cloned().collect();
        for other in all {
            if other.id() != context.id() {
                other.hide();
            }
        }

        let zoom = self.zoom.level(&engine.origin_url)?;
        context.show(zoom, &engine.focus_selector);

        tracing::info!(
            context_id = %context.id(),
            key = %key,
            created,
            "Activated browsing context"
        );

        Ok(context)
    }

    /// Tear down every session of an engine and clear its stored zoom
    pub fn remove_engine(&self, origin_url: &str) -> Result<()> {
        let removed: Vec<Arc<BrowsingContext>> = {
            let mut contexts = self.contexts.write();
            let keys: Vec<ContextKey> = contexts
                .keys()
                .filter(|k| k.origin_url == origin_url)
                .cloned()
                .collect();
            keys.iter().filter_map(|k| contexts.remove(k)).collect()
        };

        for context in &removed {
            context.teardown();
        }

        self.zoom.clear(origin_url)?;

        tracing::info!(
            origin = %origin_url,
            count = removed.len(),
            "Removed engine from pool"
        );

        Ok(())
    }

    /// Drop contexts whose engine is no longer in the catalog
    pub fn sync_engines(&self, engines: &[Engine]) -> Result<()> {
        let live: Vec<String> = engines.iter().map(|e| e.origin_url.clone()).collect();
        let stale: Vec<String> = {
            let contexts = self.contexts.read();
            let mut origins: Vec<String> = contexts
                .keys()
                .map(|k| k.origin_url.clone())
                .filter(|origin| !live.contains(origin))
                .collect();
            origins.sort();
            origins.dedup();
            origins
        };

        for origin in stale {
            self.remove_engine(&origin)?;
        }

        Ok(())
    }

    /// Clamp, persist and apply a zoom level to every live context of the
    /// engine, visible or hidden. Returns the effective level.
    pub fn set_zoom(&self, origin_url: &str, level: f64) -> Result<f64> {
        let applied = self.zoom.store(origin_url, level)?;
        for context in self.contexts_for_engine(origin_url) {
            context.surface().set_page_zoom(applied);
        }
        Ok(applied)
    }

    pub fn zoom_by(&self, origin_url: &str, delta: f64) -> Result<f64> {
        let current = self.zoom.level(origin_url)?;
        self.set_zoom(origin_url, current + delta)
    }

    pub fn zoom_level(&self, origin_url: &str) -> Result<f64> {
        self.zoom.level(origin_url)
    }

    pub fn get(&self, key: &ContextKey) -> Result<Arc<BrowsingContext>> {
        self.contexts
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| PoolError::NotFound(key.to_string()))
    }

    /// The single visible context, if any
    pub fn visible_context(&self) -> Option<Arc<BrowsingContext>> {
        self.contexts
            .read()
            .values()
            .find(|c| c.is_visible())
            .cloned()
    }

    pub fn contexts_for_engine(&self, origin_url: &str) -> Vec<Arc<BrowsingContext>> {
        self.contexts
            .read()
            .values()
            .filter(|c| c.key().origin_url == origin_url)
            .cloned()
            .collect()
    }

    pub fn context_count(&self) -> usize {
        self.contexts.read().len()
    }
}

impl Clone for ContextPool {
    fn clone(&self) -> Self {
        Self {
            contexts: Arc::clone(&self.contexts),
            factory: Arc::clone(&self.factory),
            zoom: self.zoom.clone(),
            downloads_dir: self.downloads_dir.clone(),
            listeners: Arc::clone(&self.listeners),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ContextState;
    use skylight_surface::HeadlessFactory;

    fn pool() -> (ContextPool, Arc<HeadlessFactory>) {
        let factory = Arc::new(HeadlessFactory::new());
        let pool = ContextPool::new(
            Database::open_in_memory().unwrap(),
            Arc::clone(&factory) as Arc<dyn SurfaceFactory>,
            PathBuf::from("/downloads"),
        );
        (pool, factory)
    }

    fn engine(name: &str, origin: &str) -> Engine {
        Engine::new(name, origin).unwrap()
    }

    #[test]
    fn test_lazy_creation_loads_origin_once() {
        let (pool, factory) = pool();
        let chat = engine("Chat", "https://chat.example.com");

        let context = pool.activate(&chat, 0).unwrap();
        assert_eq!(factory.created_count(), 1);
        assert_eq!(context.state(), ContextState::Loaded);
        assert_eq!(
            context.surface().current_url().unwrap().as_str(),
            "https://chat.example.com/"
        );

        // Switching away and back must not reload the origin
        let other = engine("Other", "https://other.example.com");
        pool.activate(&other, 0).unwrap();
        pool.activate(&chat, 0).unwrap();

        let surfaces = factory.created();
        assert_eq!(surfaces.len(), 2);
        assert_eq!(surfaces[0].reload_count(), 0);
    }

    #[test]
    fn test_activate_is_idempotent() {
        let (pool, _factory) = pool();
        let chat = engine("Chat", "https://chat.example.com");

        let first = pool.activate(&chat, 3).unwrap();
        let second = pool.activate(&chat, 3).unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(pool.context_count(), 1);
        assert!(first.is_visible());
    }

    #[test]
    fn test_single_visible_across_engines() {
        let (pool, _factory) = pool();
        let chat = engine("Chat", "https://chat.example.com");
        let other = engine("Other", "https://other.example.com");

        pool.activate(&chat, 0).unwrap();
        pool.activate(&chat, 1).unwrap();
        let active = pool.activate(&other, 5).unwrap();

        let visible: Vec<_> = pool
            .contexts_for_engine("https://chat.example.com")
            .into_iter()
            .filter(|c| c.is_visible())
            .collect();
        assert!(visible.is_empty());
        assert_eq!(pool.visible_context().unwrap().id(), active.id());
    }

    #[test]
    fn test_invalid_origin_creates_nothing() {
        let (pool, factory) = pool();
        let broken = engine("Broken", "not a url");

        let result = pool.activate(&broken, 0);
        assert!(matches!(result, Err(PoolError::InvalidOrigin(_))));
        assert_eq!(pool.context_count(), 0);
        assert_eq!(factory.created_count(), 0);
        assert!(pool.visible_context().is_none());
    }

    #[test]
    fn test_session_index_bounds() {
        let (pool, _factory) = pool();
        let chat = engine("Chat", "https://chat.example.com");
        assert!(matches!(
            pool.activate(&chat, SESSIONS_PER_ENGINE),
            Err(PoolError::SessionOutOfRange(_))
        ));
    }

    #[test]
    fn test_sessions_are_isolated_surfaces() {
        let (pool, factory) = pool();
        let chat = engine("Chat", "https://chat.example.com");

        pool.activate(&chat, 0).unwrap();
        let surfaces = factory.created();
        surfaces[0].set_document_text(&["draft typed in session zero"]);

        pool.activate(&chat, 1).unwrap();
        let surfaces = factory.created();
        assert_eq!(surfaces.len(), 2);

        let session_one_text = surfaces[1].text_nodes().unwrap();
        assert!(session_one_text.is_empty());
    }

    #[test]
    fn test_remove_engine_tears_down_and_clears_zoom() {
        let (pool, _factory) = pool();
        let chat = engine("Chat", "https://chat.example.com");

        let c0 = pool.activate(&chat, 0).unwrap();
        let c1 = pool.activate(&chat, 1).unwrap();
        pool.set_zoom("https://chat.example.com", 1.4).unwrap();

        pool.remove_engine("https://chat.example.com").unwrap();

        assert_eq!(pool.context_count(), 0);
        assert_eq!(c0.state(), ContextState::TornDown);
        assert_eq!(c1.state(), ContextState::TornDown);
        assert_eq!(pool.zoom_level("https://chat.example.com").unwrap(), 1.0);
    }

    #[test]
    fn test_zoom_applies_to_hidden_contexts() {
        let (pool, factory) = pool();
        let chat = engine("Chat", "https://chat.example.com");

        pool.activate(&chat, 0).unwrap();
        pool.activate(&chat, 1).unwrap();

        let applied = pool.set_zoom("https://chat.example.com", 1.7).unwrap();
        assert!((applied - 1.7).abs() < 0.01);

        for surface in factory.created() {
            assert!((surface.page_zoom() - 1.7).abs() < 0.01);
        }
    }

    #[test]
    fn test_activation_applies_stored_zoom() {
        let (pool, _factory) = pool();
        let chat = engine("Chat", "https://chat.example.com");
        let other = engine("Other", "https://other.example.com");

        pool.activate(&chat, 0).unwrap();
        pool.set_zoom("https://chat.example.com", 1.2).unwrap();

        pool.activate(&other, 0).unwrap();
        let back = pool.activate(&chat, 0).unwrap();

        assert!((back.surface().page_zoom() - 1.2).abs() < 0.01);
    }

    #[test]
    fn test_forwards_title_and_loading_events() {
        let (pool, factory) = pool();
        let chat = engine("Chat", "https://chat.example.com");

        let seen: Arc<parking_lot::Mutex<Vec<(u8, String)>>> =
            Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        pool.subscribe(Arc::new(move |key, event| {
            if let SurfaceEvent::TitleChanged(title) = event {
                sink.lock().push((key.session_index, title.clone()));
            }
        }));

        pool.activate(&chat, 2).unwrap();
        factory.created()[0]
            .load_html("<html><head><title>Inbox (3)</title></head><body>hi</body></html>");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (2, "Inbox (3)".to_string()));
    }

    #[test]
    fn test_sync_engines_drops_stale_origins() {
        let (pool, _factory) = pool();
        let chat = engine("Chat", "https://chat.example.com");
        let other = engine("Other", "https://other.example.com");

        pool.activate(&chat, 0).unwrap();
        pool.activate(&other, 0).unwrap();
        assert_eq!(pool.context_count(), 2);

        pool.sync_engines(std::slice::from_ref(&chat)).unwrap();
        assert_eq!(pool.context_count(), 1);
        assert!(pool
            .get(&ContextKey::new("https://other.example.com", 0))
            .is_err());
    }
}
