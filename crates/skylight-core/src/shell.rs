//! Application shell
//!
//! The host UI talks to the shell; the shell owns the engine catalog, the
//! context pool, the find engine and the download manager, and applies the
//! side effects of navigation decisions (system-browser hand-off, download
//! interception, popup-in-place loads).

use parking_lot::RwLock;
use std::sync::Arc;
use url::Url;

use skylight_contexts::{BrowsingContext, ContextPool, PoolError};
use skylight_download::{sanitize_file_name, Download, DownloadManager};
use skylight_engines::{Engine, EngineStore};
use skylight_find::{Debouncer, FindEngine, FindRequest, FindResponse};
use skylight_navigation::{
    Disposition, NavigationRequest, NavigationResponse, PlatformOpener, SystemOpener,
};
use skylight_storage::Database;
use skylight_surface::{RenderSurface, SurfaceFactory};

use crate::config::Config;
use crate::Result;

pub struct Shell {
    config: Config,
    db: Database,
    engine_store: EngineStore,
    pool: ContextPool,
    find: Arc<FindEngine>,
    downloads: DownloadManager,
    opener: Arc<dyn SystemOpener>,
    find_debouncer: Arc<Debouncer>,
    /// Query the find bar last searched for, per the visible context
    last_find_query: Arc<RwLock<String>>,
}

impl Shell {
    /// Open the configured database and wire up the shell with the
    /// platform opener.
    pub fn new(config: Config, factory: Arc<dyn SurfaceFactory>) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&config.database_path)?;
        Self::with_database(config, db, factory, Arc::new(PlatformOpener))
    }

    /// Wire the shell against explicit collaborators
    pub fn with_database(
        config: Config,
        db: Database,
        factory: Arc<dyn SurfaceFactory>,
        opener: Arc<dyn SystemOpener>,
    ) -> Result<Self> {
        let engine_store = EngineStore::new(db.clone());
        let pool = ContextPool::new(db.clone(), factory, config.downloads_dir.clone());
        let downloads = DownloadManager::new(config.downloads_dir.clone());
        let find_debouncer = Arc::new(Debouncer::new(config.find_debounce));

        Ok(Self {
            config,
            db,
            engine_store,
            pool,
            find: Arc::new(FindEngine::new()),
            downloads,
            opener,
            find_debouncer,
            last_find_query: Arc::new(RwLock::new(String::new())),
        })
    }

    /// Load the engine catalog (seeding defaults on first run)
    pub fn initialize(&self) -> Result<()> {
        self.engine_store.initialize()?;
        tracing::info!("Shell initialized");
        Ok(())
    }

    // === Engine catalog ===

    pub fn engines(&self) -> Vec<Engine> {
        self.engine_store.list()
    }

    pub fn engine_store(&self) -> &EngineStore {
        &self.engine_store
    }

    /// Engine of the currently visible context, if any
    pub fn current_engine(&self) -> Option<Engine> {
        let context = self.pool.visible_context()?;
        self.engine_store.get(&context.key().origin_url).ok()
    }

    /// Remove an engine: catalog entry, all ten contexts, stored zoom
    pub fn remove_engine(&self, origin_url: &str) -> Result<()> {
        if let Some(visible) = self.pool.visible_context() {
            if visible.key().origin_url == origin_url {
                self.find.clear(visible.id());
            }
        }
        self.engine_store.remove(origin_url)?;
        self.pool.remove_engine(origin_url)?;
        Ok(())
    }

    /// Re-sync the pool after catalog edits: contexts of removed engines
    /// are torn down, new engines get contexts lazily on activation.
    pub fn reload_engines(&self) -> Result<()> {
        let engines = self.engine_store.list();
        self.pool.sync_engines(&engines)?;
        Ok(())
    }

    // === Activation ===

    /// Activate one (engine index, session index) slot. An unknown index
    /// or an engine with an unparseable origin is a silent no-op: no
    /// context is created and no context becomes visible.
    pub fn activate(
        &self,
        engine_index: usize,
        session_index: usize,
    ) -> Result<Option<Arc<BrowsingContext>>> {
        let engine = match self.engine_store.get_by_index(engine_index) {
            Some(engine) => engine,
            None => return Ok(None),
        };

        let previous = self.pool.visible_context();

        let context = match self.pool.activate(&engine, session_index) {
            Ok(context) => context,
            Err(PoolError::InvalidOrigin(origin)) => {
                tracing::warn!(origin = %origin, "Activation skipped: invalid origin URL");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        // The newly hidden context must not keep relayout work alive
        if let Some(previous) = previous {
            if previous.id() != context.id() {
                self.find.clear(previous.id());
            }
        }

        Ok(Some(context))
    }

    pub fn visible_context(&self) -> Option<Arc<BrowsingContext>> {
        self.pool.visible_context()
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    /// Await the visible context's initial load, bounded by the configured
    /// navigation timeout
    pub async fn wait_until_loaded(&self, context: &BrowsingContext) -> bool {
        context.wait_until_loaded(self.config.navigation_timeout).await
    }

    // === Navigation decisions ===

    /// Decide an outgoing navigation and apply its side effects. The host
    /// allows the surface to proceed only for `RenderInPlace`.
    pub fn handle_navigation(
        &self,
        context: &BrowsingContext,
        request: &NavigationRequest,
    ) -> Disposition {
        let decision = context.policy().decide_navigation(request);
        tracing::debug!(
            context_id = %context.id(),
            url = %request.url,
            decision = %decision,
            "Navigation decision"
        );

        match decision {
            Disposition::HandToSystemBrowser => self.opener.open(&request.url),
            Disposition::Download => {
                self.begin_download(&request.url, None);
            }
            Disposition::RenderInPlace | Disposition::RenderInPlaceNewContext => {}
        }

        decision
    }

    /// Decide a popup/new-window request. An internal target loads inside
    /// the originating context; no new context handle is ever returned to
    /// the source page.
    pub fn handle_new_window(&self, context: &BrowsingContext, target: &Url) -> Disposition {
        let decision = context.policy().decide_new_window(target);
        tracing::debug!(
            context_id = %context.id(),
            url = %target,
            decision = %decision,
            "New-window decision"
        );

        match decision {
            Disposition::RenderInPlaceNewContext => context.surface().load(target),
            Disposition::HandToSystemBrowser => self.opener.open(target),
            Disposition::RenderInPlace | Disposition::Download => {}
        }

        decision
    }

    /// Decide a received response; content the surface cannot show inline
    /// becomes a download under the server-suggested filename.
    pub fn handle_response(
        &self,
        context: &BrowsingContext,
        response: &NavigationResponse,
    ) -> Disposition {
        let decision = context.policy().decide_response(response);

        if decision == Disposition::Download {
            tracing::info!(
                context_id = %context.id(),
                url = %response.url,
                "Response not renderable inline, downloading"
            );
            self.begin_download(&response.url, response.suggested_filename.as_deref());
        }

        decision
    }

    fn begin_download(&self, url: &Url, suggested_filename: Option<&str>) -> Download {
        let name = suggested_filename
            .map(sanitize_file_name)
            .unwrap_or_else(|| filename_from_url(url));
        self.downloads.begin(url.clone(), &name)
    }

    pub fn downloads(&self) -> &DownloadManager {
        &self.downloads
    }

    // === Find ===

    /// One immediate search step against the visible context
    pub fn find(&self, request: &FindRequest) -> FindResponse {
        match self.pool.visible_context() {
            Some(context) => {
                *self.last_find_query.write() = request.query.trim().to_string();
                self.find.find(context.id(), context.surface(), request)
            }
            None => FindResponse::NONE,
        }
    }

    /// Typed input: schedules a fresh search after the configured debounce
    /// interval; each keystroke supersedes the pending one. Must be called
    /// within a tokio runtime.
    pub fn find_typed(
        &self,
        query: &str,
        on_result: impl FnOnce(FindResponse) + Send + 'static,
    ) {
        let shell = self.clone();
        let query = query.to_string();
        self.find_debouncer.call(move || {
            let response = shell.find(&FindRequest::fresh(&query));
            on_result(response);
        });
    }

    /// Explicit forward/backward trigger: fires immediately, bypassing the
    /// debounce, re-using the last query.
    pub fn find_step(&self, forward: bool) -> FindResponse {
        self.find_debouncer.cancel();
        let query = self.last_find_query.read().clone();
        let request = if forward {
            FindRequest::forward(query)
        } else {
            FindRequest::backward(query)
        };
        self.find(&request)
    }

    /// Clear the find bar: disposes the visible context's search state
    pub fn clear_find(&self) {
        self.find_debouncer.cancel();
        self.last_find_query.write().clear();
        if let Some(context) = self.pool.visible_context() {
            self.find.clear(context.id());
        }
    }

    pub fn find_engine(&self) -> &Arc<FindEngine> {
        &self.find
    }

    // === Zoom ===

    /// Zoom the visible context's engine by one step
    pub fn zoom_in(&self) -> Result<Option<f64>> {
        self.zoom_by(skylight_contexts::ZOOM_STEP)
    }

    pub fn zoom_out(&self) -> Result<Option<f64>> {
        self.zoom_by(-skylight_contexts::ZOOM_STEP)
    }

    pub fn reset_zoom(&self) -> Result<Option<f64>> {
        match self.pool.visible_context() {
            Some(context) => {
                let applied = self
                    .pool
                    .set_zoom(&context.key().origin_url, skylight_contexts::ZOOM_DEFAULT)?;
                Ok(Some(applied))
            }
            None => Ok(None),
        }
    }

    /// Set an absolute zoom level on the visible context's engine; the
    /// effective (clamped) level is returned and applied to every session.
    pub fn set_zoom(&self, level: f64) -> Result<Option<f64>> {
        match self.pool.visible_context() {
            Some(context) => {
                let applied = self.pool.set_zoom(&context.key().origin_url, level)?;
                Ok(Some(applied))
            }
            None => Ok(None),
        }
    }

    fn zoom_by(&self, delta: f64) -> Result<Option<f64>> {
        match self.pool.visible_context() {
            Some(context) => {
                let applied = self.pool.zoom_by(&context.key().origin_url, delta)?;
                Ok(Some(applied))
            }
            None => Ok(None),
        }
    }

    // === Actions ===

    /// Evaluate the visible engine's script for `action_id`. Missing
    /// scripts and evaluation failures are no-ops with a diagnostic.
    pub fn run_action(&self, action_id: &str) -> Result<bool> {
        let context = match self.pool.visible_context() {
            Some(context) => context,
            None => return Ok(false),
        };

        let engine = self.engine_store.get(&context.key().origin_url)?;
        let script = match engine.action_script(action_id) {
            Some(script) => script.to_string(),
            None => {
                tracing::debug!(
                    engine = %engine.name,
                    action = %action_id,
                    "No script configured for action"
                );
                return Ok(false);
            }
        };

        match context.surface().evaluate(&script) {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!(
                    engine = %engine.name,
                    action = %action_id,
                    error = %e,
                    "Action script failed"
                );
                Ok(false)
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl Clone for Shell {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            db: self.db.clone(),
            engine_store: self.engine_store.clone(),
            pool: self.pool.clone(),
            find: Arc::clone(&self.find),
            downloads: self.downloads.clone(),
            opener: Arc::clone(&self.opener),
            find_debouncer: Arc::clone(&self.find_debouncer),
            last_find_query: Arc::clone(&self.last_find_query),
        }
    }
}

fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(sanitize_file_name)
        .unwrap_or_else(|| "download".to_string())
}
