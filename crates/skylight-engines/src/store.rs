//! Engine Store
//!
//! Persists the ordered engine catalog; auto-saves on any mutation.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use skylight_storage::Database;

use crate::defaults::default_engines;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::Result;

pub struct EngineStore {
    /// In-memory catalog, kept in display order
    engines: Arc<RwLock<Vec<Engine>>>,
    /// Database for persistence
    db: Database,
}

impl EngineStore {
    pub fn new(db: Database) -> Self {
        Self {
            engines: Arc::new(RwLock::new(Vec::new())),
            db,
        }
    }

    /// Load the catalog from the database, seeding the built-in defaults
    /// when nothing has been persisted yet.
    pub fn initialize(&self) -> Result<Vec<Engine>> {
        let mut engines = self.load_all()?;

        if engines.is_empty() {
            engines = default_engines();
            *self.engines.write() = engines.clone();
            self.persist_all()?;
            tracing::info!(count = engines.len(), "Seeded default engine catalog");
        } else {
            *self.engines.write() = engines.clone();
            tracing::info!(count = engines.len(), "Loaded engine catalog");
        }

        Ok(engines)
    }

    /// The ordered catalog
    pub fn list(&self) -> Vec<Engine> {
        self.engines.read().clone()
    }

    pub fn get(&self, origin_url: &str) -> Result<Engine> {
        self.engines
            .read()
            .iter()
            .find(|e| e.origin_url == origin_url)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(origin_url.to_string()))
    }

    pub fn get_by_index(&self, index: usize) -> Option<Engine> {
        self.engines.read().get(index).cloned()
    }

    pub fn add(&self, engine: Engine) -> Result<Engine> {
        {
            let mut engines = self.engines.write();
            if engines.iter().any(|e| e.origin_url == engine.origin_url) {
                return Err(EngineError::InvalidOrigin(format!(
                    "engine already exists for {}",
                    engine.origin_url
                )));
            }
            engines.push(engine.clone());
        }
        self.persist_all()?;

        tracing::info!(engine = %engine.name, origin = %engine.origin_url, "Added engine");

        Ok(engine)
    }

    pub fn update(&self, engine: Engine) -> Result<Engine> {
        {
            let mut engines = self.engines.write();
            let slot = engines
                .iter_mut()
                .find(|e| e.id == engine.id)
                .ok_or_else(|| EngineError::NotFound(engine.id.clone()))?;
            *slot = engine.clone();
        }
        self.persist_all()?;
        Ok(engine)
    }

    /// Remove an engine from the catalog. Tearing down its contexts and
    /// clearing its stored zoom is the pool's responsibility.
    pub fn remove(&self, origin_url: &str) -> Result<()> {
        let removed = {
            let mut engines = self.engines.write();
            let before = engines.len();
            engines.retain(|e| e.origin_url != origin_url);
            before != engines.len()
        };

        if !removed {
            return Err(EngineError::NotFound(origin_url.to_string()));
        }

        self.persist_all()?;

        tracing::info!(origin = %origin_url, "Removed engine");

        Ok(())
    }

    /// Move an engine to a new catalog position
    pub fn move_engine(&self, origin_url: &str, new_index: usize) -> Result<()> {
        {
            let mut engines = self.engines.write();
            let current = engines
                .iter()
                .position(|e| e.origin_url == origin_url)
                .ok_or_else(|| EngineError::NotFound(origin_url.to_string()))?;
            let engine = engines.remove(current);
            let insert_index = new_index.min(engines.len());
            engines.insert(insert_index, engine);
        }
        self.persist_all()
    }

    fn load_all(&self) -> Result<Vec<Engine>> {
        let engines = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, origin_url, focus_selector, friend_domains,
                        action_scripts, activation_shortcut, created_at, updated_at
                 FROM engines ORDER BY position",
            )?;

            let engines: Vec<Engine> = stmt
                .query_map([], |row| {
                    let friend_json: String = row.get(4)?;
                    let scripts_json: String = row.get(5)?;
                    let friend_domains: Vec<String> =
                        serde_json::from_str(&friend_json).unwrap_or_default();
                    let action_scripts: HashMap<String, String> =
                        serde_json::from_str(&scripts_json).unwrap_or_default();

                    let created_str: String = row.get(7)?;
                    let updated_str: String = row.get(8)?;

                    let created_at = DateTime::parse_from_rfc3339(&created_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now());
                    let updated_at = DateTime::parse_from_rfc3339(&updated_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now());

                    Ok(Engine {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        origin_url: row.get(2)?,
                        focus_selector: row.get(3)?,
                        friend_domains,
                        action_scripts,
                        activation_shortcut: row.get(6)?,
                        created_at,
                        updated_at,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();

            Ok(engines)
        })?;

        Ok(engines)
    }

    /// Rewrite the whole catalog; positions follow the in-memory order
    fn persist_all(&self) -> Result<()> {
        let engines = self.engines.read().clone();

        self.db.transaction(|conn| {
            conn.execute("DELETE FROM engines", [])?;
            for (position, engine) in engines.iter().enumerate() {
                let friend_json = serde_json::to_string(&engine.friend_domains)?;
                let scripts_json = serde_json::to_string(&engine.action_scripts)?;
                conn.execute(
                    "INSERT INTO engines
                     (id, name, origin_url, focus_selector, friend_domains,
                      action_scripts, activation_shortcut, position, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    rusqlite::params![
                        engine.id,
                        engine.name,
                        engine.origin_url,
                        engine.focus_selector,
                        friend_json,
                        scripts_json,
                        engine.activation_shortcut,
                        position as i64,
                        engine.created_at.to_rfc3339(),
                        engine.updated_at.to_rfc3339(),
                    ],
                )?;
            }
            Ok(())
        })?;

        Ok(())
    }
}

impl Clone for EngineStore {
    fn clone(&self) -> Self {
        Self {
            engines: Arc::clone(&self.engines),
            db: self.db.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_seeds_defaults() {
        let db = Database::open_in_memory().unwrap();
        let store = EngineStore::new(db);

        let engines = store.initialize().unwrap();
        assert!(!engines.is_empty());
        assert_eq!(engines[0].name, "ChatGPT");
    }

    #[test]
    fn test_add_get_remove() {
        let db = Database::open_in_memory().unwrap();
        let store = EngineStore::new(db);
        store.initialize().unwrap();

        let engine = Engine::new("Local", "http://localhost:9999").unwrap();
        store.add(engine).unwrap();

        let fetched = store.get("http://localhost:9999").unwrap();
        assert_eq!(fetched.name, "Local");

        store.remove("http://localhost:9999").unwrap();
        assert!(store.get("http://localhost:9999").is_err());
        assert!(matches!(
            store.remove("http://localhost:9999"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_catalog_order_persists() {
        let db = Database::open_in_memory().unwrap();
        let store = EngineStore::new(db.clone());
        store.initialize().unwrap();

        let first = store.list()[0].origin_url.clone();
        store.move_engine(&first, 2).unwrap();

        // Reload through a fresh store against the same database
        let reloaded = EngineStore::new(db);
        let engines = reloaded.initialize().unwrap();
        assert_eq!(engines[2].origin_url, first);
    }

    #[test]
    fn test_duplicate_origin_rejected() {
        let db = Database::open_in_memory().unwrap();
        let store = EngineStore::new(db);
        store.initialize().unwrap();

        let dupe = Engine::new("Copy", "https://chat.openai.com").unwrap();
        assert!(store.add(dupe).is_err());
    }
}
