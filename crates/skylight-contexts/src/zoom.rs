//! Per-engine zoom
//!
//! Levels are clamped to [0.5, 2.5] in 0.1 steps and persisted keyed by
//! engine origin. Application to live contexts is the pool's job.

use skylight_storage::Database;

use crate::Result;

pub const ZOOM_MIN: f64 = 0.5;
pub const ZOOM_MAX: f64 = 2.5;
pub const ZOOM_STEP: f64 = 0.1;
pub const ZOOM_DEFAULT: f64 = 1.0;

pub struct ZoomController {
    db: Database,
}

impl ZoomController {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Stored level for an origin, default 1.0
    pub fn level(&self, origin_url: &str) -> Result<f64> {
        Ok(self.db.zoom_level(origin_url)?.unwrap_or(ZOOM_DEFAULT))
    }

    /// Clamp, snap to the 0.1 grid, and persist. Returns the effective
    /// level.
    pub fn store(&self, origin_url: &str, level: f64) -> Result<f64> {
        let snapped = (level * 10.0).round() / 10.0;
        let clamped = snapped.clamp(ZOOM_MIN, ZOOM_MAX);

        let current = self.db.zoom_level(origin_url)?;
        if current.map(|c| (c - clamped).abs() < f64::EPSILON) != Some(true) {
            self.db.set_zoom_level(origin_url, clamped)?;
            tracing::debug!(origin = %origin_url, level = clamped, "Stored zoom level");
        }

        Ok(clamped)
    }

    /// Drop the stored level; used when the engine is removed
    pub fn clear(&self, origin_url: &str) -> Result<()> {
        self.db.clear_zoom_level(origin_url)?;
        Ok(())
    }
}

impl Clone for ZoomController {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}
