//! Context load-state machine
//!
//! ```text
//! Unloaded
//!   ↓ first activation
//! Loading
//!   ↓ navigation finished
//! Loaded
//!   ↺ reload / crash recovery (back to Loading)
//!   ↓ engine removal
//! TornDown
//! ```
//!
//! Visibility (hidden ⇄ visible) lives on the rendering surface; it is
//! orthogonal to load state and survives crash reloads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    /// Slot exists but nothing was ever loaded
    Unloaded,
    /// The origin load (or a reload) is in flight
    Loading,
    /// The document is committed and rendering
    Loaded,
    /// Terminal; the engine was removed
    TornDown,
}

impl ContextState {
    /// Check if transition to another state is valid
    pub fn can_transition_to(&self, target: ContextState) -> bool {
        match (self, target) {
            // First activation triggers the network load
            (ContextState::Unloaded, ContextState::Loading) => true,
            // Navigation finished
            (ContextState::Loading, ContextState::Loaded) => true,
            // Reload and crash recovery go back through Loading
            (ContextState::Loaded, ContextState::Loading) => true,
            // Teardown is reachable from every live state
            (ContextState::Unloaded, ContextState::TornDown) => true,
            (ContextState::Loading, ContextState::TornDown) => true,
            (ContextState::Loaded, ContextState::TornDown) => true,
            // Same state is always valid (no-op)
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    pub fn is_torn_down(&self) -> bool {
        matches!(self, ContextState::TornDown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextState::Unloaded => "unloaded",
            ContextState::Loading => "loading",
            ContextState::Loaded => "loaded",
            ContextState::TornDown => "torn-down",
        }
    }
}

impl std::fmt::Display for ContextState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
