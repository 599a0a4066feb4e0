//! Find bar wire types

use serde::{Deserialize, Serialize};

/// A search request from the host find bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindRequest {
    pub query: String,
    /// Step direction; Enter steps forward, Shift+Enter backward
    pub forward: bool,
    /// Discard cached ranges and re-search even for an unchanged query
    pub reset: bool,
}

impl FindRequest {
    pub fn forward(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            forward: true,
            reset: false,
        }
    }

    pub fn backward(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            forward: false,
            reset: false,
        }
    }

    /// A fresh search, as fired after the typing debounce
    pub fn fresh(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            forward: true,
            reset: true,
        }
    }
}

/// Result of one search step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindResponse {
    pub has_match: bool,
    /// 1-based ordinal of the active match; 0 means none
    pub current: usize,
    pub total: usize,
}

impl FindResponse {
    pub const NONE: FindResponse = FindResponse {
        has_match: false,
        current: 0,
        total: 0,
    };
}
