//! Engine data structure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;
use uuid::Uuid;

use crate::error::EngineError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engine {
    /// Unique identifier
    pub id: String,
    /// Display name shown in the engine selector
    pub name: String,
    /// Origin URL loaded into every session of this engine
    pub origin_url: String,
    /// CSS selector focused after activation; empty means no focus call
    pub focus_selector: String,
    /// Regular expressions for third-party hosts allowed to render in place
    pub friend_domains: Vec<String>,
    /// Automation scripts keyed by action id
    pub action_scripts: HashMap<String, String>,
    /// Optional engine activation shortcut (host-interpreted)
    pub activation_shortcut: Option<String>,
    /// When the engine was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Engine {
    pub fn new(name: impl Into<String>, origin_url: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let origin_url = origin_url.into();

        if name.trim().is_empty() {
            return Err(EngineError::EmptyName);
        }
        if origin_url.trim().is_empty() {
            return Err(EngineError::InvalidOrigin("URL cannot be empty".to_string()));
        }

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            origin_url,
            focus_selector: String::new(),
            friend_domains: Vec::new(),
            action_scripts: HashMap::new(),
            activation_shortcut: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Parsed origin. Engines are stored as raw strings so a stale or
    /// mistyped configuration never blocks loading the catalog; activation
    /// surfaces the error instead.
    pub fn origin(&self) -> Result<Url> {
        Url::parse(&self.origin_url).map_err(|e| EngineError::InvalidOrigin(e.to_string()))
    }

    pub fn rename(&mut self, name: String) -> Result<()> {
        if name.trim().is_empty() {
            return Err(EngineError::EmptyName);
        }
        self.name = name;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_focus_selector(&mut self, selector: String) {
        self.focus_selector = selector;
        self.updated_at = Utc::now();
    }

    pub fn add_friend_domain(&mut self, pattern: String) {
        if !self.friend_domains.contains(&pattern) {
            self.friend_domains.push(pattern);
            self.updated_at = Utc::now();
        }
    }

    pub fn set_action_script(&mut self, action: impl Into<String>, script: impl Into<String>) {
        self.action_scripts.insert(action.into(), script.into());
        self.updated_at = Utc::now();
    }

    pub fn action_script(&self, action: &str) -> Option<&str> {
        self.action_scripts.get(action).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_engine() {
        let engine = Engine::new("ChatGPT", "https://chat.openai.com").unwrap();
        assert_eq!(engine.name, "ChatGPT");
        assert!(engine.friend_domains.is_empty());
        assert!(engine.origin().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            Engine::new("  ", "https://example.com"),
            Err(EngineError::EmptyName)
        ));
    }

    #[test]
    fn test_invalid_origin_surfaces_on_parse() {
        let engine = Engine::new("Broken", "not a url").unwrap();
        assert!(matches!(engine.origin(), Err(EngineError::InvalidOrigin(_))));
    }

    #[test]
    fn test_action_scripts() {
        let mut engine = Engine::new("X", "https://x.com").unwrap();
        engine.set_action_script("share", "document.querySelector('[aria-label=Share]').click();");
        assert!(engine.action_script("share").is_some());
        assert!(engine.action_script("history").is_none());
    }
}
