//! Built-in engine catalog
//!
//! Seeded on first run when no persisted catalog exists. Friend-domain
//! patterns cover the federated-login hosts each service bounces through.

use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use crate::engine::Engine;

pub const ACTION_NEW_SESSION: &str = "new-session";
pub const ACTION_TEMPORARY_SESSION: &str = "temporary-session";
pub const ACTION_SHARE: &str = "share";
pub const ACTION_HISTORY: &str = "history";

const GOOGLE_LOGIN_PATTERN: &str = r"^https?://([^/]*\.)?accounts\.google\.com(/|$)";
const APPLE_LOGIN_PATTERN: &str = r"^https?://([^/]*\.)?appleid\.apple\.com(/|$)";

fn seed(name: &str, origin_url: &str, focus_selector: &str) -> Engine {
    let now = Utc::now();
    Engine {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        origin_url: origin_url.to_string(),
        focus_selector: focus_selector.to_string(),
        friend_domains: Vec::new(),
        action_scripts: HashMap::new(),
        activation_shortcut: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn default_engines() -> Vec<Engine> {
    let mut chatgpt = seed("ChatGPT", "https://chat.openai.com", "#prompt-textarea");
    chatgpt.friend_domains = vec![
        GOOGLE_LOGIN_PATTERN.to_string(),
        APPLE_LOGIN_PATTERN.to_string(),
    ];
    chatgpt.set_action_script(
        ACTION_NEW_SESSION,
        r#"document.querySelector('[href="/"]')?.click();"#,
    );
    chatgpt.set_action_script(
        ACTION_SHARE,
        r#"const share = document.querySelector('[aria-label="Share"]');
if (!share) { throw new Error("Share button not found"); }
share.click();"#,
    );

    let mut gemini = seed("Gemini", "https://gemini.google.com", ".textarea");
    gemini.friend_domains = vec![GOOGLE_LOGIN_PATTERN.to_string()];
    gemini.set_action_script(
        ACTION_NEW_SESSION,
        r#"const newChat = document.querySelector('button[aria-label="New chat"]');
if (!newChat || newChat.disabled) { throw new Error("New chat button not found"); }
newChat.click();"#,
    );
    gemini.set_action_script(
        ACTION_HISTORY,
        r#"document.querySelector('button[aria-label="Main menu"]')?.click();"#,
    );

    let mut grok = seed(
        "Grok",
        "https://grok.com",
        "textarea[aria-label='Ask Grok anything'],div[contenteditable=true]",
    );
    grok.friend_domains = vec![
        r"^https?://([^/]*\.)?x\.com(/|$)".to_string(),
        GOOGLE_LOGIN_PATTERN.to_string(),
    ];
    grok.set_action_script(
        ACTION_NEW_SESSION,
        r#"document.querySelector('[href="/"]:not([aria-label="Home page"])')?.click();"#,
    );

    let mut ollama = seed(
        "Ollama",
        "http://localhost:8080",
        "#chat-input[contenteditable='true']",
    );
    ollama.set_action_script(
        ACTION_HISTORY,
        r#"document.querySelector('[aria-label="Toggle Sidebar"]').click();"#,
    );

    let mut google = seed(
        "Google",
        "https://www.google.com",
        "textarea, input[type='search']",
    );
    google.set_action_script(ACTION_NEW_SESSION, r#"window.location = "/";"#);

    vec![chatgpt, gemini, grok, ollama, google]
}
