//! Navigation policy
//!
//! One decision method per interception point: outgoing navigation,
//! new-window request, response disposition, download destination. The
//! pool injects exactly one policy instance per browsing context.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::classifier::LinkClassifier;

/// What happens to a classified target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Disposition {
    /// Render in the originating context
    RenderInPlace,
    /// A popup target that renders in the originating context; no new
    /// context handle is ever returned to the source page
    RenderInPlaceNewContext,
    /// Cancel in place and open with the system browser
    HandToSystemBrowser,
    /// Intercept and stream to the downloads directory
    Download,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::RenderInPlace => "render-in-place",
            Disposition::RenderInPlaceNewContext => "render-in-place-new-context",
            Disposition::HandToSystemBrowser => "hand-to-system-browser",
            Disposition::Download => "download",
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a navigation was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// The user activated a link
    LinkActivated,
    /// Anything else: redirects, form submissions, script navigation
    Other,
}

/// An outgoing navigation event
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    pub url: Url,
    pub kind: NavigationKind,
    pub is_main_frame: bool,
    /// The platform pre-flagged this request as a download
    pub download_hint: bool,
}

impl NavigationRequest {
    pub fn link(url: Url) -> Self {
        Self {
            url,
            kind: NavigationKind::LinkActivated,
            is_main_frame: true,
            download_hint: false,
        }
    }
}

/// A received response awaiting a render/download decision
#[derive(Debug, Clone)]
pub struct NavigationResponse {
    pub url: Url,
    /// Whether the surface can display the response's content type inline
    pub can_show_inline: bool,
    /// Server-suggested filename, when provided
    pub suggested_filename: Option<String>,
}

pub trait NavigationPolicy: Send + Sync {
    /// Decide an outgoing navigation in the main or a child frame
    fn decide_navigation(&self, request: &NavigationRequest) -> Disposition;

    /// Decide a new-window/popup request
    fn decide_new_window(&self, target: &Url) -> Disposition;

    /// Decide what to do with a received response
    fn decide_response(&self, response: &NavigationResponse) -> Disposition;

    /// Destination path for an intercepted download; an existing file of
    /// the same name is overwritten by the transfer
    fn download_destination(&self, suggested_filename: &str) -> PathBuf;
}

/// Policy for one engine's contexts
pub struct EnginePolicy {
    classifier: LinkClassifier,
    downloads_dir: PathBuf,
}

impl EnginePolicy {
    pub fn new(origin: Url, friend_patterns: &[String], downloads_dir: PathBuf) -> Self {
        Self {
            classifier: LinkClassifier::new(origin, friend_patterns),
            downloads_dir,
        }
    }

    fn is_web_scheme(url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }
}

impl NavigationPolicy for EnginePolicy {
    fn decide_navigation(&self, request: &NavigationRequest) -> Disposition {
        if request.download_hint {
            return Disposition::Download;
        }

        if !Self::is_web_scheme(&request.url) {
            return Disposition::HandToSystemBrowser;
        }

        if self.classifier.is_internal(&request.url) {
            return Disposition::RenderInPlace;
        }

        if request.kind == NavigationKind::LinkActivated && request.is_main_frame {
            return Disposition::HandToSystemBrowser;
        }

        // External but not a user-activated main-frame link: redirects and
        // subframe loads stay in place.
        Disposition::RenderInPlace
    }

    fn decide_new_window(&self, target: &Url) -> Disposition {
        if !Self::is_web_scheme(target) {
            return Disposition::HandToSystemBrowser;
        }

        if self.classifier.is_internal(target) {
            Disposition::RenderInPlaceNewContext
        } else {
            Disposition::HandToSystemBrowser
        }
    }

    fn decide_response(&self, response: &NavigationResponse) -> Disposition {
        if response.can_show_inline {
            Disposition::RenderInPlace
        } else {
            Disposition::Download
        }
    }

    fn download_destination(&self, suggested_filename: &str) -> PathBuf {
        self.downloads_dir.join(sanitize_file_name(suggested_filename))
    }
}

fn sanitize_file_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download")
        .trim();

    if name.is_empty() {
        "download".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(origin: &str, patterns: &[&str]) -> EnginePolicy {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        EnginePolicy::new(
            Url::parse(origin).unwrap(),
            &patterns,
            PathBuf::from("/downloads"),
        )
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_download_hint_wins() {
        let p = policy("https://chat.openai.com", &[]);
        let mut request = NavigationRequest::link(url("https://chat.openai.com/export.zip"));
        request.download_hint = true;
        assert_eq!(p.decide_navigation(&request), Disposition::Download);
    }

    #[test]
    fn test_non_web_scheme_hands_off() {
        let p = policy("https://chat.openai.com", &[]);
        let request = NavigationRequest::link(url("mailto:someone@example.com"));
        assert_eq!(
            p.decide_navigation(&request),
            Disposition::HandToSystemBrowser
        );
    }

    #[test]
    fn test_external_link_hands_off_internal_renders() {
        let p = policy("https://chat.openai.com", &[]);

        let internal = NavigationRequest::link(url("https://chat.openai.com/c/1"));
        assert_eq!(p.decide_navigation(&internal), Disposition::RenderInPlace);

        let external = NavigationRequest::link(url("https://example.com"));
        assert_eq!(
            p.decide_navigation(&external),
            Disposition::HandToSystemBrowser
        );
    }

    #[test]
    fn test_external_subframe_renders_in_place() {
        let p = policy("https://chat.openai.com", &[]);
        let request = NavigationRequest {
            url: url("https://cdn.example.com/widget"),
            kind: NavigationKind::LinkActivated,
            is_main_frame: false,
            download_hint: false,
        };
        assert_eq!(p.decide_navigation(&request), Disposition::RenderInPlace);
    }

    #[test]
    fn test_external_redirect_renders_in_place() {
        let p = policy("https://chat.openai.com", &[]);
        let request = NavigationRequest {
            url: url("https://auth.example.com/callback"),
            kind: NavigationKind::Other,
            is_main_frame: true,
            download_hint: false,
        };
        assert_eq!(p.decide_navigation(&request), Disposition::RenderInPlace);
    }

    #[test]
    fn test_new_window_friend_renders_in_existing_context() {
        let p = policy(
            "https://chat.openai.com",
            &[r"^https?://([^/]*\.)?accounts\.google\.com(/|$)"],
        );
        assert_eq!(
            p.decide_new_window(&url("https://accounts.google.com/signin")),
            Disposition::RenderInPlaceNewContext
        );
        assert_eq!(
            p.decide_new_window(&url("https://example.com/popup")),
            Disposition::HandToSystemBrowser
        );
    }

    #[test]
    fn test_response_disposition() {
        let p = policy("https://chat.openai.com", &[]);

        let inline = NavigationResponse {
            url: url("https://chat.openai.com/page"),
            can_show_inline: true,
            suggested_filename: None,
        };
        assert_eq!(p.decide_response(&inline), Disposition::RenderInPlace);

        let attachment = NavigationResponse {
            url: url("https://chat.openai.com/export"),
            can_show_inline: false,
            suggested_filename: Some("conversation.zip".to_string()),
        };
        assert_eq!(p.decide_response(&attachment), Disposition::Download);
    }

    #[test]
    fn test_download_destination_uses_suggested_name() {
        let p = policy("https://chat.openai.com", &[]);
        assert_eq!(
            p.download_destination("report.pdf"),
            PathBuf::from("/downloads/report.pdf")
        );
        // Path components in the suggestion never escape the directory
        assert_eq!(
            p.download_destination("../../etc/passwd"),
            PathBuf::from("/downloads/passwd")
        );
        assert_eq!(
            p.download_destination(""),
            PathBuf::from("/downloads/download")
        );
    }
}
