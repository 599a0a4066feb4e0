//! Link classification
//!
//! A target is internal when it stays on the engine's host, on the
//! engine's apex domain (leading "www." stripped) or a subdomain of it, or
//! when it matches one of the engine's friend-domain patterns. Apex
//! matching is checked before the patterns, so a pattern can only ever
//! widen the internal set, never downgrade an apex match.

use regex::{Regex, RegexBuilder};
use url::Url;

pub struct LinkClassifier {
    origin: Url,
    friend_patterns: Vec<Regex>,
}

impl LinkClassifier {
    /// Compile the friend-domain patterns; a malformed pattern is skipped
    /// and classification proceeds with the remaining rules.
    pub fn new(origin: Url, friend_patterns: &[String]) -> Self {
        let compiled = friend_patterns
            .iter()
            .filter_map(|pattern| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        tracing::warn!(
                            pattern = %pattern,
                            error = %e,
                            "Skipping malformed friend-domain pattern"
                        );
                        None
                    }
                }
            })
            .collect();

        Self {
            origin,
            friend_patterns: compiled,
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn is_internal(&self, target: &Url) -> bool {
        let target_host = target.host_str().map(|h| h.to_lowercase());
        let origin_host = self.origin.host_str().map(|h| h.to_lowercase());

        match (&target_host, &origin_host) {
            (Some(t_host), Some(s_host)) => {
                if t_host == s_host {
                    return true;
                }

                let apex = s_host.strip_prefix("www.").unwrap_or(s_host);
                if t_host == apex || t_host.ends_with(&format!(".{apex}")) {
                    return true;
                }
            }
            _ => {
                // Hostless origins (file/data fixtures) match on scheme
                if target.scheme() == self.origin.scheme()
                    && matches!(target.scheme(), "file" | "data")
                {
                    return true;
                }
            }
        }

        let target_str = target.as_str();
        self.friend_patterns.iter().any(|re| re.is_match(target_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(origin: &str, patterns: &[&str]) -> LinkClassifier {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        LinkClassifier::new(Url::parse(origin).unwrap(), &patterns)
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_host_is_internal() {
        let c = classifier("https://chat.openai.com", &[]);
        assert!(c.is_internal(&url("https://chat.openai.com/c/123")));
        assert!(c.is_internal(&url("https://CHAT.OPENAI.COM/settings")));
    }

    #[test]
    fn test_apex_and_subdomains_are_internal() {
        let c = classifier("https://www.google.com", &[]);
        assert!(c.is_internal(&url("https://google.com")));
        assert!(c.is_internal(&url("https://mail.google.com")));
        assert!(c.is_internal(&url("https://accounts.google.com/signin")));
    }

    #[test]
    fn test_suffix_without_dot_is_external() {
        let c = classifier("https://x.com", &[]);
        // "notx.com" must not pass the subdomain check
        assert!(!c.is_internal(&url("https://notx.com")));
        assert!(c.is_internal(&url("https://api.x.com")));
    }

    #[test]
    fn test_friend_pattern_first_match_wins() {
        let c = classifier(
            "https://grok.com",
            &[
                r"^https?://([^/]*\.)?x\.com(/|$)",
                r"^https?://([^/]*\.)?accounts\.google\.com(/|$)",
            ],
        );
        assert!(c.is_internal(&url("https://x.com/login")));
        assert!(c.is_internal(&url("https://accounts.google.com/o/oauth2")));
        assert!(!c.is_internal(&url("https://example.com")));
    }

    #[test]
    fn test_internal_regardless_of_patterns() {
        // Host/apex matching is checked before patterns, so a pattern set
        // can never turn a first-party target external.
        let c = classifier("https://www.example.com", &[r"^https://only\.this\.host/"]);
        assert!(c.is_internal(&url("https://www.example.com/page")));
        assert!(c.is_internal(&url("https://sub.example.com/page")));
    }

    #[test]
    fn test_malformed_pattern_is_skipped() {
        let c = classifier(
            "https://grok.com",
            &[r"([unclosed", r"^https?://([^/]*\.)?x\.com(/|$)"],
        );
        // The broken pattern is dropped; the valid one still applies
        assert!(c.is_internal(&url("https://x.com/login")));
        assert!(!c.is_internal(&url("https://example.com")));
    }

    #[test]
    fn test_data_fixture_origin_matches_on_scheme() {
        let c = classifier("data:text/html,engine", &[]);
        assert!(c.is_internal(&url("data:text/html,subpage")));
        assert!(!c.is_internal(&url("https://example.com")));
    }
}
