//! Supported chat platforms.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A chat platform ReplyKit knows how to read from and write to.
///
/// The set is closed on purpose: every platform carries hand-tuned DOM
/// heuristics, so "supporting" one is a code change, not configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    WhatsApp,
    Slack,
    LinkedIn,
    Fiverr,
}

impl Platform {
    /// All platforms in dispatch order. URL matching tries these in order
    /// and the first match wins.
    pub const ALL: [Platform; 4] = [
        Platform::WhatsApp,
        Platform::Slack,
        Platform::LinkedIn,
        Platform::Fiverr,
    ];

    /// Stable lowercase identifier used in storage keys and remote
    /// configuration rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::WhatsApp => "whatsapp",
            Platform::Slack => "slack",
            Platform::LinkedIn => "linkedin",
            Platform::Fiverr => "fiverr",
        }
    }

    /// Parse a stored identifier back into a platform.
    pub fn from_key(key: &str) -> Option<Platform> {
        match key {
            "whatsapp" => Some(Platform::WhatsApp),
            "slack" => Some(Platform::Slack),
            "linkedin" => Some(Platform::LinkedIn),
            "fiverr" => Some(Platform::Fiverr),
            _ => None,
        }
    }

    /// Whether the given page URL belongs to this platform.
    ///
    /// Pure substring predicate; safe to call repeatedly before the page
    /// has finished loading.
    pub fn url_matches(&self, url: &str) -> bool {
        match self {
            Platform::WhatsApp => url.contains("web.whatsapp.com"),
            Platform::Slack => url.contains("app.slack.com") || url.contains("slack.com/client"),
            Platform::LinkedIn => url.contains("linkedin.com"),
            Platform::Fiverr => url.contains("fiverr.com"),
        }
    }

    /// Display name used for the other party when the page header cannot
    /// be resolved.
    pub fn fallback_sender(&self) -> &'static str {
        match self {
            Platform::WhatsApp | Platform::Fiverr => "Client",
            Platform::Slack => "Colleague",
            Platform::LinkedIn => "Contact",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(Platform::from_key(platform.as_str()), Some(platform));
        }
    }

    #[test]
    fn test_from_key_unknown() {
        assert_eq!(Platform::from_key("telegram"), None);
        assert_eq!(Platform::from_key(""), None);
    }

    #[test]
    fn test_url_matches_whatsapp() {
        assert!(Platform::WhatsApp.url_matches("https://web.whatsapp.com/"));
        assert!(!Platform::WhatsApp.url_matches("https://www.whatsapp.com/download"));
    }

    #[test]
    fn test_url_matches_slack() {
        assert!(Platform::Slack.url_matches("https://app.slack.com/client/T123/C456"));
        assert!(Platform::Slack.url_matches("https://myteam.slack.com/client/T123"));
        assert!(!Platform::Slack.url_matches("https://slack.com/intl/pricing"));
    }

    #[test]
    fn test_url_matches_linkedin_and_fiverr() {
        assert!(Platform::LinkedIn.url_matches("https://www.linkedin.com/messaging/"));
        assert!(Platform::Fiverr.url_matches("https://www.fiverr.com/inbox/buyer"));
        assert!(!Platform::Fiverr.url_matches("https://www.linkedin.com/feed"));
    }

    #[test]
    fn test_fallback_sender() {
        assert_eq!(Platform::WhatsApp.fallback_sender(), "Client");
        assert_eq!(Platform::Slack.fallback_sender(), "Colleague");
        assert_eq!(Platform::LinkedIn.fallback_sender(), "Contact");
        assert_eq!(Platform::Fiverr.fallback_sender(), "Client");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Platform::WhatsApp).unwrap();
        assert_eq!(json, "\"whatsapp\"");
        let back: Platform = serde_json::from_str("\"linkedin\"").unwrap();
        assert_eq!(back, Platform::LinkedIn);
    }
}
