//! Runtime configuration.
//!
//! Settings are read from a TOML file. Every key has a default so an empty
//! file is valid; the only things an operator must supply to get messages
//! delivered are `hipchat.default_room` and `hipchat.default_token`.
//!
//! ```toml
//! [hipchat]
//! default_room = "dev"
//! default_token = "..."
//! use_project_rooms = true
//!
//! [hipchat.room_tokens]
//! dev-mobile = "..."
//!
//! [web]
//! canonical_url = "https://git.example.com"
//!
//! [[bugtraq]]
//! name = "jira"
//! pattern = "(APP-\\d+)"
//! url = "https://jira.example.com/browse/%BUGID%"
//! ```
//!
//! The loaded [`Settings`] are shared through [`SharedSettings`]. Formatters
//! and the notifier take a fresh snapshot per event, so a reload (SIGHUP
//! while serving) applies to the next notification without restarting
//! anything. `server.listen` and `hipchat.max_concurrent_sends` are read once
//! at startup.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;
use thiserror::Error;

/// Default HipChat API root.
pub const DEFAULT_API_URL: &str = "https://api.hipchat.com";

/// Default base URL of the git server's web UI.
pub const DEFAULT_CANONICAL_URL: &str = "https://localhost:8443";

/// Default number of id characters shown for a commit.
const DEFAULT_SHORT_COMMIT_ID_LENGTH: usize = 6;

/// Default length at which commit subjects are truncated.
const DEFAULT_SHORT_LOG_LENGTH: usize = 78;

/// Default number of notifications sent concurrently.
const DEFAULT_MAX_CONCURRENT_SENDS: usize = 4;

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`Settings`].
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// All settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hipchat: HipChatSettings,
    pub web: WebSettings,
    pub bugtraq: Vec<BugtraqSettings>,
    pub server: ServerSettings,
}

/// Where and what to post.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HipChatSettings {
    /// API root; the room notification path is appended to it.
    pub api_url: String,

    /// Room used when a notification names no room, or names one without a token.
    pub default_room: Option<String>,

    /// Token for `default_room`.
    pub default_token: Option<String>,

    /// Per-room tokens, keyed by room name.
    pub room_tokens: BTreeMap<String, String>,

    /// Route repository events to `<default_room>-<project>` rooms.
    pub use_project_rooms: bool,

    /// Post events from personal (`~user`) repositories.
    pub post_personal_repos: bool,

    pub post_tickets: bool,
    pub post_ticket_comments: bool,
    pub post_branches: bool,
    pub post_tags: bool,

    /// Upper bound on concurrent HTTP sends from the async pool.
    pub max_concurrent_sends: usize,
}

impl Default for HipChatSettings {
    fn default() -> Self {
        HipChatSettings {
            api_url: DEFAULT_API_URL.to_string(),
            default_room: None,
            default_token: None,
            room_tokens: BTreeMap::new(),
            use_project_rooms: false,
            post_personal_repos: false,
            post_tickets: true,
            post_ticket_comments: true,
            post_branches: true,
            post_tags: true,
            max_concurrent_sends: DEFAULT_MAX_CONCURRENT_SENDS,
        }
    }
}

impl HipChatSettings {
    /// Configured default room, ignoring empty strings.
    pub fn default_room(&self) -> Option<&str> {
        self.default_room.as_deref().filter(|s| !s.is_empty())
    }

    /// Configured default token, ignoring empty strings.
    pub fn default_token(&self) -> Option<&str> {
        self.default_token.as_deref().filter(|s| !s.is_empty())
    }

    /// Token configured for `room`, ignoring empty strings.
    pub fn room_token(&self, room: &str) -> Option<&str> {
        self.room_tokens
            .get(room)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Links into the git server's web UI.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    pub canonical_url: String,
    pub short_commit_id_length: usize,
    pub short_log_length: usize,
}

impl Default for WebSettings {
    fn default() -> Self {
        WebSettings {
            canonical_url: DEFAULT_CANONICAL_URL.to_string(),
            short_commit_id_length: DEFAULT_SHORT_COMMIT_ID_LENGTH,
            short_log_length: DEFAULT_SHORT_LOG_LENGTH,
        }
    }
}

/// An issue-reference pattern to link in commit messages and ticket text.
#[derive(Debug, Clone, Deserialize)]
pub struct BugtraqSettings {
    pub name: String,

    /// Regex; the first capture group (or the whole match) is the issue id.
    pub pattern: String,

    /// Link template; `%BUGID%` is replaced by the issue id.
    pub url: String,

    /// Repositories the pattern applies to. Empty means all.
    #[serde(default)]
    pub repositories: Vec<String>,
}

/// Event ingress server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen: SocketAddr,

    /// Directory containing the repositories named in events.
    pub repositories_dir: PathBuf,

    /// HMAC secret for signed event submissions. Unset accepts unsigned events.
    pub shared_secret: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            repositories_dir: PathBuf::from("."),
            shared_secret: None,
        }
    }
}

impl Settings {
    /// Parses settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Process-wide settings handle, cheap to clone.
#[derive(Debug, Clone)]
pub struct SharedSettings {
    inner: Arc<ArcSwap<Settings>>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        SharedSettings {
            inner: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }

    /// Current settings snapshot.
    pub fn snapshot(&self) -> Arc<Settings> {
        self.inner.load_full()
    }

    /// Replaces the settings seen by subsequent snapshots.
    pub fn replace(&self, settings: Settings) {
        self.inner.store(Arc::new(settings));
    }

    /// Re-reads `path` and publishes the result.
    ///
    /// On error the current settings stay in place.
    pub fn reload(&self, path: &Path) -> Result<Arc<Settings>, ConfigError> {
        let settings = Settings::load(path)?;
        self.replace(settings);
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.hipchat.api_url, DEFAULT_API_URL);
        assert!(settings.hipchat.post_tickets);
        assert!(settings.hipchat.post_ticket_comments);
        assert!(settings.hipchat.post_branches);
        assert!(settings.hipchat.post_tags);
        assert!(!settings.hipchat.use_project_rooms);
        assert!(!settings.hipchat.post_personal_repos);
        assert_eq!(settings.web.canonical_url, DEFAULT_CANONICAL_URL);
        assert_eq!(settings.web.short_commit_id_length, 6);
        assert_eq!(settings.web.short_log_length, 78);
        assert!(settings.bugtraq.is_empty());
    }

    #[test]
    fn parses_rooms_tokens_and_bugtraq() {
        let text = r#"
            [hipchat]
            default_room = "dev"
            default_token = "t-default"
            post_tags = false

            [hipchat.room_tokens]
            ops = "t-ops"
            empty = ""

            [web]
            canonical_url = "https://git.example.com"

            [[bugtraq]]
            name = "jira"
            pattern = "(APP-\\d+)"
            url = "https://jira.example.com/browse/%BUGID%"
        "#;
        let settings = Settings::from_toml_str(text).unwrap();
        assert_eq!(settings.hipchat.default_room(), Some("dev"));
        assert_eq!(settings.hipchat.default_token(), Some("t-default"));
        assert_eq!(settings.hipchat.room_token("ops"), Some("t-ops"));
        assert_eq!(settings.hipchat.room_token("empty"), None);
        assert_eq!(settings.hipchat.room_token("missing"), None);
        assert!(!settings.hipchat.post_tags);
        assert!(settings.hipchat.post_branches);
        assert_eq!(settings.bugtraq[0].pattern, "(APP-\\d+)");
        assert!(settings.bugtraq[0].repositories.is_empty());
    }

    #[test]
    fn rejects_wrong_types() {
        let err = Settings::from_toml_str("[hipchat]\npost_tags = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn shared_settings_replace_is_visible_to_new_snapshots() {
        let shared = SharedSettings::new(Settings::default());
        let before = shared.snapshot();

        let mut updated = Settings::default();
        updated.hipchat.default_room = Some("ops".into());
        shared.replace(updated);

        assert_eq!(before.hipchat.default_room(), None);
        assert_eq!(shared.snapshot().hipchat.default_room(), Some("ops"));
    }

    #[test]
    fn reload_publishes_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifier.toml");
        std::fs::write(&path, "[hipchat]\ndefault_room = \"dev\"\n").unwrap();
        let shared = SharedSettings::new(Settings::load(&path).unwrap());

        std::fs::write(&path, "[hipchat]\ndefault_room = \"ops\"\n").unwrap();
        let reloaded = shared.reload(&path).unwrap();

        assert_eq!(reloaded.hipchat.default_room(), Some("ops"));
        assert_eq!(shared.snapshot().hipchat.default_room(), Some("ops"));
    }

    #[test]
    fn failed_reload_keeps_current_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifier.toml");
        std::fs::write(&path, "[hipchat]\ndefault_room = \"dev\"\n").unwrap();
        let shared = SharedSettings::new(Settings::load(&path).unwrap());

        std::fs::write(&path, "[hipchat\n").unwrap();
        assert!(matches!(shared.reload(&path), Err(ConfigError::Parse(_))));
        assert_eq!(shared.snapshot().hipchat.default_room(), Some("dev"));
    }
}
