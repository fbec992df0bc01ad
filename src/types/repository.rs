//! Repository and user records supplied by the event producer.

use serde::{Deserialize, Serialize};

/// The repository an event happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryModel {
    /// Repository path as the git server knows it, e.g. `team/app.git`.
    pub name: String,

    /// Project (folder) the repository lives in; empty for the root project.
    #[serde(default)]
    pub project_path: String,

    /// True for repositories in a user's personal namespace (`~user/...`).
    #[serde(default)]
    pub personal: bool,
}

impl RepositoryModel {
    pub fn new(name: impl Into<String>) -> Self {
        RepositoryModel {
            name: name.into(),
            project_path: String::new(),
            personal: false,
        }
    }

    pub fn with_project(mut self, project_path: impl Into<String>) -> Self {
        self.project_path = project_path.into();
        self
    }

    pub fn personal(mut self) -> Self {
        self.personal = true;
        self
    }

    /// Name shown in messages, without a trailing `.git`.
    pub fn display_name(&self) -> &str {
        strip_dot_git(&self.name)
    }
}

/// Removes a trailing `.git` from a repository name.
pub fn strip_dot_git(name: &str) -> &str {
    name.strip_suffix(".git").unwrap_or(name)
}

/// A user who caused an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: String,

    #[serde(default)]
    pub display_name: Option<String>,
}

impl Actor {
    pub fn new(username: impl Into<String>) -> Self {
        Actor {
            username: username.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// The display name, falling back to the username.
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}
