//! Links into the git server's web UI.

use sha2::{Digest, Sha256};
use url::form_urlencoded::byte_serialize;

/// Size in pixels of commit-table avatars.
const AVATAR_SIZE: u32 = 16;

/// Builds web UI URLs relative to the canonical base URL.
///
/// Query values are percent-encoded, so the URLs can be written into an
/// HTML attribute as they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    base: String,
}

impl LinkBuilder {
    pub fn new(canonical_url: &str) -> Self {
        LinkBuilder {
            base: canonical_url.trim_end_matches('/').to_string(),
        }
    }

    /// Picks the page from which ids are known:
    ///
    /// | old  | new  | page    |
    /// |------|------|---------|
    /// | -    | -    | summary |
    /// | old  | -    | log     |
    /// | -    | new  | commit  |
    /// | old  | new  | compare |
    pub fn url(&self, repo: &str, old: Option<&str>, new: Option<&str>) -> String {
        let repo = encode(repo);
        match (old, new) {
            (None, None) => format!("{}/summary?r={}", self.base, repo),
            (Some(old), None) => format!("{}/log?r={}&h={}", self.base, repo, encode(old)),
            (None, Some(new)) => format!("{}/commit?r={}&h={}", self.base, repo, encode(new)),
            (Some(old), Some(new)) => format!(
                "{}/compare?r={}&h={}..{}",
                self.base,
                repo,
                encode(old),
                encode(new)
            ),
        }
    }

    pub fn summary(&self, repo: &str) -> String {
        self.url(repo, None, None)
    }

    pub fn log(&self, repo: &str, rev: &str) -> String {
        self.url(repo, Some(rev), None)
    }

    pub fn commit(&self, repo: &str, id: &str) -> String {
        self.url(repo, None, Some(id))
    }

    pub fn compare(&self, repo: &str, old: &str, new: &str) -> String {
        self.url(repo, Some(old), Some(new))
    }

    pub fn ticket(&self, repo: &str, number: u64) -> String {
        format!("{}/tickets?r={}&h={}", self.base, encode(repo), number)
    }
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// Avatar thumbnail for an email address.
pub fn gravatar_url(email: &str) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{}?s={}&d=identicon",
        hex::encode(digest),
        AVATAR_SIZE
    )
}
