//! Newtype wrappers for identifiers that flow through notifications.
//!
//! These keep commit ids and ref names from being confused with the other
//! strings (room names, tokens, display names) that a message is built from.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Prefix of branch refs.
pub const R_HEADS: &str = "refs/heads/";

/// Prefix of tag refs.
pub const R_TAGS: &str = "refs/tags/";

/// Prefix of remote-tracking refs.
pub const R_REMOTES: &str = "refs/remotes/";

/// Error returned when a string is not a full 40-character hex object id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid SHA: {0:?}")]
pub struct InvalidSha(pub String);

/// A git object id (40 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha(String);

impl Sha {
    /// Creates a new Sha without validating it.
    ///
    /// Event producers hand us ids they already resolved, so this is the
    /// usual constructor. Use [`Sha::parse`] for untrusted input.
    pub fn new(s: impl Into<String>) -> Self {
        Sha(s.into())
    }

    /// Parses a full, lowercase-normalised object id.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, InvalidSha> {
        let s = s.as_ref().trim();
        if s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Sha(s.to_ascii_lowercase()))
        } else {
            Err(InvalidSha(s.to_string()))
        }
    }

    /// The all-zero id git uses for "no object" on create and delete.
    pub fn zero() -> Self {
        Sha("0".repeat(40))
    }

    /// Returns true for the all-zero id.
    pub fn is_zero(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b == b'0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first `len` characters for display.
    pub fn short(&self, len: usize) -> &str {
        // get() instead of slicing: ids built with Sha::new are not validated.
        self.0.get(..len).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Sha {
    fn from(s: &str) -> Self {
        Sha(s.to_string())
    }
}

impl From<String> for Sha {
    fn from(s: String) -> Self {
        Sha(s)
    }
}

/// The namespaces of refs that produce notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Branch,
    Tag,
}

impl RefKind {
    /// Lowercase noun used in messages ("branch", "tag").
    pub fn as_str(&self) -> &'static str {
        match self {
            RefKind::Branch => "branch",
            RefKind::Tag => "tag",
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully qualified ref name such as `refs/heads/main`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefName(String);

impl RefName {
    pub fn new(s: impl Into<String>) -> Self {
        RefName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classifies the ref; `None` for namespaces other than heads and tags.
    pub fn kind(&self) -> Option<RefKind> {
        if self.0.starts_with(R_TAGS) {
            Some(RefKind::Tag)
        } else if self.0.starts_with(R_HEADS) {
            Some(RefKind::Branch)
        } else {
            None
        }
    }

    /// The ref name without its `refs/heads/`, `refs/tags/` or
    /// `refs/remotes/` prefix.
    pub fn short_name(&self) -> &str {
        [R_HEADS, R_TAGS, R_REMOTES]
            .iter()
            .find_map(|prefix| self.0.strip_prefix(prefix))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RefName {
    fn from(s: &str) -> Self {
        RefName(s.to_string())
    }
}
