//! Commit ranges between two revisions.
//!
//! The range `base..tip` is every commit reachable from `tip` and not from
//! `base`, so `base` and its ancestors are excluded. Commits come back in
//! reverse topological order: parents before children, oldest first.

use std::path::Path;

use super::{GitError, GitResult, resolve_commit, run_git_sync};
use crate::types::Sha;

/// Separates fields within one commit record.
const FIELD_SEP: char = '\u{1f}';

/// Terminates a commit record.
const RECORD_SEP: char = '\u{1e}';

/// What a notification shows about one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub sha: Sha,
    pub author_name: String,
    pub author_email: String,
    /// First line of the commit message.
    pub subject: String,
}

impl CommitSummary {
    /// The id shortened to `len` characters.
    pub fn short_id(&self, len: usize) -> &str {
        self.sha.short(len)
    }

    /// Email used to look up the author's avatar.
    ///
    /// Lowercased; when the commit has no email the lowercased author name
    /// stands in for it.
    pub fn avatar_email(&self) -> String {
        if self.author_email.is_empty() {
            self.author_name.to_lowercase()
        } else {
            self.author_email.to_lowercase()
        }
    }

    /// Name shown for the author, falling back to the email.
    pub fn author_display(&self) -> &str {
        if self.author_name.is_empty() {
            &self.author_email
        } else {
            &self.author_name
        }
    }
}

/// Lists the commits in `base..tip`, oldest first.
///
/// Both revisions must resolve to commits, otherwise the result is
/// [`GitError::RevisionNotFound`]. The all-zero id as `base` (a newly created
/// ref) lists all of `tip`'s history. The range is not truncated.
pub fn resolve_commit_range(workdir: &Path, base: &str, tip: &str) -> GitResult<Vec<CommitSummary>> {
    let tip = resolve_commit(workdir, tip)?;
    let exclude = if Sha::new(base).is_zero() {
        None
    } else {
        Some(format!("^{}", resolve_commit(workdir, base)?))
    };

    let format = "--format=%H%x1f%an%x1f%ae%x1f%s%x1e";
    let mut args = vec!["log", "--topo-order", "--reverse", "--no-color", format, tip.as_str()];
    if let Some(exclude) = &exclude {
        args.push(exclude);
    }
    let output = run_git_sync(workdir, &args)?;

    parse_log(&String::from_utf8_lossy(&output.stdout))
}

/// Parses records produced by the `--format` in [`resolve_commit_range`].
fn parse_log(stdout: &str) -> GitResult<Vec<CommitSummary>> {
    stdout
        .split(RECORD_SEP)
        .map(|record| record.trim_matches(|c| c == '\n' || c == '\r'))
        .filter(|record| !record.is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> GitResult<CommitSummary> {
    let mut fields = record.splitn(4, FIELD_SEP);
    let (Some(sha), Some(name), Some(email), Some(subject)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(GitError::UnexpectedOutput(record.to_string()));
    };

    let sha = Sha::parse(sha).map_err(|e| GitError::UnexpectedOutput(e.0))?;
    Ok(CommitSummary {
        sha,
        author_name: name.to_string(),
        author_email: email.to_string(),
        subject: subject.to_string(),
    })
}
