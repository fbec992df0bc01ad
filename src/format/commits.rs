//! The abbreviated commit list shared by push and patchset messages.

use std::fmt::Write as _;

use tracing::error;

use super::links::{LinkBuilder, gravatar_url};
use super::markup::{escape_html, trim_string};
use crate::git::{CommitSummary, RevisionHistory};
use crate::types::Sha;

/// Rows shown before the list is summarised.
pub const MAX_COMMITS: usize = 5;

/// Display parameters for a commit table.
#[derive(Debug, Clone)]
pub struct CommitTable<'a> {
    pub links: &'a LinkBuilder,
    /// Repository name as used in links.
    pub repo: &'a str,
    pub short_id_len: usize,
    pub short_log_len: usize,
}

impl CommitTable<'_> {
    /// Appends up to [`MAX_COMMITS`] rows for `commits`, then a compare link
    /// for `base..tip` when the range holds more than one commit.
    pub fn render(&self, out: &mut String, commits: &[CommitSummary], base: &Sha, tip: &Sha) {
        if commits.is_empty() {
            return;
        }

        out.push_str("\n<table><tbody>\n");
        for commit in commits.iter().take(MAX_COMMITS) {
            self.render_row(out, commit);
        }
        out.push_str("</tbody></table>");

        if let Some(text) = compare_text(commits.len()) {
            let url = self.links.compare(self.repo, base.as_str(), tip.as_str());
            let _ = write!(out, "<a href=\"{}\">{}</a>", url, text);
        }
    }

    fn render_row(&self, out: &mut String, commit: &CommitSummary) {
        let avatar = gravatar_url(&commit.avatar_email());
        let commit_url = self.links.commit(self.repo, commit.sha.as_str());
        let subject = escape_html(&trim_string(&commit.subject, self.short_log_len));
        let _ = writeln!(
            out,
            "<tr><td><img src=\"{}\" title=\"{}\"/></td><td><pre><a href=\"{}\">{}</a></pre></td><td>{}</td></tr>",
            avatar,
            escape_html(commit.author_display()),
            commit_url,
            commit.short_id(self.short_id_len),
            subject
        );
    }
}

/// Commits in `base..tip`, or none when the range cannot be resolved.
pub fn load_commits(history: &dyn RevisionHistory, repo: &str, base: &Sha, tip: &Sha) -> Vec<CommitSummary> {
    match history.commits_between(base, tip) {
        Ok(commits) => commits,
        Err(e) => {
            error!(repository = %repo, base = %base, tip = %tip, error = %e, "Failed to list commits");
            Vec::new()
        }
    }
}

/// Text of the compare link for a range of `count` commits.
///
/// A single commit has nothing to compare; past [`MAX_COMMITS`] the link
/// names the rows that were left out.
pub fn compare_text(count: usize) -> Option<String> {
    match count {
        0 | 1 => None,
        n if n > MAX_COMMITS => {
            let more = n - MAX_COMMITS;
            Some(format!("{} more {}", more, commits_noun(more)))
        }
        n => Some(format!("view comparison of these {} commits", n)),
    }
}

/// "commit" or "commits".
pub fn commits_noun(count: usize) -> &'static str {
    if count == 1 { "commit" } else { "commits" }
}
