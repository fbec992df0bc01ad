//! Read-only access to repository history.
//!
//! Formatters only need one thing from a repository: the commits a push or
//! patchset introduced. That is the [`RevisionHistory`] trait. The real
//! implementation, [`GitRepository`], shells out to the `git` binary with a
//! clean environment so results do not depend on the host's git config.

mod range;

use std::path::{Path, PathBuf};
use std::process::Output;

use thiserror::Error;

use crate::types::Sha;

pub use range::{CommitSummary, resolve_commit_range};

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A revision did not resolve to a commit.
    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    /// Git command failed.
    #[error("git command failed: {command}\nstderr: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// Git printed something we could not parse.
    #[error("unexpected git output: {0}")]
    UnexpectedOutput(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Commit history a formatter can query.
pub trait RevisionHistory {
    /// Commits reachable from `tip` but not from `base`, oldest first.
    fn commits_between(&self, base: &Sha, tip: &Sha) -> GitResult<Vec<CommitSummary>>;
}

/// A repository on local disk (bare or with a worktree).
#[derive(Debug, Clone)]
pub struct GitRepository {
    path: PathBuf,
}

impl GitRepository {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        GitRepository { path: path.into() }
    }
}

impl RevisionHistory for GitRepository {
    fn commits_between(&self, base: &Sha, tip: &Sha) -> GitResult<Vec<CommitSummary>> {
        resolve_commit_range(&self.path, base.as_str(), tip.as_str())
    }
}

/// Create a git Command with clean environment (no system/user config).
///
/// This ensures consistent behavior across different machines by ignoring
/// system and user git configuration (e.g., aliases, log formats, pagers).
pub(crate) fn git_command(workdir: &Path) -> std::process::Command {
    use std::process::Command;

    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);

    cmd.env("GIT_CONFIG_NOSYSTEM", "1");
    cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
    cmd.env("GIT_TERMINAL_PROMPT", "0");

    cmd
}

/// Run a git command in the given working directory.
///
/// Returns the command output on success, or a GitError on failure.
pub fn run_git_sync(workdir: &Path, args: &[&str]) -> GitResult<Output> {
    let output = git_command(workdir).args(args).output()?;

    if output.status.success() {
        Ok(output)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let command = format!("git {}", args.join(" "));
        Err(GitError::CommandFailed { command, stderr })
    }
}

/// Run a git command and return stdout as a string.
pub fn run_git_stdout(workdir: &Path, args: &[&str]) -> GitResult<String> {
    let output = run_git_sync(workdir, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Resolve a revision to the id of the commit it names.
///
/// Returns [`GitError::RevisionNotFound`] when the revision does not exist or
/// names something other than a commit.
pub fn resolve_commit(workdir: &Path, rev: &str) -> GitResult<Sha> {
    if rev.is_empty() || rev.starts_with('-') {
        return Err(GitError::RevisionNotFound(rev.to_string()));
    }

    let spec = format!("{}^{{commit}}", rev);
    let output = git_command(workdir)
        .args(["rev-parse", "--verify", "--quiet", &spec])
        .output()?;

    // --verify --quiet exits 1 without output for unknown revisions; any
    // other failure (not a repository, bad path) is a command failure.
    match output.status.code() {
        Some(0) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            Sha::parse(stdout.trim()).map_err(|e| GitError::UnexpectedOutput(e.0))
        }
        Some(1) if output.stderr.is_empty() => Err(GitError::RevisionNotFound(rev.to_string())),
        _ => Err(GitError::CommandFailed {
            command: format!("git rev-parse --verify --quiet {}", spec),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }),
    }
}
