//! Shared test fixtures: scratch git repositories, an in-memory history,
//! a recording notification sink and proptest generators.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;
use tempfile::TempDir;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::config::Settings;
use crate::git::{CommitSummary, GitError, GitResult, RevisionHistory, run_git_stdout, run_git_sync};
use crate::hooks::NotificationSink;
use crate::types::{Actor, Notification, RepositoryModel, Sha};

/// A scratch repository on `main`, deleted on drop.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        run(dir.path(), &["init", "-q"]);
        run(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        TestRepo { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Runs git, panicking on failure.
pub fn run(dir: &Path, args: &[&str]) {
    run_git_sync(dir, args).unwrap();
}

/// Creates an empty commit authored by the test identity.
pub fn commit(dir: &Path, message: &str) -> Sha {
    commit_as(dir, message, "Test", "test@test.com")
}

/// Creates an empty commit with the given author.
pub fn commit_as(dir: &Path, message: &str, name: &str, email: &str) -> Sha {
    let name_cfg = format!("user.name={name}");
    let email_cfg = format!("user.email={email}");
    run(
        dir,
        &["-c", &name_cfg, "-c", &email_cfg, "commit", "-q", "--allow-empty", "-m", message],
    );
    Sha::parse(run_git_stdout(dir, &["rev-parse", "HEAD"]).unwrap()).unwrap()
}

/// Builds a summary for `n` with a predictable id.
pub fn summary(n: usize) -> CommitSummary {
    CommitSummary {
        sha: Sha::new(format!("{:040x}", n + 1)),
        author_name: format!("Author {n}"),
        author_email: format!("author{n}@example.com"),
        subject: format!("Commit number {n}"),
    }
}

/// In-memory history keyed by `(base, tip)`.
///
/// Unknown pairs behave like a missing revision.
#[derive(Default)]
pub struct FakeHistory {
    ranges: HashMap<(Sha, Sha), Vec<CommitSummary>>,
    calls: RefCell<Vec<(Sha, Sha)>>,
}

impl FakeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, base: &Sha, tip: &Sha, commits: Vec<CommitSummary>) -> Self {
        self.ranges.insert((base.clone(), tip.clone()), commits);
        self
    }

    /// `(base, tip)` pairs queried so far.
    pub fn calls(&self) -> Vec<(Sha, Sha)> {
        self.calls.borrow().clone()
    }
}

impl RevisionHistory for FakeHistory {
    fn commits_between(&self, base: &Sha, tip: &Sha) -> GitResult<Vec<CommitSummary>> {
        self.calls.borrow_mut().push((base.clone(), tip.clone()));
        self.ranges
            .get(&(base.clone(), tip.clone()))
            .cloned()
            .ok_or_else(|| GitError::RevisionNotFound(tip.to_string()))
    }
}

/// Settings with a default room and token.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.hipchat.default_room = Some("dev".into());
    settings.hipchat.default_token = Some("t-default".into());
    settings.web.canonical_url = "https://git.example.com".into();
    settings
}

pub fn test_repository() -> RepositoryModel {
    RepositoryModel::new("team/app.git").with_project("team")
}

pub fn test_actor() -> Actor {
    Actor::new("jdoe").with_display_name("Jane Doe")
}

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(|s| Sha::parse(s).unwrap())
}

pub fn arb_commit_summary() -> impl Strategy<Value = CommitSummary> {
    (
        arb_sha(),
        "[A-Za-z ]{0,20}",
        "[a-z]{1,8}@[a-z]{1,8}\\.com",
        "[ -~]{0,120}",
    )
        .prop_map(|(sha, author_name, author_email, subject)| CommitSummary {
            sha,
            author_name,
            author_email,
            subject,
        })
}

/// Counts WARN events.
struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Runs `f` and returns its result with the number of warnings it logged.
pub fn count_warnings<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(count.clone()));
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, count.load(Ordering::SeqCst))
}

/// Collects submitted notifications instead of sending them.
#[derive(Default)]
pub struct RecordingSink(Mutex<Vec<Notification>>);

impl RecordingSink {
    /// Removes and returns everything submitted so far.
    pub fn taken(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl NotificationSink for RecordingSink {
    fn submit(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}
