//! Messages for accepted ref updates.

use super::commits::{CommitTable, load_commits};
use super::links::LinkBuilder;
use super::markup::escape_html;
use crate::config::Settings;
use crate::git::RevisionHistory;
use crate::notify::project_room;
use crate::types::{
    Actor, Color, CommandKind, Notification, RefKind, RefUpdate, RepositoryModel,
};

/// Formats one ref update of a push.
///
/// Returns `None` for refs outside `refs/heads/` and `refs/tags/`, and for
/// branches or tags when posting them is disabled.
pub fn format_ref_update(
    settings: &Settings,
    repository: &RepositoryModel,
    pusher: &Actor,
    update: &RefUpdate,
    history: &dyn RevisionHistory,
) -> Option<Notification> {
    let kind = update.ref_name.kind()?;
    let posted = match kind {
        RefKind::Branch => settings.hipchat.post_branches,
        RefKind::Tag => settings.hipchat.post_tags,
    };
    if !posted {
        return None;
    }

    let push = PushMessage {
        settings,
        links: LinkBuilder::new(&settings.web.canonical_url),
        repository,
        user: escape_html(pusher.display_name()),
        short_ref: escape_html(update.ref_name.short_name()),
        ref_target: update.ref_name.short_name(),
        kind,
    };

    let body = match update.kind {
        CommandKind::Create => push.created(),
        CommandKind::Update => push.updated(update, history, true),
        CommandKind::UpdateNonFastForward => push.updated(update, history, false),
        CommandKind::Delete => push.deleted(),
    };

    Some(
        Notification::html(body)
            .with_color(Color::Gray)
            .with_room(project_room(&settings.hipchat, repository)),
    )
}

struct PushMessage<'a> {
    settings: &'a Settings,
    links: LinkBuilder,
    repository: &'a RepositoryModel,
    user: String,
    /// Escaped for display.
    short_ref: String,
    /// Unescaped, for link targets.
    ref_target: &'a str,
    kind: RefKind,
}

impl PushMessage<'_> {
    fn repo(&self) -> &str {
        &self.repository.name
    }

    fn repo_link(&self) -> String {
        format!(
            "<a href=\"{}\">{}</a>",
            self.links.summary(self.repo()),
            escape_html(self.repository.display_name())
        )
    }

    fn created(&self) -> String {
        format!(
            "<b>{}</b> has created {} <a href=\"{}\">{}</a> in {}",
            self.user,
            self.kind,
            self.links.log(self.repo(), self.ref_target),
            self.short_ref,
            self.repo_link()
        )
    }

    fn updated(&self, update: &RefUpdate, history: &dyn RevisionHistory, fast_forward: bool) -> String {
        let mut commits = None;
        let (action, url) = match self.kind {
            RefKind::Tag => (
                "<b>MOVED</b> tag".to_string(),
                self.links.commit(self.repo(), update.new_id.as_str()),
            ),
            RefKind::Branch => {
                let url = self.links.log(self.repo(), self.ref_target);
                if fast_forward {
                    let loaded = load_commits(history, self.repo(), &update.old_id, &update.new_id);
                    let action = match loaded.len() {
                        1 => "pushed 1 commit to".to_string(),
                        n => format!("pushed {} commits to", n),
                    };
                    commits = Some(loaded);
                    (action, url)
                } else {
                    ("<b>REWRITTEN</b>".to_string(), url)
                }
            }
        };

        let mut body = format!(
            "<b>{}</b> has {} <a href=\"{}\">{}</a> in {}",
            self.user,
            action,
            url,
            self.short_ref,
            self.repo_link()
        );

        if let Some(commits) = commits {
            let table = CommitTable {
                links: &self.links,
                repo: self.repo(),
                short_id_len: self.settings.web.short_commit_id_length,
                short_log_len: self.settings.web.short_log_length,
            };
            table.render(&mut body, &commits, &update.old_id, &update.new_id);
        }
        body
    }

    fn deleted(&self) -> String {
        format!(
            "<b>{}</b> has deleted {} <b>{}</b> from {}",
            self.user,
            self.kind,
            self.short_ref,
            self.repo_link()
        )
    }
}
