//! Messages for ticket creation and ticket changes.

use std::collections::BTreeSet;

use super::commits::{CommitTable, commits_noun, load_commits};
use super::fields::render_fields;
use super::links::LinkBuilder;
use super::markup::{TextRenderer, escape_html};
use crate::config::Settings;
use crate::git::RevisionHistory;
use crate::notify::project_room;
use crate::types::{
    Change, ChangeKind, Color, Field, Notification, Patchset, RepositoryModel, Status, Ticket,
    strip_dot_git,
};

/// Fields left out of the table for a new ticket.
const NEW_TICKET_EXCLUDED: [Field; 4] = [Field::Watchers, Field::Voters, Field::Status, Field::Mentions];

/// Fields left out of the table for a ticket change.
const UPDATE_EXCLUDED: [Field; 6] = [
    Field::Watchers,
    Field::Voters,
    Field::Mentions,
    Field::Title,
    Field::Body,
    Field::MergeSha,
];

/// Formats the creation of `ticket`; `change` is its first journal entry.
pub fn format_new_ticket(
    settings: &Settings,
    repository: &RepositoryModel,
    ticket: &Ticket,
    change: &Change,
    renderer: &dyn TextRenderer,
) -> Notification {
    let links = LinkBuilder::new(&settings.web.canonical_url);
    let mut body = format!(
        "<b>{}</b> has created <b>{}</b> <a href=\"{}\">ticket-{}</a>",
        escape_html(change.author.display_name()),
        escape_html(strip_dot_git(&ticket.repository)),
        links.ticket(&ticket.repository, ticket.number),
        ticket.number
    );

    let excluded: BTreeSet<Field> = NEW_TICKET_EXCLUDED.into_iter().collect();
    body.push_str(&render_fields(
        ticket,
        change,
        &excluded,
        settings.hipchat.post_ticket_comments,
        renderer,
    ));

    Notification::html(body)
        .with_color(Color::Purple)
        .with_room(project_room(&settings.hipchat, repository))
}

/// Formats a change to an existing ticket.
///
/// Only reviews, new patchsets, merges, status changes and (when enabled)
/// comments are reported; anything else yields `None`.
pub fn format_ticket_update(
    settings: &Settings,
    repository: &RepositoryModel,
    ticket: &Ticket,
    change: &Change,
    history: &dyn RevisionHistory,
    renderer: &dyn TextRenderer,
) -> Option<Notification> {
    let post_comments = settings.hipchat.post_ticket_comments;
    let kind = change.kind()?;
    if matches!(kind, ChangeKind::Comment(_)) && !post_comments {
        return None;
    }

    let links = LinkBuilder::new(&settings.web.canonical_url);
    let author = format!("<b>{}</b>", escape_html(change.author.display_name()));
    let repo = format!("<b>{}</b>", escape_html(strip_dot_git(&ticket.repository)));
    let url = format!(
        "<a href=\"{}\">ticket-{}</a>",
        links.ticket(&ticket.repository, ticket.number),
        ticket.number
    );

    let mut body = match kind {
        ChangeKind::Review(review) => {
            let mut msg = format!(
                "{} has reviewed {} {} patchset {}-{}",
                author, repo, url, review.patchset, review.rev
            );
            if let Some(symbol) = review.score.symbol() {
                msg.push(' ');
                msg.push_str(symbol);
            }
            msg
        }
        ChangeKind::Patchset(patchset) => {
            let lead_in = if patchset.rev == 1 && patchset.number == 1 {
                format!("{} has pushed a proposal for {} {}", author, repo, url)
            } else if patchset.rev == 1 {
                format!(
                    "{} has rewritten the patchset for {} {} ({})",
                    author, repo, url, patchset.kind
                )
            } else {
                format!(
                    "{} has added {} {} to {} {}",
                    author,
                    patchset.added,
                    commits_noun(patchset.added as usize),
                    repo,
                    url
                )
            };
            let mut msg = lead_in;
            render_patchset_commits(&mut msg, settings, &links, ticket, patchset, history);
            msg
        }
        ChangeKind::Merge => {
            let target = ticket
                .merge_to
                .as_deref()
                .or_else(|| change.fields.get(&Field::MergeTo).map(String::as_str))
                .unwrap_or_default();
            format!(
                "{} has merged {} {} to <b>{}</b>",
                author,
                repo,
                url,
                escape_html(target)
            )
        }
        ChangeKind::StatusChange => {
            format!("{} has changed the status of {} {}", author, repo, url)
        }
        ChangeKind::Comment(_) => format!("{} has commented on {} {}", author, repo, url),
    };

    let excluded: BTreeSet<Field> = UPDATE_EXCLUDED.into_iter().collect();
    body.push_str(&render_fields(ticket, change, &excluded, post_comments, renderer));

    Some(
        Notification::html(body)
            .with_color(update_color(ticket, change))
            .with_room(project_room(&settings.hipchat, repository)),
    )
}

/// Commit table for a new patchset revision.
///
/// The first revision of a patchset is compared with its base; later
/// revisions with the tip of the revision before.
fn render_patchset_commits(
    out: &mut String,
    settings: &Settings,
    links: &LinkBuilder,
    ticket: &Ticket,
    patchset: &Patchset,
    history: &dyn RevisionHistory,
) {
    let base = if patchset.rev > 1 {
        ticket
            .patchset(patchset.number, patchset.rev - 1)
            .map_or(&patchset.base, |previous| &previous.tip)
    } else {
        &patchset.base
    };

    let commits = load_commits(history, &ticket.repository, base, &patchset.tip);
    let table = CommitTable {
        links,
        repo: &ticket.repository,
        short_id_len: settings.web.short_commit_id_length,
        short_log_len: settings.web.short_log_length,
    };
    table.render(out, &commits, base, &patchset.tip);
}

/// Status edits are coloured by the resulting status, comments yellow.
fn update_color(ticket: &Ticket, change: &Change) -> Color {
    if change.is_status_change() {
        match ticket.status {
            Status::Abandoned
            | Status::Declined
            | Status::Invalid
            | Status::Wontfix
            | Status::Duplicate => Color::Red,
            Status::OnHold => Color::Yellow,
            Status::Closed | Status::Fixed | Status::Merged | Status::Resolved => Color::Green,
            Status::New | Status::Open => Color::Gray,
        }
    } else if change.has_comment() {
        Color::Yellow
    } else {
        Color::Gray
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::markup::MarkupRenderer;
    use crate::test_utils::{FakeHistory, summary, test_actor, test_repository, test_settings};
    use crate::types::{PatchsetType, Review, Score, Sha};

    fn ticket() -> Ticket {
        let mut t = Ticket::new(42, "team/app.git", "Crash on start");
        t.responsible = Some("alice".into());
        t
    }

    fn change() -> Change {
        Change::new(test_actor())
    }

    fn sha(c: char) -> Sha {
        Sha::new(c.to_string().repeat(40))
    }

    fn patchset(number: u32, rev: u32, base: Sha, tip: Sha, added: u32) -> Patchset {
        Patchset {
            number,
            rev,
            base,
            tip,
            added,
            kind: PatchsetType::FastForward,
        }
    }

    fn update(settings: &Settings, ticket: &Ticket, change: &Change, history: &FakeHistory) -> Option<Notification> {
        format_ticket_update(
            settings,
            &test_repository(),
            ticket,
            change,
            history,
            &MarkupRenderer::new(),
        )
    }

    const TICKET_LINK: &str = "<a href=\"https://git.example.com/tickets?r=team%2Fapp.git&h=42\">ticket-42</a>";

    #[test]
    fn new_ticket_is_purple_with_fields() {
        let c = change()
            .with_field(Field::Title, "Crash on start")
            .with_field(Field::Status, "New")
            .with_field(Field::Watchers, "bob")
            .with_field(Field::Type, "Bug");

        let n = format_new_ticket(&test_settings(), &test_repository(), &ticket(), &c, &MarkupRenderer::new());
        assert!(n.body().starts_with(&format!(
            "<b>Jane Doe</b> has created <b>team/app</b> {}\n<table><tbody>\n",
            TICKET_LINK
        )));
        assert!(n.body().contains("<b>title:</b></td><td>Crash on start"));
        assert!(n.body().contains("<b>type:</b></td><td>Bug"));
        assert!(!n.body().contains("status:"));
        assert!(!n.body().contains("watchers:"));
        assert_eq!(n.color(), Some(Color::Purple));
    }

    #[test]
    fn new_ticket_uses_project_room() {
        let mut settings = test_settings();
        settings.hipchat.use_project_rooms = true;
        let n = format_new_ticket(&settings, &test_repository(), &ticket(), &change(), &MarkupRenderer::new());
        assert_eq!(n.room(), Some("dev-team"));
    }

    #[test]
    fn review_includes_score_symbol() {
        let c = change().with_review(Review { patchset: 2, rev: 3, score: Score::LooksGood });
        let n = update(&test_settings(), &ticket(), &c, &FakeHistory::new()).unwrap();
        assert!(n.body().starts_with(&format!(
            "<b>Jane Doe</b> has reviewed <b>team/app</b> {} patchset 2-3 (thumbsup)",
            TICKET_LINK
        )));
        assert_eq!(n.color(), Some(Color::Gray));
    }

    #[test]
    fn review_without_score_symbol() {
        let c = change().with_review(Review { patchset: 1, rev: 1, score: Score::NotReviewed });
        let n = update(&test_settings(), &ticket(), &c, &FakeHistory::new()).unwrap();
        assert!(n.body().contains("patchset 1-1\n<table>"));
    }

    #[test]
    fn initial_proposal_compares_with_base() {
        let ps = patchset(1, 1, sha('a'), sha('b'), 2);
        let history = FakeHistory::new().with_range(&sha('a'), &sha('b'), vec![summary(0), summary(1)]);
        let c = change().with_patchset(ps);

        let n = update(&test_settings(), &ticket(), &c, &history).unwrap();
        assert!(n.body().starts_with(&format!("<b>Jane Doe</b> has pushed a proposal for <b>team/app</b> {}", TICKET_LINK)));
        assert_eq!(history.calls(), vec![(sha('a'), sha('b'))]);
        assert!(n.body().contains(&format!(
            "<a href=\"https://git.example.com/compare?r=team%2Fapp.git&h={}..{}\">view comparison of these 2 commits</a>",
            sha('a'),
            sha('b')
        )));
    }

    #[test]
    fn rewritten_patchset_names_its_type() {
        let mut ps = patchset(2, 1, sha('a'), sha('c'), 1);
        ps.kind = PatchsetType::RebaseSquash;
        let history = FakeHistory::new().with_range(&sha('a'), &sha('c'), vec![summary(0)]);

        let n = update(&test_settings(), &ticket(), &change().with_patchset(ps), &history).unwrap();
        assert!(n.body().contains(&format!("has rewritten the patchset for <b>team/app</b> {} (rebase+squash)", TICKET_LINK)));
        assert!(!n.body().contains("/compare?"));
    }

    #[test]
    fn added_commits_compare_with_previous_revision() {
        let mut t = ticket();
        t.patchsets = vec![patchset(1, 1, sha('a'), sha('b'), 1), patchset(1, 2, sha('a'), sha('c'), 1)];
        let history = FakeHistory::new().with_range(&sha('b'), &sha('c'), vec![summary(0)]);
        let c = change().with_patchset(patchset(1, 2, sha('a'), sha('c'), 1));

        let n = update(&test_settings(), &t, &c, &history).unwrap();
        assert!(n.body().contains("has added 1 commit to <b>team/app</b>"));
        assert_eq!(history.calls(), vec![(sha('b'), sha('c'))]);
    }

    #[test]
    fn added_commits_fall_back_to_base_without_previous_revision() {
        let history = FakeHistory::new();
        let c = change().with_patchset(patchset(1, 3, sha('a'), sha('d'), 4));

        let n = update(&test_settings(), &ticket(), &c, &history).unwrap();
        assert!(n.body().contains("has added 4 commits to"));
        assert_eq!(history.calls(), vec![(sha('a'), sha('d'))]);
    }

    #[test]
    fn merge_names_target_branch_and_is_green() {
        let mut t = ticket();
        t.status = Status::Merged;
        t.merge_to = Some("main".into());
        let c = change().with_field(Field::Status, "Merged").with_field(Field::MergeSha, "abc");

        let n = update(&test_settings(), &t, &c, &FakeHistory::new()).unwrap();
        assert!(n.body().starts_with(&format!("<b>Jane Doe</b> has merged <b>team/app</b> {} to <b>main</b>", TICKET_LINK)));
        assert!(!n.body().contains("mergeSha"));
        assert_eq!(n.color(), Some(Color::Green));
    }

    #[test]
    fn status_colours() {
        let cases = [
            (Status::Abandoned, Color::Red),
            (Status::Declined, Color::Red),
            (Status::Invalid, Color::Red),
            (Status::Wontfix, Color::Red),
            (Status::Duplicate, Color::Red),
            (Status::OnHold, Color::Yellow),
            (Status::Closed, Color::Green),
            (Status::Fixed, Color::Green),
            (Status::Resolved, Color::Green),
            (Status::Open, Color::Gray),
            (Status::New, Color::Gray),
        ];
        for (status, color) in cases {
            let mut t = ticket();
            t.status = status;
            let c = change().with_field(Field::Status, status.as_str());
            let n = update(&test_settings(), &t, &c, &FakeHistory::new()).unwrap();
            assert!(n.body().contains("has changed the status of"), "{status}");
            assert_eq!(n.color(), Some(color), "{status}");
        }
    }

    #[test]
    fn comment_is_yellow_and_rendered() {
        let c = change().with_comment("Looks **good**");
        let n = update(&test_settings(), &ticket(), &c, &FakeHistory::new()).unwrap();
        assert!(n.body().starts_with(&format!(
            "<b>Jane Doe</b> has commented on <b>team/app</b> {}<br/>Looks <strong>good</strong><br/><br/>",
            TICKET_LINK
        )));
        assert_eq!(n.color(), Some(Color::Yellow));
    }

    #[test]
    fn comments_are_skipped_when_disabled() {
        let mut settings = test_settings();
        settings.hipchat.post_ticket_comments = false;
        let c = change().with_comment("hello");
        assert_eq!(update(&settings, &ticket(), &c, &FakeHistory::new()), None);
    }

    #[test]
    fn disabled_comments_leave_field_table_on_status_change() {
        let mut settings = test_settings();
        settings.hipchat.post_ticket_comments = false;
        let mut t = ticket();
        t.status = Status::Resolved;
        let c = change()
            .with_comment("secret words")
            .with_field(Field::Status, "Resolved")
            .with_field(Field::Milestone, "1.2");

        let n = update(&settings, &t, &c, &FakeHistory::new()).unwrap();
        assert!(!n.body().contains("secret words"));
        assert!(n.body().contains("<b>milestone:</b></td><td>1.2</td>"));
        assert!(n.body().contains("<b>status:</b></td><td>Resolved</td>"));
    }

    #[test]
    fn unreported_changes_yield_nothing() {
        let c = change().with_field(Field::Labels, "ui");
        assert_eq!(update(&test_settings(), &ticket(), &c, &FakeHistory::new()), None);
    }

    #[test]
    fn update_excludes_title_edits_but_shows_ticket_title() {
        let mut t = ticket();
        t.status = Status::Open;
        let c = change().with_field(Field::Status, "Open").with_field(Field::Title, "Old title");
        let n = update(&test_settings(), &t, &c, &FakeHistory::new()).unwrap();
        assert!(n.body().contains("<b>title:</b></td><td>Crash on start</td>"));
        assert!(!n.body().contains("Old title"));
    }

    #[test]
    fn formatting_is_deterministic() {
        let history = FakeHistory::new().with_range(&sha('a'), &sha('b'), (0..8).map(summary).collect());
        let c = change()
            .with_patchset(patchset(1, 1, sha('a'), sha('b'), 8))
            .with_comment("see *this*")
            .with_field(Field::Topic, "perf");

        let first = update(&test_settings(), &ticket(), &c, &history).unwrap();
        let second = update(&test_settings(), &ticket(), &c, &history).unwrap();
        assert_eq!(first.body(), second.body());
        assert_eq!(first, second);
    }
}
