//! Ticket records supplied by the issue tracker.
//!
//! A ticket update arrives as a [`Change`]: an author plus any combination of
//! a comment, field edits, a new patchset revision and a review. Which of
//! those a notification reports is decided by [`Change::kind`], which checks
//! them in a fixed priority order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::ids::Sha;
use super::repository::{Actor, RepositoryModel};

/// Ticket lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    New,
    Open,
    Closed,
    Resolved,
    Fixed,
    Merged,
    Wontfix,
    Declined,
    Duplicate,
    Invalid,
    Abandoned,
    OnHold,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "New",
            Status::Open => "Open",
            Status::Closed => "Closed",
            Status::Resolved => "Resolved",
            Status::Fixed => "Fixed",
            Status::Merged => "Merged",
            Status::Wontfix => "Wontfix",
            Status::Declined => "Declined",
            Status::Duplicate => "Duplicate",
            Status::Invalid => "Invalid",
            Status::Abandoned => "Abandoned",
            Status::OnHold => "On_Hold",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    /// Parses a status as it appears in a field edit. Case and the
    /// separator in "on hold" are not significant.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | ' ' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        let status = match normalized.as_str() {
            "new" => Status::New,
            "open" => Status::Open,
            "closed" => Status::Closed,
            "resolved" => Status::Resolved,
            "fixed" => Status::Fixed,
            "merged" => Status::Merged,
            "wontfix" => Status::Wontfix,
            "declined" => Status::Declined,
            "duplicate" => Status::Duplicate,
            "invalid" => Status::Invalid,
            "abandoned" => Status::Abandoned,
            "onhold" => Status::OnHold,
            _ => return Err(format!("unknown ticket status: {s}")),
        };
        Ok(status)
    }
}

/// Ticket fields, declared in display order.
///
/// The derived `Ord` is the row order of the field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Body,
    Responsible,
    Type,
    Status,
    Milestone,
    MergeSha,
    MergeTo,
    Topic,
    Labels,
    Watchers,
    Reviewers,
    Voters,
    Mentions,
    Priority,
    Severity,
}

impl Field {
    /// The field name shown in the table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Body => "body",
            Field::Responsible => "responsible",
            Field::Type => "type",
            Field::Status => "status",
            Field::Milestone => "milestone",
            Field::MergeSha => "mergeSha",
            Field::MergeTo => "mergeTo",
            Field::Topic => "topic",
            Field::Labels => "labels",
            Field::Watchers => "watchers",
            Field::Reviewers => "reviewers",
            Field::Voters => "voters",
            Field::Mentions => "mentions",
            Field::Priority => "priority",
            Field::Severity => "severity",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a patchset revision relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchsetType {
    #[default]
    Proposal,
    FastForward,
    Rebase,
    Squash,
    RebaseSquash,
    Delete,
    Amend,
}

impl fmt::Display for PatchsetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatchsetType::Proposal => "proposal",
            PatchsetType::FastForward => "fast-forward",
            PatchsetType::Rebase => "rebase",
            PatchsetType::Squash => "squash",
            PatchsetType::RebaseSquash => "rebase+squash",
            PatchsetType::Delete => "delete",
            PatchsetType::Amend => "amend",
        };
        f.write_str(name)
    }
}

/// One revision of a patchset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patchset {
    pub number: u32,
    pub rev: u32,
    pub base: Sha,
    pub tip: Sha,
    /// Commits added by this revision.
    #[serde(default)]
    pub added: u32,
    #[serde(default, rename = "type")]
    pub kind: PatchsetType,
}

/// A reviewer's verdict on a patchset revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    Approved,
    LooksGood,
    NotReviewed,
    NeedsImprovement,
    Vetoed,
}

impl Score {
    /// Chat symbol for the score, if it has one.
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            Score::Approved => Some(":white_check_mark:"),
            Score::LooksGood => Some("(thumbsup)"),
            Score::NeedsImprovement => Some("(thumbsdown)"),
            Score::Vetoed => Some(":no_entry_sign:"),
            Score::NotReviewed => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub patchset: u32,
    pub rev: u32,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

/// One entry of a ticket's journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub author: Actor,

    #[serde(default)]
    pub comment: Option<Comment>,

    /// Field edits carried by this change.
    #[serde(default)]
    pub fields: BTreeMap<Field, String>,

    #[serde(default)]
    pub patchset: Option<Patchset>,

    #[serde(default)]
    pub review: Option<Review>,
}

/// The single aspect of a [`Change`] that a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind<'a> {
    Review(&'a Review),
    Patchset(&'a Patchset),
    Merge,
    StatusChange,
    Comment(&'a Comment),
}

impl Change {
    pub fn new(author: Actor) -> Self {
        Change {
            author,
            comment: None,
            fields: BTreeMap::new(),
            patchset: None,
            review: None,
        }
    }

    pub fn with_comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(Comment { text: text.into() });
        self
    }

    pub fn with_field(mut self, field: Field, value: impl Into<String>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn with_patchset(mut self, patchset: Patchset) -> Self {
        self.patchset = Some(patchset);
        self
    }

    pub fn with_review(mut self, review: Review) -> Self {
        self.review = Some(review);
        self
    }

    pub fn has_comment(&self) -> bool {
        self.comment.as_ref().is_some_and(|c| !c.text.trim().is_empty())
    }

    pub fn is_status_change(&self) -> bool {
        self.fields.contains_key(&Field::Status)
    }

    /// A status edit to `Merged`.
    pub fn is_merge(&self) -> bool {
        self.fields
            .get(&Field::Status)
            .is_some_and(|s| s.parse::<Status>() == Ok(Status::Merged))
    }

    /// Classifies the change: review, then patchset, then merge, then status
    /// change, then comment. `None` when the change is none of these.
    pub fn kind(&self) -> Option<ChangeKind<'_>> {
        if let Some(review) = &self.review {
            return Some(ChangeKind::Review(review));
        }
        if let Some(patchset) = &self.patchset {
            return Some(ChangeKind::Patchset(patchset));
        }
        if self.is_merge() {
            return Some(ChangeKind::Merge);
        }
        if self.is_status_change() {
            return Some(ChangeKind::StatusChange);
        }
        match &self.comment {
            Some(comment) if self.has_comment() => Some(ChangeKind::Comment(comment)),
            _ => None,
        }
    }
}

/// A ticket as it stands after the change being reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub number: u64,

    /// Name of the owning repository.
    pub repository: String,

    pub title: String,

    #[serde(default)]
    pub status: Status,

    #[serde(default)]
    pub responsible: Option<String>,

    #[serde(default)]
    pub milestone: Option<String>,

    /// Integration branch the ticket merges into.
    #[serde(default)]
    pub merge_to: Option<String>,

    /// Every known patchset revision.
    #[serde(default)]
    pub patchsets: Vec<Patchset>,
}

impl Ticket {
    pub fn new(number: u64, repository: impl Into<String>, title: impl Into<String>) -> Self {
        Ticket {
            number,
            repository: repository.into(),
            title: title.into(),
            status: Status::New,
            responsible: None,
            milestone: None,
            merge_to: None,
            patchsets: Vec::new(),
        }
    }

    /// Looks up a patchset revision.
    pub fn patchset(&self, number: u32, rev: u32) -> Option<&Patchset> {
        self.patchsets
            .iter()
            .find(|p| p.number == number && p.rev == rev)
    }
}

/// A ticket notification from the issue tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TicketEvent {
    /// A ticket was opened; `change` is its first journal entry.
    Created {
        repository: RepositoryModel,
        ticket: Ticket,
        change: Change,
    },
    /// A change was appended to an existing ticket.
    Updated {
        repository: RepositoryModel,
        ticket: Ticket,
        change: Change,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patchset(number: u32, rev: u32) -> Patchset {
        Patchset {
            number,
            rev,
            base: Sha::new("a".repeat(40)),
            tip: Sha::new("b".repeat(40)),
            added: 1,
            kind: PatchsetType::FastForward,
        }
    }

    fn change() -> Change {
        Change::new(Actor::new("jdoe"))
    }

    #[test]
    fn kind_prefers_review_over_everything() {
        let c = change()
            .with_review(Review { patchset: 1, rev: 2, score: Score::Approved })
            .with_patchset(patchset(1, 2))
            .with_field(Field::Status, "Merged")
            .with_comment("lgtm");
        assert!(matches!(c.kind(), Some(ChangeKind::Review(_))));
    }

    #[test]
    fn kind_prefers_patchset_over_merge_and_status() {
        let c = change()
            .with_patchset(patchset(1, 1))
            .with_field(Field::Status, "Merged");
        assert!(matches!(c.kind(), Some(ChangeKind::Patchset(_))));
    }

    #[test]
    fn merged_status_is_a_merge_not_a_status_change() {
        let c = change().with_field(Field::Status, "Merged");
        assert_eq!(c.kind(), Some(ChangeKind::Merge));
        assert!(c.is_status_change());
    }

    #[test]
    fn other_status_is_a_status_change() {
        let c = change().with_field(Field::Status, "Resolved").with_comment("done");
        assert_eq!(c.kind(), Some(ChangeKind::StatusChange));
    }

    #[test]
    fn comment_only() {
        let c = change().with_comment("hello");
        assert!(matches!(c.kind(), Some(ChangeKind::Comment(_))));
    }

    #[test]
    fn blank_comment_and_plain_field_edits_are_unreported() {
        assert_eq!(change().with_comment("   ").kind(), None);
        assert_eq!(change().with_field(Field::Milestone, "1.0").kind(), None);
    }

    #[test]
    fn field_order_is_display_order() {
        let mut fields = vec![Field::Milestone, Field::Topic, Field::Title, Field::Responsible];
        fields.sort();
        assert_eq!(
            fields,
            vec![Field::Title, Field::Responsible, Field::Milestone, Field::Topic]
        );
    }

    #[test]
    fn status_parses_loosely() {
        assert_eq!("On_Hold".parse::<Status>(), Ok(Status::OnHold));
        assert_eq!("on hold".parse::<Status>(), Ok(Status::OnHold));
        assert_eq!("MERGED".parse::<Status>(), Ok(Status::Merged));
        assert!("sideways".parse::<Status>().is_err());
    }

    #[test]
    fn change_fields_deserialize_by_camel_case_name() {
        let json = r#"{
            "author": {"username": "jdoe"},
            "fields": {"mergeTo": "main", "status": "Merged"}
        }"#;
        let c: Change = serde_json::from_str(json).unwrap();
        assert_eq!(c.fields.get(&Field::MergeTo).map(String::as_str), Some("main"));
        assert!(c.is_merge());
    }

    #[test]
    fn ticket_finds_patchset_revision() {
        let mut ticket = Ticket::new(7, "app.git", "Crash on start");
        ticket.patchsets = vec![patchset(1, 1), patchset(1, 2), patchset(2, 1)];
        assert_eq!(ticket.patchset(1, 2).map(|p| p.rev), Some(2));
        assert!(ticket.patchset(3, 1).is_none());
    }

    #[test]
    fn score_symbols() {
        assert_eq!(Score::Approved.symbol(), Some(":white_check_mark:"));
        assert_eq!(Score::Vetoed.symbol(), Some(":no_entry_sign:"));
        assert_eq!(Score::NotReviewed.symbol(), None);
    }
}
