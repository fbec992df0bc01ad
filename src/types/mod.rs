//! Core domain types for the notifier.
//!
//! Event records here are produced by the git server and issue tracker; the
//! [`Notification`] is what formatters produce from them.

pub mod ids;
pub mod notification;
pub mod push;
pub mod repository;
pub mod ticket;

pub use ids::{InvalidSha, RefKind, RefName, Sha};
pub use notification::{Color, MessageFormat, Notification, Payload};
pub use push::{CommandKind, PushEvent, RefUpdate};
pub use repository::{Actor, RepositoryModel, strip_dot_git};
pub use ticket::{
    Change, ChangeKind, Comment, Field, Patchset, PatchsetType, Review, Score, Status, Ticket,
    TicketEvent,
};
