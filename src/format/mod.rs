//! Event formatting.
//!
//! Each formatter turns one event into at most one [`Notification`]. They are
//! pure apart from reading commit history, so formatting the same event twice
//! gives identical messages.
//!
//! [`Notification`]: crate::types::Notification

pub mod commits;
pub mod fields;
pub mod links;
pub mod markup;
pub mod push;
pub mod ticket;

pub use commits::{CommitTable, MAX_COMMITS};
pub use fields::render_fields;
pub use links::{LinkBuilder, gravatar_url};
pub use markup::{MarkupRenderer, TextRenderer};
pub use push::format_ref_update;
pub use ticket::{format_new_ticket, format_ticket_update};
