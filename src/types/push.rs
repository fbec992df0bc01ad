//! Ref update records reported after a push is accepted.

use serde::{Deserialize, Serialize};

use super::ids::{RefName, Sha};
use super::repository::{Actor, RepositoryModel};

/// What an accepted ref update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// The ref did not exist before.
    Create,
    /// The new id descends from the old id.
    Update,
    /// The ref was force-pushed to an unrelated or older id.
    UpdateNonFastForward,
    /// The ref was removed.
    Delete,
}

/// One accepted ref update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdate {
    pub ref_name: RefName,
    pub old_id: Sha,
    pub new_id: Sha,
    pub kind: CommandKind,
}

impl RefUpdate {
    pub fn new(ref_name: impl Into<RefName>, old_id: Sha, new_id: Sha, kind: CommandKind) -> Self {
        RefUpdate {
            ref_name: ref_name.into(),
            old_id,
            new_id,
            kind,
        }
    }
}

/// All ref updates accepted in one push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    pub repository: RepositoryModel,
    pub pusher: Actor,
    pub commands: Vec<RefUpdate>,
}
