//! Destination rooms and the credentials used to post to them.

use tracing::warn;

use super::NotifyError;
use crate::config::HipChatSettings;
use crate::types::RepositoryModel;

/// The room a send goes to and the token that authorises it.
///
/// Derived from the configuration snapshot on every send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomBinding {
    pub room: String,
    pub token: String,
}

/// Room for events of `repository` when project rooms are enabled.
///
/// The room is `<default_room>-<project>`, or the bare project path when no
/// default room is configured. `None` for the root project or when project
/// rooms are disabled, which leaves the notification on the default room.
pub fn project_room(settings: &HipChatSettings, repository: &RepositoryModel) -> Option<String> {
    if !settings.use_project_rooms || repository.project_path.is_empty() {
        return None;
    }
    match settings.default_room() {
        Some(default) => Some(format!("{}-{}", default, repository.project_path)),
        None => Some(repository.project_path.clone()),
    }
}

/// Resolves where a notification addressed to `room` is delivered.
///
/// A room without a configured token falls back to the default room and
/// token. The caller is not told; the fallback is only logged.
pub fn resolve_binding(room: Option<&str>, settings: &HipChatSettings) -> Result<RoomBinding, NotifyError> {
    if let Some(room) = room {
        if let Some(token) = settings.room_token(room) {
            return Ok(RoomBinding {
                room: room.to_string(),
                token: token.to_string(),
            });
        }

        warn!(
            room = %room,
            default_room = settings.default_room().unwrap_or_default(),
            "No token configured for room; posting to the default room instead"
        );
        warn!(
            room = %room,
            "Add the room's token under [hipchat.room_tokens] to post to it"
        );
    }

    match (settings.default_room(), settings.default_token()) {
        (Some(room), Some(token)) => Ok(RoomBinding {
            room: room.to_string(),
            token: token.to_string(),
        }),
        _ => Err(NotifyError::NoDestination),
    }
}

/// False only for personal repositories while posting those is disabled.
pub fn shall_post(settings: &HipChatSettings, repository: &RepositoryModel) -> bool {
    !repository.personal || settings.post_personal_repos
}
