//! Event submission endpoints.
//!
//! Producers POST push and ticket events as JSON. The body is verified
//! against the shared secret (when one is configured) before it is parsed,
//! then the matching hook runs on a blocking thread because it may walk
//! repository history. Notifications are queued, not awaited: a 202 means
//! the event was accepted, not that anything was delivered.

use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::AppState;
use super::signature::{SIGNATURE_HEADER, verify_signature};
use crate::git::GitRepository;
use crate::types::{PushEvent, TicketEvent};

/// Errors returned to event producers.
#[derive(Debug, Error)]
pub enum EventError {
    /// A secret is configured but the request is unsigned.
    #[error("missing X-Notifier-Signature header")]
    MissingSignature,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The repository name would resolve outside the repositories directory.
    #[error("invalid repository name: {0}")]
    InvalidRepository(String),

    /// The hook task panicked or was cancelled.
    #[error("event processing failed")]
    Internal,
}

impl IntoResponse for EventError {
    fn into_response(self) -> Response {
        let status = match &self {
            EventError::MissingSignature | EventError::InvalidSignature => StatusCode::UNAUTHORIZED,
            EventError::InvalidJson(_) | EventError::InvalidRepository(_) => StatusCode::BAD_REQUEST,
            EventError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// `POST /events/push`
pub async fn push_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), EventError> {
    verify(&app_state, &headers, &body)?;
    let event: PushEvent = serde_json::from_slice(&body)?;
    let repo_path = repository_path(&app_state, &event.repository.name)?;

    info!(
        repository = %event.repository.name,
        pusher = %event.pusher.username,
        commands = event.commands.len(),
        "Received push event"
    );

    let hook = app_state.receive_hook().clone();
    let submitted = tokio::task::spawn_blocking(move || {
        let history = GitRepository::open(repo_path);
        hook.on_post_receive(&event, &history)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Push hook failed");
        EventError::Internal
    })?;

    debug!(submitted, "Push event processed");
    Ok((StatusCode::ACCEPTED, "Accepted"))
}

/// `POST /events/ticket`
pub async fn ticket_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), EventError> {
    verify(&app_state, &headers, &body)?;
    let event: TicketEvent = serde_json::from_slice(&body)?;
    let repository = match &event {
        TicketEvent::Created { repository, .. } | TicketEvent::Updated { repository, .. } => {
            repository
        }
    };
    let repo_path = repository_path(&app_state, &repository.name)?;

    info!(repository = %repository.name, "Received ticket event");

    let hook = app_state.ticket_hook().clone();
    let submitted = tokio::task::spawn_blocking(move || {
        let history = GitRepository::open(repo_path);
        hook.on_event(&event, &history)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Ticket hook failed");
        EventError::Internal
    })?;

    debug!(submitted, "Ticket event processed");
    Ok((StatusCode::ACCEPTED, "Accepted"))
}

/// Verifies the body signature when a shared secret is configured.
fn verify(app_state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), EventError> {
    let settings = app_state.settings().snapshot();
    let Some(secret) = settings.server.shared_secret.as_deref().filter(|s| !s.is_empty()) else {
        return Ok(());
    };

    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(EventError::MissingSignature)?;

    if !verify_signature(body, header, secret.as_bytes()) {
        warn!("Rejected event with invalid signature");
        return Err(EventError::InvalidSignature);
    }
    Ok(())
}

/// Location of `name` under the configured repositories directory.
fn repository_path(app_state: &AppState, name: &str) -> Result<PathBuf, EventError> {
    let relative = Path::new(name);
    let contained = !name.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !contained {
        return Err(EventError::InvalidRepository(name.to_string()));
    }
    Ok(app_state
        .settings()
        .snapshot()
        .server
        .repositories_dir
        .join(relative))
}
