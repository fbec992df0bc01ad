//! Delivery of notifications to HipChat rooms.
//!
//! [`Notifier`] is constructed once, passed to whatever produces
//! notifications, and shut down explicitly. Each send resolves its room from
//! the current settings, posts the payload once and classifies the response.
//! Nothing is retried and nothing is persisted: a failed send is logged and
//! dropped.
//!
//! [`Notifier::send`] is for callers that want the outcome (the `test`
//! command). Event hooks use [`Notifier::send_async`], which queues the send on
//! the runtime and returns immediately. At most
//! `hipchat.max_concurrent_sends` requests are in flight; queued sends may
//! complete in any order.

mod room;

pub use room::{RoomBinding, project_room, resolve_binding, shall_post};

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::SharedSettings;
use crate::types::Notification;

/// Connect timeout for the notification endpoint.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read timeout for the notification endpoint.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

const JSON_UTF8: &str = "application/json; charset=utf-8";

const USER_AGENT: &str = concat!("hipchat-notifier/", env!("CARGO_PKG_VERSION"));

/// Errors from a single send.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Connect, timeout or I/O failure talking to the endpoint.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Neither the addressed room nor a default room has a token.
    #[error("no room to post to: configure hipchat.default_room and hipchat.default_token")]
    NoDestination,

    /// `hipchat.api_url` cannot carry a room path.
    #[error("invalid API endpoint: {0}")]
    InvalidEndpoint(String),

    /// The payload could not be serialised.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// The notifier could not be set up.
    #[error("failed to create notifier: {0}")]
    Client(String),
}

/// How the endpoint answered a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// 204 No Content.
    Delivered,

    /// Any other status. Both bodies are kept for diagnosis.
    Rejected {
        status: u16,
        request_body: String,
        response_body: String,
    },
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }
}

/// Sends notifications to HipChat. Cheap to clone.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    settings: SharedSettings,
    client: reqwest::Client,
    runtime: Handle,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl Notifier {
    /// Creates a notifier bound to the current Tokio runtime.
    ///
    /// Must be called from within a runtime; the handle is kept so
    /// [`Notifier::send_async`] also works from blocking threads.
    pub fn new(settings: SharedSettings) -> Result<Self, NotifyError> {
        let runtime = Handle::try_current().map_err(|e| NotifyError::Client(e.to_string()))?;
        Self::with_runtime(settings, runtime)
    }

    /// Creates a notifier that queues sends on `runtime`.
    pub fn with_runtime(settings: SharedSettings, runtime: Handle) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;

        let max_concurrent = settings.snapshot().hipchat.max_concurrent_sends.max(1);

        Ok(Notifier {
            inner: Arc::new(NotifierInner {
                settings,
                client,
                runtime,
                permits: Arc::new(Semaphore::new(max_concurrent)),
                tracker: TaskTracker::new(),
            }),
        })
    }

    /// Sends `notification` and waits for the response.
    ///
    /// A rejected send is an `Ok` outcome; only failures to reach the
    /// endpoint or to address the message are errors.
    pub async fn send(&self, notification: &Notification) -> Result<SendOutcome, NotifyError> {
        let settings = self.inner.settings.snapshot();
        let binding = resolve_binding(notification.room(), &settings.hipchat)?;
        let url = endpoint(&settings.hipchat.api_url, &binding)?;
        let request_body = serde_json::to_string(&notification.payload())?;

        debug!(room = %binding.room, "Posting notification");

        let response = self
            .inner
            .client
            .post(url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .body(request_body.clone())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            // Dropping the response closes it without reading a body.
            return Ok(SendOutcome::Delivered);
        }

        let response_body = match response.text().await {
            Ok(text) => text,
            Err(e) => format!("<failed to read response body: {e}>"),
        };
        error!(
            room = %binding.room,
            status = status.as_u16(),
            request = %request_body,
            response = %response_body,
            "HipChat rejected notification"
        );

        Ok(SendOutcome::Rejected {
            status: status.as_u16(),
            request_body,
            response_body,
        })
    }

    /// Queues `notification` and returns immediately.
    ///
    /// The result is only logged. After [`Notifier::shutdown`] the
    /// notification is dropped with a warning.
    pub fn send_async(&self, notification: Notification) {
        let tracker = &self.inner.tracker;
        if tracker.is_closed() {
            warn!(room = ?notification.room(), "Notifier is shut down; dropping notification");
            return;
        }

        let notifier = self.clone();
        tracker.spawn_on(
            async move {
                let Ok(_permit) = notifier.inner.permits.clone().acquire_owned().await else {
                    return;
                };
                match notifier.send(&notification).await {
                    Ok(SendOutcome::Delivered) => {
                        info!(room = ?notification.room(), "Notification sent");
                    }
                    Ok(SendOutcome::Rejected { status, .. }) => {
                        warn!(room = ?notification.room(), status, "Notification not delivered");
                    }
                    Err(e) => {
                        error!(room = ?notification.room(), error = %e, "Failed to send notification");
                    }
                }
            },
            &self.inner.runtime,
        );
    }

    /// Stops accepting sends and waits for queued ones to finish.
    pub async fn shutdown(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }

    /// The settings this notifier reads.
    pub fn settings(&self) -> &SharedSettings {
        &self.inner.settings
    }
}

/// `{api_url}/v2/room/{room}/notification?auth_token={token}`.
fn endpoint(api_url: &str, binding: &RoomBinding) -> Result<Url, NotifyError> {
    let mut url =
        Url::parse(api_url).map_err(|e| NotifyError::InvalidEndpoint(format!("{api_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| NotifyError::InvalidEndpoint(api_url.to_string()))?
        .pop_if_empty()
        .extend(["v2", "room", binding.room.as_str(), "notification"]);
    url.query_pairs_mut().append_pair("auth_token", &binding.token);
    Ok(url)
}
