//! HTTP server through which producers submit events.
//!
//! # Endpoints
//!
//! - `POST /events/push` - a [`PushEvent`](crate::types::PushEvent) (returns 202 Accepted)
//! - `POST /events/ticket` - a [`TicketEvent`](crate::types::TicketEvent) (returns 202 Accepted)
//! - `GET /health` - returns 200 if the server is running

use std::sync::Arc;

pub mod events;
pub mod health;
pub mod signature;

pub use events::{EventError, push_handler, ticket_handler};
pub use health::health_handler;
pub use signature::{SIGNATURE_HEADER, sign, verify_signature};

use crate::config::SharedSettings;
use crate::hooks::{ReceiveHook, TicketHook};

/// Shared application state, passed to handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Read per request for the shared secret and repositories directory.
    settings: SharedSettings,
    receive_hook: ReceiveHook,
    ticket_hook: TicketHook,
}

impl AppState {
    pub fn new(settings: SharedSettings, receive_hook: ReceiveHook, ticket_hook: TicketHook) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                settings,
                receive_hook,
                ticket_hook,
            }),
        }
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.inner.settings
    }

    pub fn receive_hook(&self) -> &ReceiveHook {
        &self.inner.receive_hook
    }

    pub fn ticket_hook(&self) -> &TicketHook {
        &self.inner.ticket_hook
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/events/push", post(push_handler))
        .route("/events/ticket", post(ticket_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
