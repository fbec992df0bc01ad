//! Event hooks called by the git server and the issue tracker.
//!
//! A hook applies the repository gates, formats the event and submits the
//! resulting notifications. Hooks never fail: a notification that cannot be
//! built or delivered must not fail the push or ticket change that caused it.

use std::sync::Arc;

use tracing::debug;

use crate::config::{Settings, SharedSettings};
use crate::format::{TextRenderer, format_new_ticket, format_ref_update, format_ticket_update};
use crate::git::RevisionHistory;
use crate::notify::{Notifier, shall_post};
use crate::types::{Change, Notification, PushEvent, RepositoryModel, Ticket, TicketEvent};

/// Where hooks hand off finished notifications.
pub trait NotificationSink: Send + Sync {
    /// Accepts `notification` for delivery without waiting for it.
    fn submit(&self, notification: Notification);
}

impl NotificationSink for Notifier {
    fn submit(&self, notification: Notification) {
        self.send_async(notification);
    }
}

/// Posts accepted ref updates.
#[derive(Clone)]
pub struct ReceiveHook {
    settings: SharedSettings,
    sink: Arc<dyn NotificationSink>,
}

impl ReceiveHook {
    pub fn new(settings: SharedSettings, sink: Arc<dyn NotificationSink>) -> Self {
        ReceiveHook { settings, sink }
    }

    /// Submits one notification per reportable ref update in `event`.
    ///
    /// Returns the number submitted.
    pub fn on_post_receive(&self, event: &PushEvent, history: &dyn RevisionHistory) -> usize {
        let settings = self.settings.snapshot();
        if !shall_post(&settings.hipchat, &event.repository) {
            debug!(repository = %event.repository.name, "Not posting pushes for repository");
            return 0;
        }

        let mut submitted = 0;
        for update in &event.commands {
            let Some(notification) =
                format_ref_update(&settings, &event.repository, &event.pusher, update, history)
            else {
                continue;
            };
            self.sink.submit(notification);
            submitted += 1;
        }
        submitted
    }
}

/// Posts ticket activity.
#[derive(Clone)]
pub struct TicketHook {
    settings: SharedSettings,
    sink: Arc<dyn NotificationSink>,
    renderer: Arc<dyn TextRenderer>,
}

impl TicketHook {
    pub fn new(
        settings: SharedSettings,
        sink: Arc<dyn NotificationSink>,
        renderer: Arc<dyn TextRenderer>,
    ) -> Self {
        TicketHook {
            settings,
            sink,
            renderer,
        }
    }

    /// Dispatches an ingress ticket event to the matching hook.
    pub fn on_event(&self, event: &TicketEvent, history: &dyn RevisionHistory) -> bool {
        match event {
            TicketEvent::Created {
                repository,
                ticket,
                change,
            } => self.on_new_ticket(repository, ticket, change),
            TicketEvent::Updated {
                repository,
                ticket,
                change,
            } => self.on_update_ticket(repository, ticket, change, history),
        }
    }

    /// Returns true when a notification was submitted.
    pub fn on_new_ticket(&self, repository: &RepositoryModel, ticket: &Ticket, change: &Change) -> bool {
        let settings = self.settings.snapshot();
        if !posts_tickets(&settings, repository) {
            return false;
        }
        let notification =
            format_new_ticket(&settings, repository, ticket, change, self.renderer.as_ref());
        self.sink.submit(notification);
        true
    }

    /// Returns true when a notification was submitted.
    pub fn on_update_ticket(
        &self,
        repository: &RepositoryModel,
        ticket: &Ticket,
        change: &Change,
        history: &dyn RevisionHistory,
    ) -> bool {
        let settings = self.settings.snapshot();
        if !posts_tickets(&settings, repository) {
            return false;
        }
        match format_ticket_update(&settings, repository, ticket, change, history, self.renderer.as_ref()) {
            Some(notification) => {
                self.sink.submit(notification);
                true
            }
            None => {
                debug!(ticket = ticket.number, "Ticket change is not reported");
                false
            }
        }
    }
}

fn posts_tickets(settings: &Settings, repository: &RepositoryModel) -> bool {
    let post = settings.hipchat.post_tickets && shall_post(&settings.hipchat, repository);
    if !post {
        debug!(repository = %repository.name, "Not posting tickets for repository");
    }
    post
}
