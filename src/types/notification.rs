//! The notification value handed from formatters to the dispatcher.
//!
//! A [`Notification`] carries the room it is addressed to, but the room never
//! reaches the wire: it selects the endpoint URL. The JSON body is the
//! separate [`Payload`] view.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the remote renders the message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// Plain text; the remote auto-links URLs.
    Text,
    /// Restricted HTML markup.
    Html,
}

/// Background colour of the message in the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Gray,
    Red,
    Green,
    Yellow,
    Purple,
    Random,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Gray => "gray",
            Color::Red => "red",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Purple => "purple",
            Color::Random => "random",
        };
        f.write_str(name)
    }
}

/// A single room message waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    body: String,
    format: MessageFormat,
    color: Option<Color>,
    room: Option<String>,
    notify: bool,
}

impl Notification {
    /// A plain-text message for the default room.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(body.into(), MessageFormat::Text)
    }

    /// An HTML message for the default room.
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(body.into(), MessageFormat::Html)
    }

    fn new(body: String, format: MessageFormat) -> Self {
        Notification {
            body,
            format,
            color: None,
            room: None,
            notify: false,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Addresses the message to `room`. `None` keeps the default room.
    pub fn with_room(mut self, room: Option<String>) -> Self {
        self.room = room.filter(|r| !r.is_empty());
        self
    }

    /// Asks the remote to alert room members.
    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn format(&self) -> MessageFormat {
        self.format
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn notify(&self) -> bool {
        self.notify
    }

    /// The JSON body sent to the room notification endpoint.
    pub fn payload(&self) -> Payload<'_> {
        Payload {
            color: self.color,
            message: &self.body,
            notify: self.notify,
            message_format: self.format,
        }
    }
}

/// Wire form of a [`Notification`].
#[derive(Debug, Serialize)]
pub struct Payload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    pub message: &'a str,
    pub notify: bool,
    pub message_format: MessageFormat,
}
