//! HipChat notifier - posts git pushes and ticket activity to HipChat rooms.
//!
//! Producers hand events to the [`hooks`]; the hooks format them with
//! [`format`] and queue the resulting notifications on a [`notify::Notifier`].
//! The [`server`] module exposes the hooks over HTTP.

pub mod config;
pub mod format;
pub mod git;
pub mod hooks;
pub mod notify;
pub mod server;
pub mod types;

#[cfg(test)]
mod test_utils;
