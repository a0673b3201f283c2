//! Notification interface towards the presentation shell
//!
//! The core never draws anything. It reports log lines and connection state
//! changes through a `Notifier`, and the shell decides how to show them.

use chrono::Local;
use tokio::sync::mpsc;
use tracing::info;

/// Callbacks the shell implements
pub trait Notifier: Send + Sync {
    /// Append a line to the user-visible log, or clear it when `None`
    fn on_log(&self, text: Option<&str>);

    /// The server started/stopped listening, or the client connected/disconnected
    fn on_connection_state_changed(&self, active: bool);
}

/// One notification, as delivered by `ChannelNotifier`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Log line
    Log(String),
    /// Log cleared
    Clear,
    /// Active state changed
    StateChanged(bool),
}

/// Forwards every notification over a channel
///
/// Suits shells that own their own event loop.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn on_log(&self, text: Option<&str>) {
        let event = match text {
            Some(text) => Notification::Log(text.to_string()),
            None => Notification::Clear,
        };
        // Receiver gone means the shell is closing
        let _ = self.sender.send(event);
    }

    fn on_connection_state_changed(&self, active: bool) {
        let _ = self.sender.send(Notification::StateChanged(active));
    }
}

/// Prints `HH:MM text` lines to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn on_log(&self, text: Option<&str>) {
        match text {
            Some(text) => println!("{}", timestamped(text)),
            None => print!("\x1b[2J\x1b[H"),
        }
    }

    fn on_connection_state_changed(&self, active: bool) {
        let status = if active { "active" } else { "inactive" };
        println!("{}", timestamped(&format!("[{}]", status)));
    }
}

/// Sends log lines to `tracing` instead of a UI
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn on_log(&self, text: Option<&str>) {
        if let Some(text) = text {
            info!("{}", text);
        }
    }

    fn on_connection_state_changed(&self, active: bool) {
        info!("Connection state changed: active={}", active);
    }
}

/// Prefix a line with the local wall-clock time
pub fn timestamped(text: &str) -> String {
    format!("{} {}", Local::now().format("%H:%M"), text)
}
