//! Error types for the chat relay
//!
//! Defines setup/application errors, outbound send errors and per-message
//! framing errors. Uses thiserror for ergonomic error definitions.

use std::net::SocketAddr;

use thiserror::Error;

/// Application-level errors
///
/// Transport setup failures are reported once and abort the operation;
/// the remaining variants describe misuse of the start/connect state machine.
#[derive(Debug, Error)]
pub enum AppError {
    /// Address text is not an IP address
    #[error("Address is not valid")]
    InvalidAddress,

    /// Port text is not a number
    #[error("Port number is not valid")]
    InvalidPort,

    /// Port number outside 0..=65535
    #[error("Port number is out of range")]
    PortOutOfRange,

    /// Listener could not bind
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Outbound connect failed
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Server is already listening
    #[error("Server is already active")]
    AlreadyActive,

    /// Client already holds a connection
    #[error("Already connected")]
    AlreadyConnected,

    /// Client has no connection to send on
    #[error("Not connected to a server")]
    NotConnected,

    /// Relay actor is gone (internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Line shown in the user-visible log when this error aborts an operation
    pub fn log_line(&self) -> String {
        match self {
            AppError::InvalidAddress | AppError::InvalidPort | AppError::PortOutOfRange => {
                format!("[/ {} /]", self)
            }
            _ => format!("Something went wrong: {}", self),
        }
    }
}

/// Message send errors
///
/// Occurs when enqueueing on a connection whose writer has stopped.
#[derive(Debug, Error)]
pub enum SendError {
    /// The connection's outbound queue has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Errors produced while reading one message off a stream
///
/// Both variants discard the partial message; neither is fatal to the
/// connection loop.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Read failed
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Completed message was not UTF-8
    #[error("Message is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}
