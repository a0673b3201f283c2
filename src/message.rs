//! Relay message definitions
//!
//! Everything the server puts on the wire is plain text with no delimiter;
//! `RelayMessage` names each kind and renders its exact text.

use std::fmt;

use crate::types::ClientId;

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    /// A client joined
    Joined(ClientId),
    /// A client left
    Left(ClientId),
    /// Text relayed from a client
    Chat { from: ClientId, text: String },
    /// Text typed by the server operator
    Server(String),
}

impl RelayMessage {
    /// Client that produced this message, if any
    ///
    /// Join/leave announcements are synthesized by the server and have no
    /// originator of their own.
    pub fn origin(&self) -> Option<ClientId> {
        match self {
            RelayMessage::Chat { from, .. } => Some(*from),
            _ => None,
        }
    }
}

impl fmt::Display for RelayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayMessage::Joined(id) => write!(f, "Client {} connected", id),
            RelayMessage::Left(id) => write!(f, "Client {} disconnected", id),
            RelayMessage::Chat { from, text } => write!(f, "Client {}: {}", from, text),
            RelayMessage::Server(text) => write!(f, "Server: {}", text),
        }
    }
}
