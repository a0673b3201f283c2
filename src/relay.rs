//! Relay actor implementation
//!
//! The central actor that owns the registry and performs every broadcast.
//! Workers talk to it through a `RelayHandle`; commands are processed one at
//! a time in the order they were sent, so broadcasts never run concurrently
//! and each target sees them in call order.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::AppError;
use crate::message::RelayMessage;
use crate::registry::Registry;
use crate::types::ClientId;

/// Commands sent from workers and the server to the relay actor
#[derive(Debug)]
pub enum RelayCommand {
    /// New connection accepted
    Register {
        client_id: ClientId,
        connection: Connection,
    },
    /// Connection closed; reply tells whether it was still registered
    Disconnect {
        client_id: ClientId,
        reply: oneshot::Sender<bool>,
    },
    /// Deliver a message to everyone except `origin`
    Broadcast {
        message: RelayMessage,
        origin: Option<ClientId>,
    },
    /// Number of registered connections
    Count { reply: oneshot::Sender<usize> },
    /// Registered ids, ascending
    Ids { reply: oneshot::Sender<Vec<ClientId>> },
}

/// The relay actor
///
/// Owns the registry exclusively; all access goes through commands.
pub struct Relay {
    /// All registered connections: ClientId -> Connection
    registry: Registry,
    /// Command receiver channel
    receiver: mpsc::UnboundedReceiver<RelayCommand>,
}

impl Relay {
    /// Create a relay with the given command receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<RelayCommand>) -> Self {
        Self {
            registry: Registry::new(),
            receiver,
        }
    }

    /// Start a relay actor on the current runtime and return its handle
    pub fn spawn() -> RelayHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(Relay::new(receiver).run());
        RelayHandle { sender }
    }

    /// Run the relay event loop
    ///
    /// Continuously receives and processes commands until all handles are dropped.
    pub async fn run(mut self) {
        info!("Relay started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Relay shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: RelayCommand) {
        match cmd {
            RelayCommand::Register {
                client_id,
                connection,
            } => {
                self.handle_register(client_id, connection);
            }
            RelayCommand::Disconnect { client_id, reply } => {
                let removed = self.handle_disconnect(client_id);
                let _ = reply.send(removed);
            }
            RelayCommand::Broadcast { message, origin } => {
                self.deliver(&message, origin);
            }
            RelayCommand::Count { reply } => {
                let _ = reply.send(self.registry.len());
            }
            RelayCommand::Ids { reply } => {
                let _ = reply.send(self.registry.ids());
            }
        }
    }

    /// Handle new connection: register, then announce to everyone including it
    fn handle_register(&mut self, client_id: ClientId, connection: Connection) {
        if !self.registry.add(client_id, connection.clone()) {
            warn!("Client {} already registered, closing duplicate", client_id);
            connection.close();
            return;
        }

        debug!("Total clients: {}", self.registry.len());
        self.deliver(&RelayMessage::Joined(client_id), None);
    }

    /// Handle disconnection: remove, close and announce exactly once
    fn handle_disconnect(&mut self, client_id: ClientId) -> bool {
        let Some(connection) = self.registry.remove(client_id) else {
            debug!("Client {} already removed", client_id);
            return false;
        };

        connection.close();
        debug!("Total clients: {}", self.registry.len());
        self.deliver(&RelayMessage::Left(client_id), Some(client_id));
        true
    }

    /// Send a message to every live registered connection except `origin`
    fn deliver(&self, message: &RelayMessage, origin: Option<ClientId>) {
        let text = message.to_string();
        let mut delivered = 0;

        for (id, connection) in self.registry.snapshot() {
            if Some(id) == origin || !connection.is_live() {
                continue;
            }
            match connection.send(text.as_str()) {
                Ok(()) => delivered += 1,
                Err(e) => debug!("Broadcast to client {} dropped: {}", id, e),
            }
        }

        debug!("Delivered '{}' to {} clients", message, delivered);
    }
}

/// Cloneable handle to a running relay actor
#[derive(Debug, Clone)]
pub struct RelayHandle {
    sender: mpsc::UnboundedSender<RelayCommand>,
}

impl RelayHandle {
    /// Register a connection and announce it
    pub fn register(&self, client_id: ClientId, connection: Connection) -> Result<(), AppError> {
        self.send(RelayCommand::Register {
            client_id,
            connection,
        })
    }

    /// Queue a broadcast without waiting for it to be delivered
    pub fn broadcast(&self, message: RelayMessage, origin: Option<ClientId>) -> Result<(), AppError> {
        self.send(RelayCommand::Broadcast { message, origin })
    }

    /// Remove a connection, close it and announce the departure
    ///
    /// Returns true only for the call that actually removed it.
    pub async fn disconnect(&self, client_id: ClientId) -> Result<bool, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Disconnect { client_id, reply })?;
        rx.await.map_err(|_| AppError::ChannelSend)
    }

    /// Number of registered connections
    pub async fn connected_count(&self) -> Result<usize, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Count { reply })?;
        rx.await.map_err(|_| AppError::ChannelSend)
    }

    /// Registered ids, ascending
    pub async fn connected_ids(&self) -> Result<Vec<ClientId>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Ids { reply })?;
        rx.await.map_err(|_| AppError::ChannelSend)
    }

    fn send(&self, cmd: RelayCommand) -> Result<(), AppError> {
        self.sender.send(cmd).map_err(|_| AppError::ChannelSend)
    }
}
