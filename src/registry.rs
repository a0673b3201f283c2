//! Registry of active connections
//!
//! A plain map from `ClientId` to `Connection`. It is owned by the relay
//! actor and only ever touched from that task, which is what makes add,
//! remove and snapshot atomic with respect to each other.

use std::collections::HashMap;

use crate::connection::Connection;
use crate::types::ClientId;

/// The server's table of currently active connections
#[derive(Debug, Default)]
pub struct Registry {
    connections: HashMap<ClientId, Connection>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection
    ///
    /// Returns false if the id is already present; the existing entry is kept.
    pub fn add(&mut self, id: ClientId, connection: Connection) -> bool {
        if self.contains(id) {
            return false;
        }
        self.connections.insert(id, connection);
        true
    }

    /// Remove a connection, returning it if it was present
    pub fn remove(&mut self, id: ClientId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Check if an id is registered
    pub fn contains(&self, id: ClientId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if no connection is registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Registered ids in ascending order
    pub fn ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.connections.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Point-in-time copy of every entry, ordered by id
    pub fn snapshot(&self) -> Vec<(ClientId, Connection)> {
        let mut entries: Vec<(ClientId, Connection)> = self
            .connections
            .iter()
            .map(|(id, conn)| (*id, conn.clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }
}
