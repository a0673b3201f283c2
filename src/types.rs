//! Basic type definitions for the chat relay
//!
//! Provides the `ClientId` newtype and the generator the listener uses to
//! hand out identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique client identifier (newtype pattern)
///
/// Server-assigned, starting at 1 and strictly increasing.
/// Implements Hash, Eq and Ord for use as map keys and for ordered snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl ClientId {
    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic source of `ClientId`s
///
/// Shared between the owning server and its accept loop; ids are never
/// reused, even when the listener is stopped and started again.
#[derive(Debug)]
pub struct ClientIdGenerator {
    next: AtomicU64,
}

impl ClientIdGenerator {
    /// Create a generator whose first id is 1
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Take the next identifier
    pub fn next_id(&self) -> ClientId {
        ClientId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ClientIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_display() {
        assert_eq!(ClientId(7).to_string(), "7");
    }

    #[test]
    fn test_generator_starts_at_one() {
        let ids = ClientIdGenerator::new();
        assert_eq!(ids.next_id(), ClientId(1));
        assert_eq!(ids.next_id(), ClientId(2));
        assert_eq!(ids.next_id().value(), 3);
    }

    #[test]
    fn test_generator_unique_across_threads() {
        let ids = std::sync::Arc::new(ClientIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || (0..100).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<ClientId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 400);
    }
}
