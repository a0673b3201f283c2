//! Minimal TCP Chat Relay Library
//!
//! A server accepts many concurrent TCP connections and rebroadcasts every
//! message it reads to all other connected clients. Clients hold one
//! persistent connection and surface whatever they receive.
//!
//! # Features
//! - Blocking accept loop with a dedicated worker per connection
//! - Message framing over undelimited text (drain-until-quiescent)
//! - Ordered broadcast with originator exclusion
//! - Join/leave announcements, each sent exactly once
//! - A small notification interface for whatever UI sits on top
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Relay` is the actor owning the `Registry` and performing broadcasts
//! - Each connection has a `handler` task reading from the stream and a
//!   writer task draining that connection's outbound queue
//! - No locks needed - all registry access goes through message passing
//!
//! # Protocol
//! Messages are raw UTF-8 with no delimiter. A message ends when the stream
//! has no more bytes immediately available, so a message written in two
//! bursts with a pause in between arrives as two messages.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use chat_relay::{ChatServer, TracingNotifier};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut server = ChatServer::new(Arc::new(TracingNotifier));
//!     server.start("127.0.0.1", "4050").await.unwrap();
//!
//!     tokio::signal::ctrl_c().await.unwrap();
//!     server.stop().await;
//! }
//! ```

pub mod client;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod framing;
pub mod handler;
pub mod message;
pub mod notify;
pub mod registry;
pub mod relay;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use client::ChatClient;
pub use connection::Connection;
pub use endpoint::parse_endpoint;
pub use error::{AppError, FrameError, SendError};
pub use framing::{FramingReader, DEFAULT_BUFFER_SIZE};
pub use handler::handle_connection;
pub use message::RelayMessage;
pub use notify::{ChannelNotifier, ConsoleNotifier, Notification, Notifier, TracingNotifier};
pub use registry::Registry;
pub use relay::{Relay, RelayCommand, RelayHandle};
pub use server::ChatServer;
pub use types::{ClientId, ClientIdGenerator};
