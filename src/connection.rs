//! Outbound side of a connection
//!
//! A `Connection` is the handle other tasks use to talk to one peer. Sends
//! go into a per-connection queue drained by a single writer task that owns
//! the write half of the stream, so two sends to the same peer never race.
//! The read half stays with the worker that runs the `FramingReader`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::SendError;
use crate::types::ClientId;

/// Item in a connection's outbound queue
#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

/// Handle to one connected peer
///
/// Cheap to clone; all clones share the same queue and closed flag.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Server-assigned identifier (None on the client side)
    id: Option<ClientId>,
    /// Remote address
    peer_addr: SocketAddr,
    /// Queue feeding the writer task
    sender: mpsc::UnboundedSender<Outbound>,
    /// Set by the first `close`
    closed: Arc<AtomicBool>,
}

impl Connection {
    /// Create a connection and start its writer task on `writer`
    pub fn spawn<W>(id: Option<ClientId>, peer_addr: SocketAddr, writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(writer, receiver, peer_addr));

        Self {
            id,
            peer_addr,
            sender,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Identifier assigned by the server, if any
    pub fn id(&self) -> Option<ClientId> {
        self.id
    }

    /// Remote address of the peer
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Queue `text` for delivery without waiting for the write
    ///
    /// Returns an error if the connection was closed or its writer has stopped.
    pub fn send(&self, text: impl Into<String>) -> Result<(), SendError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SendError::ChannelClosed);
        }
        self.sender
            .send(Outbound::Text(text.into()))
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Whether the connection still accepts sends
    pub fn is_live(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.sender.is_closed()
    }

    /// Close the connection
    ///
    /// Messages queued before the close are still written, then the write
    /// half is shut down. Returns true only for the call that actually
    /// closed it.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let _ = self.sender.send(Outbound::Close);
        true
    }
}

/// Writer task: drains the queue in order until closed
async fn write_loop<W>(mut writer: W, mut receiver: mpsc::UnboundedReceiver<Outbound>, peer: SocketAddr)
where
    W: AsyncWrite + Unpin,
{
    while let Some(item) = receiver.recv().await {
        match item {
            Outbound::Text(text) => {
                // No retry: a failed write loses this message only
                if let Err(e) = write_text(&mut writer, &text).await {
                    warn!("Write to {} failed: {}", peer, e);
                }
            }
            Outbound::Close => break,
        }
    }

    let _ = writer.shutdown().await;
    debug!("Writer task ended for {}", peer);
}

async fn write_text<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> std::io::Result<()> {
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await
}
