//! Message framing over an undelimited byte stream
//!
//! The wire carries raw UTF-8 text with no length prefix and no delimiter.
//! A message boundary is inferred when the stream goes quiet: after a read
//! completes, the reader keeps draining for as long as more bytes are
//! ready *right now*, and treats the moment a read would have to wait as the
//! end of the message.
//!
//! This is a heuristic. Two bursts separated by a pause become two messages,
//! and two messages that arrive back to back become one. There is no way to
//! tell a message that ends exactly at a buffer boundary from one that was
//! flushed in two pieces.

use std::io;

use futures_util::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task;
use tracing::trace;

use crate::error::FrameError;

/// Receive buffer size, reused across reads
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Turns a byte stream into discrete text messages
#[derive(Debug)]
pub struct FramingReader<R> {
    reader: R,
    /// Fixed-capacity receive buffer
    buffer: Box<[u8]>,
    /// Bytes accumulated since the last delivered boundary
    pending: Vec<u8>,
    /// Peer closed or a fatal read error happened
    closed: bool,
}

impl<R: AsyncRead + Unpin> FramingReader<R> {
    /// Create a reader with the default buffer size
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUFFER_SIZE)
    }

    /// Create a reader with a specific receive buffer size (at least 1 byte)
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buffer: vec![0u8; capacity.max(1)].into_boxed_slice(),
            pending: Vec::new(),
            closed: false,
        }
    }

    /// Whether the stream has been closed by the peer or by a fatal error
    #[cfg(test)]
    fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read one complete message
    ///
    /// Returns `None` once the peer has closed the stream. A returned error
    /// means the in-flight message was discarded; the caller may keep
    /// calling, and will get `None` if the error closed the stream.
    pub async fn read_message(&mut self) -> Option<Result<String, FrameError>> {
        if self.closed {
            return None;
        }

        match self.reader.read(&mut self.buffer).await {
            Ok(0) => {
                self.closed = true;
                return None;
            }
            Ok(n) => self.pending.extend_from_slice(&self.buffer[..n]),
            Err(e) => return Some(Err(self.fail(e))),
        }

        // Drain whatever is immediately available. The readiness check runs
        // outside the coop budget, otherwise an exhausted budget reads as a
        // quiet stream.
        loop {
            match task::unconstrained(self.reader.read(&mut self.buffer)).now_or_never() {
                None => break,
                Some(Ok(0)) => {
                    // Deliver what we have, report the close on the next call
                    self.closed = true;
                    break;
                }
                Some(Ok(n)) => self.pending.extend_from_slice(&self.buffer[..n]),
                Some(Err(e)) => return Some(Err(self.fail(e))),
            }
        }

        let bytes = std::mem::take(&mut self.pending);
        trace!("Framed message of {} bytes", bytes.len());
        Some(String::from_utf8(bytes).map_err(FrameError::from))
    }

    fn fail(&mut self, err: io::Error) -> FrameError {
        self.pending.clear();
        if !is_transient(err.kind()) {
            self.closed = true;
        }
        FrameError::Io(err)
    }
}

fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
