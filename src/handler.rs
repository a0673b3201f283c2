//! Per-connection worker
//!
//! Handles one accepted TCP connection for its whole life: registration,
//! the read loop, and teardown.

use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::connection::Connection;
use crate::error::AppError;
use crate::framing::FramingReader;
use crate::message::RelayMessage;
use crate::notify::Notifier;
use crate::relay::RelayHandle;
use crate::types::ClientId;

/// Handle a newly accepted TCP connection
///
/// Registers it with the relay, relays every framed message to the other
/// clients, and on close removes it and announces the departure once.
pub async fn handle_connection(
    stream: TcpStream,
    client_id: ClientId,
    relay: RelayHandle,
    notifier: Arc<dyn Notifier>,
) -> Result<(), AppError> {
    let peer_addr = stream.peer_addr()?;
    let (read_half, write_half) = stream.into_split();

    let connection = Connection::spawn(Some(client_id), peer_addr, write_half);

    // Register with the relay, which announces the join
    if let Err(e) = relay.register(client_id, connection.clone()) {
        error!("Failed to register client {} - relay closed", client_id);
        connection.close();
        return Err(e);
    }

    info!("Client {} connected from {}", client_id, peer_addr);
    notifier.on_log(Some(&RelayMessage::Joined(client_id).to_string()));

    let mut reader = FramingReader::new(read_half);
    while let Some(result) = reader.read_message().await {
        match result {
            Ok(text) => {
                let message = RelayMessage::Chat {
                    from: client_id,
                    text,
                };
                notifier.on_log(Some(&message.to_string()));
                let origin = message.origin();
                if relay.broadcast(message, origin).is_err() {
                    debug!("Relay closed, ending read loop for {}", client_id);
                    break;
                }
            }
            Err(e) => {
                warn!("Read error from client {}: {}", client_id, e);
                notifier.on_log(Some(&format!("[/ {} /]", e)));
            }
        }
    }

    debug!("Read loop ended for {}", client_id);

    // Only the call that removes the entry announces the departure
    let removed = relay.disconnect(client_id).await.unwrap_or(false);
    connection.close();

    if removed {
        info!("Client {} disconnected", client_id);
        notifier.on_log(Some(&RelayMessage::Left(client_id).to_string()));
    }

    Ok(())
}
