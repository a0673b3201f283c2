//! ChatServer implementation
//!
//! Owns the listening socket and the accept loop. Every accepted connection
//! gets the next `ClientId` and its own worker task; all of them share one
//! relay actor, which outlives stop/start cycles.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::endpoint::parse_endpoint;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::message::RelayMessage;
use crate::notify::Notifier;
use crate::relay::{Relay, RelayHandle};
use crate::types::ClientIdGenerator;

/// A running accept loop
struct ListenerTask {
    local_addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// The relay server
///
/// Stopping only closes the listening socket. Connections that were already
/// accepted keep running until their peers hang up.
pub struct ChatServer {
    notifier: Arc<dyn Notifier>,
    ids: Arc<ClientIdGenerator>,
    /// Created on first start, kept across restarts
    relay: Option<RelayHandle>,
    listener: Option<ListenerTask>,
}

impl ChatServer {
    /// Create a stopped server reporting to `notifier`
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            ids: Arc::new(ClientIdGenerator::new()),
            relay: None,
            listener: None,
        }
    }

    /// Start listening on the address and port typed by the user
    ///
    /// Every validation problem is logged; the first one is returned.
    pub async fn start(&mut self, address: &str, port: &str) -> Result<SocketAddr, AppError> {
        if self.is_active() {
            return Err(self.report(AppError::AlreadyActive));
        }

        let addr = match parse_endpoint(address, port) {
            Ok(addr) => addr,
            Err(errors) => {
                let reported: Vec<AppError> = errors.into_iter().map(|e| self.report(e)).collect();
                return Err(reported.into_iter().next().unwrap_or(AppError::InvalidAddress));
            }
        };

        self.start_at(addr).await
    }

    /// Start listening on an already parsed address
    ///
    /// Returns the bound address, which differs from `addr` when port 0 was requested.
    pub async fn start_at(&mut self, addr: SocketAddr) -> Result<SocketAddr, AppError> {
        if self.is_active() {
            return Err(self.report(AppError::AlreadyActive));
        }

        self.notifier
            .on_log(Some("Server Started. Waiting for connections...."));

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => return Err(self.report(AppError::Bind { addr, source })),
        };
        let local_addr = match listener.local_addr() {
            Ok(local_addr) => local_addr,
            Err(e) => return Err(self.report(AppError::Io(e))),
        };

        let relay = self.relay.get_or_insert_with(Relay::spawn).clone();
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(
            listener,
            stop_rx,
            self.ids.clone(),
            relay,
            self.notifier.clone(),
        ));

        self.listener = Some(ListenerTask {
            local_addr,
            stop,
            task,
        });

        info!("Chat relay listening on {}", local_addr);
        self.notifier.on_connection_state_changed(true);
        self.notifier.on_log(Some("Server has started...."));

        Ok(local_addr)
    }

    /// Stop accepting connections
    ///
    /// Waits for the accept loop to drop the listening socket. Existing
    /// connections are not touched.
    pub async fn stop(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };

        let _ = listener.stop.send(());
        if let Err(e) = listener.task.await {
            warn!("Accept loop ended abnormally: {}", e);
        }

        info!("Stopped listening on {}", listener.local_addr);
        self.notifier.on_connection_state_changed(false);
        self.notifier.on_log(Some("Server has stopped..."));
    }

    /// Broadcast an operator message to every connected client
    ///
    /// Empty text is ignored.
    pub fn send_local(&self, text: &str) -> Result<(), AppError> {
        if text.is_empty() {
            return Ok(());
        }

        self.notifier.on_log(Some(&format!("Server (You): {}", text)));

        match &self.relay {
            Some(relay) => relay.broadcast(RelayMessage::Server(text.to_string()), None),
            None => Ok(()),
        }
    }

    /// Whether the accept loop is running
    pub fn is_active(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| !listener.task.is_finished())
    }

    /// Address the listener is bound to, while active
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|listener| listener.local_addr)
    }

    /// Number of clients currently registered
    pub async fn connected_count(&self) -> usize {
        match &self.relay {
            Some(relay) => relay.connected_count().await.unwrap_or(0),
            None => 0,
        }
    }

    /// Clear the user-visible log
    pub fn clear_log(&self) {
        self.notifier.on_log(None);
    }

    fn report(&self, err: AppError) -> AppError {
        error!("{}", err);
        self.notifier.on_log(Some(&err.log_line()));
        err
    }
}

/// Accept connections until told to stop
///
/// A failed accept only affects that one connection.
async fn accept_loop(
    listener: TcpListener,
    mut stop: oneshot::Receiver<()>,
    ids: Arc<ClientIdGenerator>,
    relay: RelayHandle,
    notifier: Arc<dyn Notifier>,
) {
    loop {
        tokio::select! {
            _ = &mut stop => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let client_id = ids.next_id();
                    debug!("New connection from {} as client {}", addr, client_id);

                    let relay = relay.clone();
                    let notifier = notifier.clone();

                    // Spawn worker task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, client_id, relay, notifier).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    notifier.on_log(Some(&format!("Something went wrong: {}", e)));
                }
            }
        }
    }

    debug!("Accept loop ended");
}
