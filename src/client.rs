//! ChatClient implementation
//!
//! The client side of the relay: one outbound connection, no registry and no
//! broadcast. Every message read off the stream goes straight to the notifier.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::connection::Connection;
use crate::endpoint::parse_endpoint;
use crate::error::AppError;
use crate::framing::FramingReader;
use crate::notify::Notifier;

/// A live connection and its receive worker
struct Session {
    connection: Connection,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Chat client
pub struct ChatClient {
    notifier: Arc<dyn Notifier>,
    session: Option<Session>,
}

impl ChatClient {
    /// Create a disconnected client reporting to `notifier`
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            session: None,
        }
    }

    /// Connect to the address and port typed by the user
    ///
    /// Every validation problem is logged; the first one is returned.
    pub async fn connect(&mut self, address: &str, port: &str) -> Result<SocketAddr, AppError> {
        if self.is_connected() {
            return Err(self.report(AppError::AlreadyConnected));
        }

        let addr = match parse_endpoint(address, port) {
            Ok(addr) => addr,
            Err(errors) => {
                let reported: Vec<AppError> = errors.into_iter().map(|e| self.report(e)).collect();
                return Err(reported.into_iter().next().unwrap_or(AppError::InvalidAddress));
            }
        };

        self.connect_to(addr).await
    }

    /// Connect to an already parsed address
    ///
    /// Returns the local address of the new connection.
    pub async fn connect_to(&mut self, addr: SocketAddr) -> Result<SocketAddr, AppError> {
        if self.is_connected() {
            return Err(self.report(AppError::AlreadyConnected));
        }

        let stream = match TcpStream::connect(addr).await {
            Ok(stream) => stream,
            Err(source) => return Err(self.report(AppError::Connect { addr, source })),
        };
        let local_addr = match stream.local_addr() {
            Ok(local_addr) => local_addr,
            Err(e) => return Err(self.report(AppError::Io(e))),
        };

        let (read_half, write_half) = stream.into_split();
        let connection = Connection::spawn(None, addr, write_half);

        info!("Connected to {} from {}", addr, local_addr);
        self.notifier.on_connection_state_changed(true);
        self.notifier.on_log(Some("You are connected to the server..."));

        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(receive_loop(
            FramingReader::new(read_half),
            connection.clone(),
            stop_rx,
            self.notifier.clone(),
        ));

        self.session = Some(Session {
            connection,
            stop,
            task,
        });

        Ok(local_addr)
    }

    /// Close the connection and wait for the receive worker to finish
    pub async fn disconnect(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let _ = session.stop.send(());
        if let Err(e) = session.task.await {
            warn!("Receive loop ended abnormally: {}", e);
        }
    }

    /// Send text to the server
    ///
    /// The line is always echoed to the log; empty text is ignored.
    pub fn send_local(&self, text: &str) -> Result<(), AppError> {
        if text.is_empty() {
            return Ok(());
        }

        self.notifier.on_log(Some(&format!("You: {}", text)));

        match &self.session {
            Some(session) if self.is_connected() => session
                .connection
                .send(text)
                .map_err(|_| AppError::NotConnected),
            _ => Err(AppError::NotConnected),
        }
    }

    /// Whether the receive worker is still running
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.task.is_finished())
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

/// Read messages until the server hangs up or a disconnect is requested
async fn receive_loop(
    mut reader: FramingReader<OwnedReadHalf>,
    connection: Connection,
    mut stop: oneshot::Receiver<()>,
    notifier: Arc<dyn Notifier>,
) {
    loop {
        tokio::select! {
            _ = &mut stop => {
                debug!("Disconnect requested");
                break;
            }
            result = reader.read_message() => match result {
                Some(Ok(text)) => notifier.on_log(Some(&text)),
                Some(Err(e)) => {
                    warn!("Read error from server: {}", e);
                    notifier.on_log(Some(&format!("Something went wrong: {}", e)));
                }
                None => break,
            }
        }
    }

    connection.close();
    info!("Disconnected from {}", connection.peer_addr());
    notifier.on_connection_state_changed(false);
    notifier.on_log(Some("You have disconnected from the server..."));
}
