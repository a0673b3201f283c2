//! Chat Relay - Entry Point
//!
//! A console shell over the relay core: runs either the server or a client,
//! turns stdin lines into outgoing messages and prints the chat log.
//!
//! Usage: `chat_relay <server|client> [address] [port]`

use std::env;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_relay::{ChatClient, ChatServer, ConsoleNotifier, Notifier};

/// Default address
const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Default port
const DEFAULT_PORT: &str = "4050";

/// Shell command: clear the log
const CLEAR_COMMAND: &str = "/clear";

/// Shell command: leave
const QUIT_COMMAND: &str = "/quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "server".to_string());
    let address = args.next().unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
    let port = args.next().unwrap_or_else(|| DEFAULT_PORT.to_string());

    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    match mode.as_str() {
        "server" => {
            let mut server = ChatServer::new(notifier);
            server.start(&address, &port).await?;

            while let Some(line) = lines.next_line().await? {
                match line.trim_end() {
                    QUIT_COMMAND => break,
                    CLEAR_COMMAND => server.clear_log(),
                    text => {
                        if let Err(e) = server.send_local(text) {
                            error!("Failed to send: {}", e);
                        }
                    }
                }
            }

            server.stop().await;
        }
        "client" => {
            let mut client = ChatClient::new(notifier);
            client.connect(&address, &port).await?;

            while let Some(line) = lines.next_line().await? {
                match line.trim_end() {
                    QUIT_COMMAND => break,
                    CLEAR_COMMAND => client.clear_log(),
                    text => {
                        // Already echoed to the log; nothing more to show
                        let _ = client.send_local(text);
                    }
                }
            }

            client.disconnect().await;
        }
        other => {
            error!("Unknown mode '{}', expected 'server' or 'client'", other);
            return Err(format!("unknown mode: {}", other).into());
        }
    }

    info!("Shutting down");
    Ok(())
}
