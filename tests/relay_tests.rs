//! Integration tests for the chat relay
//!
//! These tests drive a real server over loopback TCP, with both raw sockets
//! and `ChatClient`s on the other end.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout};

use chat_relay::{ChannelNotifier, ChatClient, ChatServer, FramingReader, Notification, TracingNotifier};

const WAIT: Duration = Duration::from_secs(5);

/// Raw TCP peer that remembers everything it has read
struct RawPeer {
    reader: FramingReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    seen: String,
}

impl RawPeer {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            reader: FramingReader::new(read_half),
            writer,
            seen: String::new(),
        }
    }

    /// Read until `needle` has shown up somewhere in the received text
    async fn wait_for(&mut self, needle: &str) {
        let reader = &mut self.reader;
        let seen = &mut self.seen;
        timeout(WAIT, async {
            while !seen.contains(needle) {
                match reader.read_message().await {
                    Some(Ok(text)) => seen.push_str(&text),
                    Some(Err(e)) => panic!("read error while waiting for {:?}: {}", needle, e),
                    None => panic!("closed while waiting for {:?}, saw {:?}", needle, seen),
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {:?}", needle));
    }

    async fn next_message(&mut self) -> String {
        let text = timeout(WAIT, self.reader.read_message())
            .await
            .expect("timed out waiting for a message")
            .expect("stream closed")
            .expect("read error");
        self.seen.push_str(&text);
        text
    }

    async fn send(&mut self, text: &str) {
        self.writer.write_all(text.as_bytes()).await.unwrap();
    }
}

/// Collect log lines until one equals `expected`; returns every line seen
async fn wait_for_log(rx: &mut UnboundedReceiver<Notification>, expected: &str) -> Vec<String> {
    let mut lines = Vec::new();
    timeout(WAIT, async {
        while let Some(event) = rx.recv().await {
            if let Notification::Log(line) = event {
                let done = line == expected;
                lines.push(line);
                if done {
                    return;
                }
            }
        }
        panic!("notifier closed while waiting for {:?}", expected);
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {:?}, saw {:?}", expected, lines));
    lines
}

async fn eventually_connected(server: &ChatServer, expected: usize) {
    timeout(WAIT, async {
        while server.connected_count().await != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("registry never reached {} connections", expected));
}

async fn start_server() -> (ChatServer, SocketAddr) {
    let mut server = ChatServer::new(Arc::new(TracingNotifier));
    let addr = server.start("127.0.0.1", "0").await.unwrap();
    (server, addr)
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let mut server = ChatServer::new(Arc::new(TracingNotifier));
    server.start("127.0.0.1", "4050").await.unwrap();

    let (notifier_a, mut rx_a) = ChannelNotifier::new();
    let mut client_a = ChatClient::new(Arc::new(notifier_a));
    client_a.connect("127.0.0.1", "4050").await.unwrap();
    wait_for_log(&mut rx_a, "Client 1 connected").await;

    let (notifier_b, mut rx_b) = ChannelNotifier::new();
    let mut client_b = ChatClient::new(Arc::new(notifier_b));
    client_b.connect("127.0.0.1", "4050").await.unwrap();
    wait_for_log(&mut rx_b, "Client 2 connected").await;
    wait_for_log(&mut rx_a, "Client 2 connected").await;

    client_a.send_local("hi").unwrap();
    wait_for_log(&mut rx_b, "Client 1: hi").await;

    // Anything relayed back to A would arrive before this marker
    server.send_local("marker").unwrap();
    let lines = wait_for_log(&mut rx_a, "Server: marker").await;
    assert!(lines.contains(&"You: hi".to_string()));
    assert!(!lines.iter().any(|line| line.contains("Client 1: hi")));

    client_a.disconnect().await;
    client_b.disconnect().await;
    server.stop().await;
}

#[tokio::test]
async fn test_single_write_relayed_as_one_message() {
    let (mut server, addr) = start_server().await;

    let mut p1 = RawPeer::connect(addr).await;
    p1.wait_for("Client 1 connected").await;
    let mut p2 = RawPeer::connect(addr).await;
    p2.wait_for("Client 2 connected").await;
    p1.wait_for("Client 2 connected").await;

    p1.send("hello").await;
    assert_eq!(p2.next_message().await, "Client 1: hello");

    // An echo of "hello" would have been queued to p1 ahead of this reply
    p2.send("reply").await;
    assert_eq!(p1.next_message().await, "Client 2: reply");
    assert!(!p1.seen.contains("Client 1: hello"));

    server.stop().await;
}

#[tokio::test]
async fn test_disconnect_announced_once() {
    let (mut server, addr) = start_server().await;

    let mut p1 = RawPeer::connect(addr).await;
    p1.wait_for("Client 1 connected").await;
    let mut p2 = RawPeer::connect(addr).await;
    p2.wait_for("Client 2 connected").await;
    let mut p3 = RawPeer::connect(addr).await;
    p3.wait_for("Client 3 connected").await;
    p2.wait_for("Client 3 connected").await;
    eventually_connected(&server, 3).await;

    drop(p1);
    p2.wait_for("Client 1 disconnected").await;
    p3.wait_for("Client 1 disconnected").await;
    eventually_connected(&server, 2).await;

    server.send_local("marker").unwrap();
    p2.wait_for("Server: marker").await;
    p3.wait_for("Server: marker").await;
    assert_eq!(p2.seen.matches("Client 1 disconnected").count(), 1);
    assert_eq!(p3.seen.matches("Client 1 disconnected").count(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_registry_tracks_open_connections() {
    let (mut server, addr) = start_server().await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        tasks.push(tokio::spawn(TcpStream::connect(addr)));
    }
    let mut streams = Vec::new();
    for task in tasks {
        streams.push(task.await.unwrap().unwrap());
    }
    eventually_connected(&server, 20).await;

    let closing: Vec<TcpStream> = streams.drain(..10).collect();
    drop(closing);
    eventually_connected(&server, 10).await;

    drop(streams);
    eventually_connected(&server, 0).await;

    server.stop().await;
}

#[tokio::test]
async fn test_stop_leaves_existing_connections_running() {
    let (mut server, addr) = start_server().await;

    let mut p1 = RawPeer::connect(addr).await;
    p1.wait_for("Client 1 connected").await;
    let mut p2 = RawPeer::connect(addr).await;
    p2.wait_for("Client 2 connected").await;
    p1.wait_for("Client 2 connected").await;

    server.stop().await;
    assert!(!server.is_active());
    assert!(TcpStream::connect(addr).await.is_err());

    p1.send("still here").await;
    p2.wait_for("Client 1: still here").await;
    assert_eq!(server.connected_count().await, 2);
}

#[tokio::test]
async fn test_ids_keep_increasing_across_restart() {
    let (mut server, addr) = start_server().await;

    let mut p1 = RawPeer::connect(addr).await;
    p1.wait_for("Client 1 connected").await;
    server.stop().await;

    let addr = server.start_at("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let mut p2 = RawPeer::connect(addr).await;
    p2.wait_for("Client 2 connected").await;
    p1.wait_for("Client 2 connected").await;

    server.stop().await;
}
