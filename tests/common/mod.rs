// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common test utilities for relay integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use chatline_relay::directory::UserDirectory;
use chatline_relay::dispatch::Dispatcher;
use chatline_relay::metrics::RelayMetrics;
use chatline_relay::session::{self, SessionDeps};

/// Builds a directory seeded with the given `(username, password)` pairs.
#[allow(dead_code)]
pub fn seeded_directory(accounts: &[(&str, &str)]) -> Arc<UserDirectory> {
    Arc::new(UserDirectory::from_credentials(
        accounts
            .iter()
            .map(|(username, password)| (username.to_string(), password.to_string())),
    ))
}

/// Starts a test server on port 0 that serves connections against the given
/// directory until the test ends. Returns the address to connect to.
#[allow(dead_code)]
pub async fn start_test_server(directory: Arc<UserDirectory>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let metrics = RelayMetrics::new();
    let dispatcher = Arc::new(Dispatcher::new(directory, metrics.clone()));

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let deps = SessionDeps {
                dispatcher: dispatcher.clone(),
                metrics: metrics.clone(),
            };
            tokio::spawn(session::handle_connection(stream, deps));
        }
    });

    addr
}

/// A line-oriented test client speaking the relay's text protocol.
#[allow(dead_code)]
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

#[allow(dead_code)]
impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, write_half) = stream.into_split();
        TestClient {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Sends one wire message (one message per read on the server side).
    pub async fn send(&mut self, message: &str) {
        self.writer.write_all(message.as_bytes()).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Receives the next newline-terminated response line.
    pub async fn recv(&mut self) -> String {
        let mut line = String::new();
        let n = timeout(Duration::from_secs(3), self.reader.read_line(&mut line))
            .await
            .expect("Timeout waiting for response")
            .expect("Read failed");
        assert!(n > 0, "Connection closed while waiting for a response");
        line.trim_end().to_string()
    }

    /// Tries to receive a line with a short timeout. Returns None if nothing
    /// arrives; used to assert that a command produced no response.
    pub async fn try_recv(&mut self) -> Option<String> {
        let mut line = String::new();
        match timeout(Duration::from_millis(200), self.reader.read_line(&mut line)).await {
            Ok(Ok(0)) => None,
            Ok(Ok(_)) => Some(line.trim_end().to_string()),
            Ok(Err(_)) => None,
            Err(_) => None,
        }
    }

    /// Asserts that the server closes the connection (EOF).
    pub async fn expect_closed(&mut self) {
        let mut line = String::new();
        let n = timeout(Duration::from_secs(3), self.reader.read_line(&mut line))
            .await
            .expect("Timeout waiting for close")
            .expect("Read failed");
        assert_eq!(n, 0, "Expected the server to close the connection");
    }

    /// Logs in and returns the response line.
    pub async fn login(&mut self, username: &str, password: &str) -> String {
        self.send(&format!("LOGIN REQUEST={}.{}", username, password))
            .await;
        self.recv().await
    }
}
