// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Client Session Handling
//!
//! Owns one client connection from accept to close: reads raw messages,
//! parses them, hands them to the dispatcher and writes replies. Push lines
//! from other sessions arrive over an mpsc channel multiplexed with the
//! socket reads.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatch::Dispatcher;
use crate::metrics::RelayMetrics;
use crate::protocol;

/// One socket read is one protocol message. The wire format carries no
/// delimiter or length framing, so a message must arrive in a single read
/// and fit this buffer.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Capacity of the per-session push channel.
const PUSH_CHANNEL_CAPACITY: usize = 64;

/// Shared dependencies for handling one client connection.
pub struct SessionDeps {
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: RelayMetrics,
}

/// Handles one client connection until an EXIT, a failed read or write, or
/// the peer closing the socket. Reads block indefinitely; a silently dead
/// peer is only noticed on the next failed read or write.
pub async fn handle_connection(stream: TcpStream, deps: SessionDeps) {
    let SessionDeps {
        dispatcher,
        metrics,
    } = deps;

    // Short random label so log lines from concurrent sessions can be told
    // apart without logging peer identity.
    let session = uuid::Uuid::new_v4().to_string()[..8].to_string();

    let (mut reader, mut writer) = stream.into_split();

    // Other sessions deliver pushes through this channel; LOGIN hands the
    // sender to the account. Dropping the receiver when this function
    // returns is what makes a dead session detectable from outside.
    let (push_tx, mut push_rx) = mpsc::channel::<String>(PUSH_CHANNEL_CAPACITY);

    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        tokio::select! {
            read = reader.read(&mut buf) => {
                let n = match read {
                    Ok(0) => {
                        debug!("[{}] disconnected", session);
                        break;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        debug!("[{}] read failed: {}", session, e);
                        break;
                    }
                };
                metrics.messages_received.inc();

                let text = String::from_utf8_lossy(&buf[..n]);
                let line = text.trim();

                match protocol::parse(line) {
                    Ok(command) => {
                        let reply = dispatcher.dispatch(command, &push_tx);
                        if let Some(response) = reply.line {
                            if write_line(&mut writer, &response).await.is_err() {
                                warn!("[{}] write failed", session);
                                break;
                            }
                        }
                        if reply.disconnect {
                            debug!("[{}] exit requested", session);
                            break;
                        }
                    }
                    Err(e) => {
                        metrics.messages_invalid.inc();
                        // Malformed content of a known command gets that
                        // command's generic failure; anything else is logged
                        // and the session keeps listening.
                        match e.failure_reply() {
                            Some(response) => {
                                if write_line(&mut writer, &response).await.is_err() {
                                    warn!("[{}] write failed", session);
                                    break;
                                }
                            }
                            None => debug!("[{}] invalid message: {}", session, e),
                        }
                    }
                }
            }
            Some(push) = push_rx.recv() => {
                if write_line(&mut writer, &push).await.is_err() {
                    warn!("[{}] push write failed", session);
                    break;
                }
            }
        }
    }

    // Release the connection on every exit path: shutting down the write
    // half flushes it, dropping both halves closes the socket, and dropping
    // push_rx closes the account's stored sender.
    let _ = writer.shutdown().await;
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await
}
