//! Line-oriented TCP transport
//!
//! Each connection logs in with a username (and a password when credentials
//! are configured), then every received line is handed to the lifecycle
//! coordinator. Output is queued per connection and written by a dedicated
//! task, so a slow peer only ever stalls its own queue.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::application::errors::ChatError;
use crate::application::messaging::DispatchOutcome;
use crate::application::services::LifecycleCoordinator;
use crate::domain::traits::OutputSink;
use crate::infrastructure::config::Config;

/// ANSI erase-display plus cursor-home
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

const OUTPUT_BUFFER: usize = 64;

enum Outbound {
    Text(String),
    Close,
}

/// Output side of one TCP connection
pub struct TcpSink {
    tx: mpsc::Sender<Outbound>,
    closed: watch::Sender<bool>,
}

impl TcpSink {
    fn new(tx: mpsc::Sender<Outbound>) -> (Self, watch::Receiver<bool>) {
        let (closed, closed_rx) = watch::channel(false);
        (Self { tx, closed }, closed_rx)
    }
}

#[async_trait]
impl OutputSink for TcpSink {
    async fn write(&self, text: &str) -> Result<(), ChatError> {
        self.tx
            .send(Outbound::Text(text.to_string()))
            .await
            .map_err(|_| ChatError::SinkUnavailable("connection closed".to_string()))
    }

    async fn clear_screen(&self) -> Result<(), ChatError> {
        self.write(CLEAR_SCREEN).await
    }

    async fn close(&self) -> Result<(), ChatError> {
        let _ = self.closed.send(true);
        // A full queue means the peer stopped reading; the connection task
        // aborts the writer once its flush bound runs out.
        let _ = self.tx.try_send(Outbound::Close);
        Ok(())
    }
}

async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::Receiver<Outbound>, peer: SocketAddr) {
    while let Some(item) = rx.recv().await {
        match item {
            Outbound::Text(text) => {
                if let Err(e) = writer.write_all(text.as_bytes()).await {
                    tracing::warn!("[{}] Write failed: {}", peer, e);
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = writer.shutdown().await;
}

/// TCP front end for the chatroom
pub struct TcpTransport {
    config: Arc<Config>,
    coordinator: Arc<LifecycleCoordinator>,
}

impl TcpTransport {
    pub fn new(config: Arc<Config>, coordinator: Arc<LifecycleCoordinator>) -> Self {
        Self { config, coordinator }
    }

    /// Bind the configured address and serve forever
    pub async fn run(&self) -> io::Result<()> {
        let listener = TcpListener::bind(&self.config.server.listen).await?;
        self.serve(listener).await
    }

    /// Accept connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> io::Result<()> {
        tracing::info!("{} listening on {}", self.config.server.name, listener.local_addr()?);

        loop {
            let (stream, peer) = listener.accept().await?;
            tracing::debug!("[{}] Accepted connection", peer);

            let config = self.config.clone();
            let coordinator = self.coordinator.clone();
            tokio::spawn(async move {
                handle_connection(stream, peer, config, coordinator).await;
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    config: Arc<Config>,
    coordinator: Arc<LifecycleCoordinator>,
) {
    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::channel(OUTPUT_BUFFER);
    let mut writer = tokio::spawn(write_loop(write_half, rx, peer));
    let (sink, mut closed) = TcpSink::new(tx);
    let sink = Arc::new(sink);
    let mut lines = BufReader::new(read_half).lines();

    let Some(username) = login(&sink, &mut lines, &config, peer).await else {
        let _ = sink.close().await;
        finish_writer(&mut writer, &config, peer).await;
        return;
    };

    let session = match coordinator.connect(username, sink.clone()).await {
        Ok(session) => session,
        Err(_) => {
            finish_writer(&mut writer, &config, peer).await;
            return;
        }
    };

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    match coordinator.handle_line(&session, &line).await {
                        DispatchOutcome::Disconnect | DispatchOutcome::Closed => break,
                        _ => {}
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("[{}] Read failed: {}", peer, e);
                    break;
                }
            },
            _ = closed.changed() => break,
        }
    }

    coordinator.disconnect(&session).await;
    finish_writer(&mut writer, &config, peer).await;
}

/// Let the writer flush what is queued, aborting it if the peer stopped reading
async fn finish_writer(writer: &mut JoinHandle<()>, config: &Config, peer: SocketAddr) {
    if timeout(config.sink_timeout(), &mut *writer).await.is_err() {
        tracing::warn!("[{}] Output not drained in time, dropping connection", peer);
        writer.abort();
    }
}

async fn login<R>(
    sink: &TcpSink,
    lines: &mut Lines<R>,
    config: &Config,
    peer: SocketAddr,
) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    sink.write("login: ").await.ok()?;
    let username = lines.next_line().await.ok()??.trim().to_string();

    let password = if config.credentials.enabled {
        sink.write("password: ").await.ok()?;
        Some(lines.next_line().await.ok()??.trim().to_string())
    } else {
        None
    };

    if config.verify(&username, password.as_deref()) {
        Some(username)
    } else {
        tracing::warn!("[{}] Login refused for {:?}", peer, username);
        let _ = sink.write("Access denied\r\n").await;
        None
    }
}
