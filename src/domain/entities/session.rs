use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

use crate::application::errors::ChatError;
use crate::domain::traits::OutputSink;

/// Interactive prompt marker written after every processed line
pub const PROMPT: &str = "$ ";

/// Terminator appended by [`Session::notify`]
pub const LINE_TERMINATOR: &str = "\r\n";

/// Upper bound on any single sink operation of a session
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Lifecycle of a session: `Connecting -> Connected -> Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Connecting = 0,
    Connected = 1,
    Disconnected = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Connecting,
            1 => SessionState::Connected,
            _ => SessionState::Disconnected,
        }
    }
}

/// One connected user: identity plus output capability.
pub struct Session {
    id: Uuid,
    username: String,
    sink: Arc<dyn OutputSink>,
    state: AtomicU8,
    closed: AtomicBool,
    // Keeps multi-part writes (line + prompt) contiguous.
    write_lock: Mutex<()>,
    write_timeout: Duration,
}

impl Session {
    pub fn new(username: impl Into<String>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            sink,
            state: AtomicU8::new(SessionState::Connecting as u8),
            closed: AtomicBool::new(false),
            write_lock: Mutex::new(()),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// `Connecting -> Connected`. Returns false from any other state.
    pub fn mark_connected(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Connected as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Move to `Disconnected`, returning the state left behind.
    ///
    /// Only the first caller gets `Some`; every later call returns `None`.
    pub fn mark_disconnected(&self) -> Option<SessionState> {
        let previous = self
            .state
            .swap(SessionState::Disconnected as u8, Ordering::SeqCst);
        match SessionState::from_u8(previous) {
            SessionState::Disconnected => None,
            state => Some(state),
        }
    }

    /// Write one line, reporting transport failures to the caller
    pub async fn try_notify(&self, line: &str) -> Result<(), ChatError> {
        self.bounded("write", async {
            let _guard = self.write_lock.lock().await;
            self.write_raw(&format!("{}{}", line, LINE_TERMINATOR)).await
        })
        .await
    }

    /// Write one line. Failures are logged and otherwise ignored.
    pub async fn notify(&self, line: &str) {
        if let Err(e) = self.try_notify(line).await {
            tracing::warn!("[{}] Failed to write line: {}", self.username, e);
        }
    }

    /// Write the prompt marker
    pub async fn prompt(&self) {
        let written = self
            .bounded("prompt", async {
                let _guard = self.write_lock.lock().await;
                self.write_raw(PROMPT).await
            })
            .await;
        if let Err(e) = written {
            tracing::warn!("[{}] Failed to write prompt: {}", self.username, e);
        }
    }

    /// Write one line followed by the prompt, without interleaving other writes
    pub async fn announce(&self, line: &str) -> Result<(), ChatError> {
        self.bounded("write", async {
            let _guard = self.write_lock.lock().await;
            if let Err(e) = self.write_raw(&format!("{}{}", line, LINE_TERMINATOR)).await {
                return Err(e);
            }
            self.write_raw(PROMPT).await
        })
        .await
    }

    pub async fn clear_screen(&self) -> Result<(), ChatError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChatError::SinkUnavailable(self.username.clone()));
        }
        self.bounded("clear", async {
            let _guard = self.write_lock.lock().await;
            self.sink.clear_screen().await
        })
        .await
    }

    /// Ask the transport to close the connection. Idempotent, and gives up
    /// after the write timeout if the transport does not respond.
    pub async fn disconnect(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.bounded("close", self.sink.close()).await {
            tracing::warn!("[{}] Failed to close connection: {}", self.username, e);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn bounded<F>(&self, what: &str, op: F) -> Result<(), ChatError>
    where
        F: Future<Output = Result<(), ChatError>>,
    {
        match timeout(self.write_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(ChatError::SinkUnavailable(format!(
                "{} {} timed out after {:?}",
                self.username, what, self.write_timeout
            ))),
        }
    }

    async fn write_raw(&self, text: &str) -> Result<(), ChatError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChatError::SinkUnavailable(self.username.clone()));
        }
        self.sink.write(text).await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Client[{}]", self.username)
    }
}
