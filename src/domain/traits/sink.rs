use async_trait::async_trait;
use crate::application::errors::ChatError;

/// Output side of a transport connection.
///
/// Implemented by transport adapters; the core only ever writes text,
/// asks for a screen clear, or asks for the connection to be closed.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Write raw text. No terminator is appended.
    async fn write(&self, text: &str) -> Result<(), ChatError>;

    /// Clear the user's screen buffer
    async fn clear_screen(&self) -> Result<(), ChatError>;

    /// Terminate the underlying connection
    async fn close(&self) -> Result<(), ChatError>;
}
