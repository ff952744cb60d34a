//! In-memory sink for tests and embedding

use std::sync::Mutex;
use async_trait::async_trait;

use crate::application::errors::ChatError;
use crate::domain::traits::OutputSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Record,
    Fail,
    Stall,
    HangOnClose,
}

#[derive(Debug, Default)]
struct Recorded {
    output: String,
    clears: usize,
    closes: usize,
}

/// Sink that records everything written to it
pub struct MemorySink {
    mode: Mode,
    recorded: Mutex<Recorded>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_mode(Mode::Record)
    }

    /// A sink whose every operation fails
    pub fn failing() -> Self {
        Self::with_mode(Mode::Fail)
    }

    /// A sink whose writes never complete
    pub fn stalled() -> Self {
        Self::with_mode(Mode::Stall)
    }

    /// A sink that records writes but whose close never completes
    pub fn hung_on_close() -> Self {
        Self::with_mode(Mode::HangOnClose)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Everything written so far, concatenated
    pub fn output(&self) -> String {
        self.recorded
            .lock()
            .map(|r| r.output.clone())
            .unwrap_or_default()
    }

    /// Written text split into lines, prompts stripped
    pub fn lines(&self) -> Vec<String> {
        self.output()
            .split("\r\n")
            .map(|l| l.trim_start_matches(crate::domain::entities::PROMPT).to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    pub fn clear_count(&self) -> usize {
        self.recorded.lock().map(|r| r.clears).unwrap_or_default()
    }

    pub fn close_count(&self) -> usize {
        self.recorded.lock().map(|r| r.closes).unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    async fn check(&self, what: &str) -> Result<(), ChatError> {
        match self.mode {
            Mode::Record => Ok(()),
            Mode::Fail => Err(ChatError::SinkUnavailable(format!("memory sink refused {}", what))),
            Mode::Stall => std::future::pending().await,
            Mode::HangOnClose if what == "close" => std::future::pending().await,
            Mode::HangOnClose => Ok(()),
        }
    }

    fn record<F: FnOnce(&mut Recorded)>(&self, f: F) -> Result<(), ChatError> {
        let mut recorded = self
            .recorded
            .lock()
            .map_err(|_| ChatError::Internal("Lock poisoned".to_string()))?;
        f(&mut recorded);
        Ok(())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn write(&self, text: &str) -> Result<(), ChatError> {
        self.check("write").await?;
        self.record(|r| r.output.push_str(text))
    }

    async fn clear_screen(&self) -> Result<(), ChatError> {
        self.check("clear").await?;
        self.record(|r| r.clears += 1)
    }

    async fn close(&self) -> Result<(), ChatError> {
        self.check("close").await?;
        self.record(|r| r.closes += 1)
    }
}
