//! Application layer errors

use thiserror::Error;

/// Errors raised while serving a chat session.
///
/// Every variant is recoverable: the dispatcher renders it as an
/// `Error: ...` line to the issuing session and keeps the session alive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("User {0} is already connected")]
    DuplicateUser(String),

    #[error("No such user: {0}")]
    UserNotFound(String),

    #[error("{command}: {reason}")]
    MalformedCommand { command: String, reason: String },

    #[error("Output unavailable: {0}")]
    SinkUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn malformed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        ChatError::MalformedCommand {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Audit log errors
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
