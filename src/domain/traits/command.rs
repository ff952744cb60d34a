use std::sync::Arc;
use async_trait::async_trait;

use crate::application::errors::ChatError;
use crate::application::services::SessionRegistry;
use crate::domain::entities::{CommandTable, Session};

/// Everything a command body may touch while it runs
pub struct CommandContext<'a> {
    pub session: &'a Arc<Session>,
    pub registry: &'a SessionRegistry,
    pub commands: &'a CommandTable,
    pub args: &'a [String],
}

/// What the dispatcher should do with the session after a command ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Disconnect,
}

/// Command body
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<CommandOutcome, ChatError>;
}
