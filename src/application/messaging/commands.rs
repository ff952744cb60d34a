//! Built-in chat commands

use async_trait::async_trait;

use crate::application::errors::ChatError;
use crate::domain::entities::{Arity, Command, CommandTable};
use crate::domain::traits::{CommandContext, CommandHandler, CommandOutcome};

/// Goodbye line written by `quit`
pub const GOODBYE: &str = "Goodbye!";

/// One-line listing of every command name
pub fn help_listing(commands: &CommandTable) -> String {
    let names: Vec<&str> = commands.names().collect();
    format!("Commands: {}", names.join(" "))
}

/// Line delivered to the target of `send`
pub fn direct_message(sender: &str, text: &str) -> String {
    format!("Message from Client[{}]: {}", sender, text)
}

/// Lists all command names
pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<CommandOutcome, ChatError> {
        ctx.session.notify(&help_listing(ctx.commands)).await;
        Ok(CommandOutcome::Continue)
    }
}

/// Writes the arguments back to the issuing session
pub struct EchoCommand;

#[async_trait]
impl CommandHandler for EchoCommand {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<CommandOutcome, ChatError> {
        ctx.session.notify(&ctx.args.join(" ")).await;
        Ok(CommandOutcome::Continue)
    }
}

/// Direct message to one connected user
pub struct SendCommand;

#[async_trait]
impl CommandHandler for SendCommand {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<CommandOutcome, ChatError> {
        let (target, words) = ctx
            .args
            .split_first()
            .ok_or_else(|| ChatError::malformed("send", "missing target user"))?;

        let recipient = ctx.registry.lookup(target).await?;
        let line = direct_message(ctx.session.username(), &words.join(" "));
        ctx.registry.deliver(&recipient, &line).await?;

        tracing::debug!("{} -> {}", ctx.session, recipient);
        Ok(CommandOutcome::Continue)
    }
}

/// Says goodbye and closes the issuing session's connection.
///
/// Registry removal and the disconnect notice are left to the lifecycle
/// coordinator, which acts on [`CommandOutcome::Disconnect`].
pub struct QuitCommand;

#[async_trait]
impl CommandHandler for QuitCommand {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<CommandOutcome, ChatError> {
        ctx.session.notify(GOODBYE).await;
        ctx.session.disconnect().await;
        Ok(CommandOutcome::Disconnect)
    }
}

/// Clears the issuing session's screen
pub struct ClearCommand;

#[async_trait]
impl CommandHandler for ClearCommand {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<CommandOutcome, ChatError> {
        ctx.session.clear_screen().await?;
        Ok(CommandOutcome::Continue)
    }
}

/// The fixed command set
pub fn default_commands() -> CommandTable {
    CommandTable::new()
        .with(Command::new("help", HelpCommand).with_arity(Arity::None))
        .with(Command::new("echo", EchoCommand))
        .with(Command::new("send", SendCommand).with_arity(Arity::AtLeast(1)))
        .with(Command::new("quit", QuitCommand).with_arity(Arity::None))
        .with(Command::new("clear", ClearCommand).with_arity(Arity::None))
}
