//! Domain traits - Abstractions for transport and command implementations

pub mod command;
pub mod sink;

pub use command::{CommandContext, CommandHandler, CommandOutcome};
pub use sink::OutputSink;
