//! Message handling - Line parsing and command dispatch

pub mod commands;
pub mod dispatcher;
pub mod parser;

pub use commands::{default_commands, help_listing};
pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use parser::{LineParser, ParsedLine};
