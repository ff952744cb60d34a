//! Domain entities - Core objects of the chat service

pub mod command;
pub mod session;

pub use command::{Arity, Command, CommandTable};
pub use session::{Session, SessionState, DEFAULT_WRITE_TIMEOUT, LINE_TERMINATOR, PROMPT};
