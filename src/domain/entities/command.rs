use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::application::errors::ChatError;
use crate::domain::traits::CommandHandler;

/// Argument policy of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No arguments accepted
    None,
    /// At least this many arguments
    AtLeast(usize),
    /// Anything goes
    Any,
}

impl Arity {
    pub fn check(&self, command: &str, args: &[String]) -> Result<(), ChatError> {
        match *self {
            Arity::None if !args.is_empty() => Err(ChatError::malformed(
                command,
                format!("takes no arguments ({} given)", args.len()),
            )),
            Arity::AtLeast(min) if args.len() < min => Err(ChatError::malformed(
                command,
                format!("expects at least {} argument(s) ({} given)", min, args.len()),
            )),
            _ => Ok(()),
        }
    }
}

/// Represents a chat command
pub struct Command {
    pub name: String,
    pub arity: Arity,
    pub handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn new<H>(name: impl Into<String>, handler: H) -> Self
    where
        H: CommandHandler + 'static,
    {
        Self {
            name: name.into(),
            arity: Arity::Any,
            handler: Arc::new(handler),
        }
    }

    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Fixed set of commands, built once at startup.
///
/// Names are kept sorted so listings are stable.
#[derive(Default)]
pub struct CommandTable {
    commands: BTreeMap<String, Command>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Command) {
        self.commands.insert(command.name.clone(), command);
    }

    pub fn with(mut self, command: Command) -> Self {
        self.register(command);
        self
    }

    /// Case-sensitive exact lookup
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
