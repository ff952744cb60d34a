//! Line parser - Splits a raw input line into a command and its arguments

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Nothing but whitespace
    Empty,
    Command { name: String, args: Vec<String> },
}

/// Parses raw input lines
#[derive(Debug, Default, Clone, Copy)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }

    /// Trim the line, then split it on whitespace: the first word is the
    /// command, the rest are its arguments in order.
    pub fn parse(&self, line: &str) -> ParsedLine {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return ParsedLine::Empty;
        };

        ParsedLine::Command {
            name: name.to_string(),
            args: parts.map(str::to_string).collect(),
        }
    }
}
