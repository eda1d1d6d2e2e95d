//! Command parser - Turns prefixed message text into commands

use crate::domain::entities::Command;

/// Parses `<prefix><name> <args>` text into a Command
#[derive(Debug, Clone, Copy)]
pub struct CommandParser {
    prefix: char,
}

impl CommandParser {
    pub fn new(prefix: char) -> Self {
        Self { prefix }
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// Parse text into a command. Text without the prefix is not a command.
    ///
    /// The name is everything up to the first whitespace, lowercased. The
    /// rest, trimmed, is the argument string. A bare prefix gives an empty name.
    pub fn parse(&self, text: &str) -> Option<Command> {
        let body = text.strip_prefix(self.prefix)?;

        let (name, args) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };

        Some(Command::new(name.to_lowercase(), args))
    }
}
