use std::collections::BTreeMap;
use crate::application::errors::CommandError;
use crate::application::messaging::HandlerContext;
use super::OutboundMessage;

/// A parsed command: lowercased name with the prefix stripped, plus the rest of the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: String,
}

impl Command {
    pub fn new(name: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: args.into(),
        }
    }
}

/// Reply handler function type
pub type ReplyHandler = fn(&HandlerContext<'_>) -> Option<OutboundMessage>;

/// A registered command
#[derive(Clone)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    pub handler: ReplyHandler,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, handler: ReplyHandler) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            handler,
        }
    }
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Static name -> handler table
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandDefinition>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Names must be lowercase, non-empty and unique.
    pub fn register(&mut self, command: CommandDefinition) -> Result<(), CommandError> {
        let name = &command.name;
        if name.is_empty()
            || name.chars().any(char::is_whitespace)
            || name.to_lowercase() != *name
        {
            return Err(CommandError::InvalidName(name.clone()));
        }
        if self.commands.contains_key(name) {
            return Err(CommandError::Duplicate(name.clone()));
        }

        self.commands.insert(name.clone(), command);
        Ok(())
    }

    /// Check the table once it is complete
    pub fn validate(&self, prefix: char, help_command: &str) -> Result<(), CommandError> {
        if let Some(bad) = self.commands.keys().find(|name| name.contains(prefix)) {
            return Err(CommandError::InvalidName(bad.clone()));
        }
        if !self.commands.contains_key(help_command) {
            return Err(CommandError::MissingHelp(help_command.to_string()));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}
