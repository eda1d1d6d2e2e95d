//! Command dispatcher - Routes prefixed messages to reply handlers

use crate::application::errors::CommandError;
use crate::domain::entities::{BotIdentity, CommandRegistry, InboundMessage, OutboundMessage};
use super::handlers::{self, HandlerContext, HELP_COMMAND};
use super::parser::CommandParser;

/// Parses inbound text and routes it through the command table
pub struct CommandDispatcher {
    parser: CommandParser,
    registry: CommandRegistry,
    bot_name: String,
}

impl CommandDispatcher {
    /// Build a dispatcher with the built-in commands. Fails on an invalid table.
    pub fn new(prefix: char, bot_name: impl Into<String>) -> Result<Self, CommandError> {
        let mut registry = CommandRegistry::new();
        handlers::register_defaults(&mut registry)?;
        Self::with_registry(prefix, bot_name, registry)
    }

    pub fn with_registry(prefix: char, bot_name: impl Into<String>, registry: CommandRegistry) -> Result<Self, CommandError> {
        registry.validate(prefix, HELP_COMMAND)?;
        Ok(Self {
            parser: CommandParser::new(prefix),
            registry,
            bot_name: bot_name.into(),
        })
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Produce the reply to a message, if any
    ///
    /// Messages without the prefix yield nothing. Unknown commands get a
    /// reply pointing at the help command; nothing here returns an error.
    pub fn dispatch(&self, message: &InboundMessage, identity: &BotIdentity) -> Option<OutboundMessage> {
        let command = self.parser.parse(message.text()?)?;

        let ctx = HandlerContext {
            message,
            args: &command.args,
            identity,
            bot_name: &self.bot_name,
            prefix: self.parser.prefix(),
        };

        match self.registry.get(&command.name) {
            Some(definition) => {
                tracing::debug!("[{}] Command: {} args: {:?}", message.chat_id, command.name, command.args);
                (definition.handler)(&ctx)
            }
            None => {
                tracing::debug!("[{}] Unknown command: {:?}", message.chat_id, command.name);
                Some(handlers::unknown_command(&ctx, &command.name))
            }
        }
    }
}
