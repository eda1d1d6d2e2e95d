//! Reply handlers - Built-in commands and their reply templates

use crate::application::errors::CommandError;
use crate::domain::entities::{BotIdentity, CommandDefinition, CommandRegistry, InboundMessage, OutboundMessage};

/// Command that lists every other command
pub const HELP_COMMAND: &str = "menu";

/// Everything a handler may look at
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub message: &'a InboundMessage,
    pub args: &'a str,
    pub identity: &'a BotIdentity,
    pub bot_name: &'a str,
    pub prefix: char,
}

impl HandlerContext<'_> {
    fn reply(&self, text: impl Into<String>) -> Option<OutboundMessage> {
        Some(OutboundMessage::reply_to(self.message, text))
    }
}

fn ping(ctx: &HandlerContext<'_>) -> Option<OutboundMessage> {
    ctx.reply("🏓 Pong!")
}

fn info(ctx: &HandlerContext<'_>) -> Option<OutboundMessage> {
    ctx.reply(format!(
        "*Bot Information*\n\n📱 Bot Number: {}\n👤 Bot Name: {}\n⚡ Status: Online\n🔗 Session: Active",
        ctx.identity.phone_number(),
        ctx.identity.display_name(ctx.bot_name),
    ))
}

fn menu(ctx: &HandlerContext<'_>) -> Option<OutboundMessage> {
    let p = ctx.prefix;
    ctx.reply(format!(
        "*📋 Bot Commands*\n\n\
         {p}ping - Check bot status\n\
         {p}info - Bot information\n\
         {p}menu - Show this menu\n\
         {p}sticker - Reply to image to make sticker\n\
         {p}hello - Say hello"
    ))
}

fn hello(ctx: &HandlerContext<'_>) -> Option<OutboundMessage> {
    let name = ctx.message.sender_name.as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("User");
    ctx.reply(format!("👋 Hello {}! Welcome to {}", name, ctx.bot_name))
}

// Conversion to a sticker needs a media encoder; only the acknowledgment is sent.
fn sticker(ctx: &HandlerContext<'_>) -> Option<OutboundMessage> {
    if !ctx.message.carries_image() {
        return ctx.reply(format!("❌ Reply to an image with {}sticker", ctx.prefix));
    }
    ctx.reply("⏳ Creating sticker...")
}

/// Reply for a name that is not in the table
pub fn unknown_command(ctx: &HandlerContext<'_>, name: &str) -> OutboundMessage {
    OutboundMessage::reply_to(
        ctx.message,
        format!(
            "❌ Unknown command: {}\nType {}{} for available commands",
            name, ctx.prefix, HELP_COMMAND
        ),
    )
}

/// Register the built-in commands
pub fn register_defaults(registry: &mut CommandRegistry) -> Result<(), CommandError> {
    registry.register(CommandDefinition::new("ping", "Check bot status", ping))?;
    registry.register(CommandDefinition::new("info", "Bot information", info))?;
    registry.register(CommandDefinition::new(HELP_COMMAND, "Show this menu", menu))?;
    registry.register(CommandDefinition::new("sticker", "Reply to image to make sticker", sticker))?;
    registry.register(CommandDefinition::new("hello", "Say hello", hello))?;
    Ok(())
}
