//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod message;
pub mod command;
pub mod connection;
pub mod event;
pub mod session;

pub use user::{BotIdentity, user_part};
pub use message::{InboundMessage, OutboundMessage, QuotedContext};
pub use command::{Command, CommandDefinition, CommandRegistry};
pub use connection::{CloseReason, ConnectionState, ConnectionUpdate};
pub use event::{MembershipAction, TransportEvent};
pub use session::{Credentials, Session};
