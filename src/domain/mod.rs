//! Domain layer - Core bot types with no transport dependencies
//! 
//! This layer contains:
//! - Entities: Messages, commands, connection lifecycle, session credentials
//! - Traits: Seams for the protocol client (Connector, ConnectionHandle, SessionStore)

pub mod entities;
pub mod traits;
