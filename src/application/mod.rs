//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Connection supervision, event handling, group notifications
//! - Errors: Domain-specific errors
//! - Messaging: Command parsing, dispatching, reply templates

pub mod errors;
pub mod services;
pub mod messaging;
