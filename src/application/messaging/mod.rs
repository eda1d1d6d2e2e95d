//! Message handling - Command parsing, dispatch and reply templates

pub mod dispatcher;
pub mod handlers;
pub mod parser;

pub use dispatcher::CommandDispatcher;
pub use handlers::HandlerContext;
