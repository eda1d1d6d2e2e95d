//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session store error: {0}")]
    Session(#[from] StorageError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Pairing failed: {0}")]
    Pairing(String),

    #[error("Logged out: delete the session folder and pair again")]
    LoggedOut,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command table errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command registered twice: {0}")]
    Duplicate(String),

    #[error("Invalid command name: {0:?}")]
    InvalidName(String),

    #[error("Help command not registered: {0}")]
    MissingHelp(String),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
