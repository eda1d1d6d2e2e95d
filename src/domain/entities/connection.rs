//! Connection lifecycle - states, close reasons and allowed transitions

use std::fmt;
use super::BotIdentity;

/// Why a connection ended
///
/// Only `LOGGED_OUT` is terminal. Everything else, including a close with no
/// status code at all, is worth reconnecting after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseReason {
    pub code: Option<u16>,
}

impl CloseReason {
    pub const CONNECTION_LOST: u16 = 408;
    pub const LOGGED_OUT: u16 = 401;
    pub const MULTIDEVICE_MISMATCH: u16 = 411;
    pub const CONNECTION_CLOSED: u16 = 428;
    pub const CONNECTION_REPLACED: u16 = 440;
    pub const BAD_SESSION: u16 = 500;
    pub const UNAVAILABLE_SERVICE: u16 = 503;
    pub const RESTART_REQUIRED: u16 = 515;

    pub fn new(code: u16) -> Self {
        Self { code: Some(code) }
    }

    pub fn unknown() -> Self {
        Self { code: None }
    }

    pub fn logged_out() -> Self {
        Self::new(Self::LOGGED_OUT)
    }

    pub fn is_terminal(&self) -> bool {
        self.code == Some(Self::LOGGED_OUT)
    }

    pub fn is_recoverable(&self) -> bool {
        !self.is_terminal()
    }

    pub fn label(&self) -> &'static str {
        match self.code {
            Some(Self::LOGGED_OUT) => "logged out",
            Some(Self::CONNECTION_LOST) => "connection lost",
            Some(Self::MULTIDEVICE_MISMATCH) => "multi-device mismatch",
            Some(Self::CONNECTION_CLOSED) => "connection closed",
            Some(Self::CONNECTION_REPLACED) => "connection replaced",
            Some(Self::BAD_SESSION) => "bad session",
            Some(Self::UNAVAILABLE_SERVICE) => "service unavailable",
            Some(Self::RESTART_REQUIRED) => "restart required",
            Some(_) => "unrecognized",
            None => "unknown",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} ({})", code, self.label()),
            None => write!(f, "{}", self.label()),
        }
    }
}

/// Lifecycle update reported by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionUpdate {
    Connecting,
    Open { identity: BotIdentity },
    Close { reason: CloseReason },
}

/// Supervisor-side view of the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed(CloseReason),
}

impl ConnectionState {
    /// Whether `next` may follow this state
    pub fn can_transition_to(&self, next: &ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Connecting, Open) => true,
            (Connecting, Closed(_)) => true,
            (Open, Closed(_)) => true,
            (Closed(reason), Connecting) => reason.is_recoverable(),
            _ => false,
        }
    }

    /// Move to `next`, or hand back the rejected pair
    pub fn transition(self, next: ConnectionState) -> Result<ConnectionState, (ConnectionState, ConnectionState)> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            Err((self, next))
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed(reason) => write!(f, "closed: {}", reason),
        }
    }
}

impl From<&ConnectionUpdate> for ConnectionState {
    fn from(update: &ConnectionUpdate) -> Self {
        match update {
            ConnectionUpdate::Connecting => ConnectionState::Connecting,
            ConnectionUpdate::Open { .. } => ConnectionState::Open,
            ConnectionUpdate::Close { reason } => ConnectionState::Closed(*reason),
        }
    }
}
