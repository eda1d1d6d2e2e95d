use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::mpsc;
use crate::application::errors::BotError;
use crate::domain::entities::{Credentials, OutboundMessage, TransportEvent};

/// What the connector needs to open a session
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub credentials: Credentials,
    pub display_name: String,
}

/// Delivery acknowledgment from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: String,
}

/// A live connection: the handle to act on it and the event stream it produces
///
/// Both halves belong to one session. A reconnect builds a new `Connection`
/// and the old one is dropped.
pub struct Connection {
    pub handle: Arc<dyn ConnectionHandle>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// ConnectionHandle trait - operations on a live connection
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// Send a message to `message.target_chat_id`
    async fn send(&self, message: OutboundMessage) -> Result<SendReceipt, BotError>;

    /// Ask the server for a pairing code, optionally a custom one
    async fn request_pairing_code(&self, phone_number: &str, custom_code: Option<&str>) -> Result<String, BotError>;
}

/// Connector trait - the protocol client's session establishment
#[async_trait]
pub trait Connector: Send + Sync {
    /// Name used in logs, e.g. "WhatsApp"
    fn name(&self) -> &'static str;

    /// Where the operator enters a pairing code
    fn pairing_hint(&self) -> &'static str;

    async fn connect(&self, options: ConnectOptions) -> Result<Connection, BotError>;
}
