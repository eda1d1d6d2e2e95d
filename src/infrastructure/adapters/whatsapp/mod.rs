//! WhatsApp Web transport over `whatsapp-rust`
//!
//! Each `connect` builds a fresh client on the device store kept in the
//! session folder and forwards its events in arrival order. Reconnecting is
//! the supervisor's job, so the client is shut down once its event stream
//! is dropped.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use wacore::types::events::Event;
use wacore::types::message::MessageInfo;
use wacore_binary::jid::Jid;
use waproto::whatsapp as wa;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::client::Client;
use whatsapp_rust::pair_code::PairCodeOptions;
use whatsapp_rust::store::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

use crate::application::errors::BotError;
use crate::domain::entities::{
    BotIdentity, CloseReason, ConnectionUpdate, Credentials, InboundMessage, OutboundMessage,
    QuotedContext, TransportEvent,
};
use crate::domain::traits::{Connection, ConnectionHandle, ConnectOptions, Connector, SendReceipt};

/// Device keys file inside the session folder
const DEVICE_DB: &str = "whatsapp.db";

const EVENT_BUFFER: usize = 256;

/// How long to wait for the socket before asking for a pairing code
const PAIRING_READY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct WhatsAppConnector {
    session_path: PathBuf,
    phone_number: String,
}

impl WhatsAppConnector {
    pub fn new(session_path: impl Into<PathBuf>, phone_number: impl Into<String>) -> Self {
        Self {
            session_path: session_path.into(),
            phone_number: phone_number.into(),
        }
    }
}

#[async_trait]
impl Connector for WhatsAppConnector {
    fn name(&self) -> &'static str {
        "WhatsApp"
    }

    fn pairing_hint(&self) -> &'static str {
        "Enter this code in WhatsApp > Linked Devices > Link a Device"
    }

    async fn connect(&self, options: ConnectOptions) -> Result<Connection, BotError> {
        let db_path = self.session_path.join(DEVICE_DB);
        let backend = SqliteStore::new(db_path.to_string_lossy().as_ref())
            .await
            .map_err(|e| BotError::Connection(format!("failed to open device store: {}", e)))?;

        let (tx, events) = mpsc::channel(EVENT_BUFFER);
        // Flips once the server offers pairing, which is when a code may be requested
        let (ready_tx, ready) = watch::channel(false);
        let ready_tx = Arc::new(ready_tx);
        let identity = BotIdentity::new(format!("{}@s.whatsapp.net", self.phone_number))
            .with_name(options.display_name);

        let event_tx = tx.clone();
        let mut bot = Bot::builder()
            .with_backend(Arc::new(backend))
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .on_event(move |event, _client| {
                let tx = event_tx.clone();
                let ready = Arc::clone(&ready_tx);
                let identity = identity.clone();
                async move {
                    if matches!(event, Event::PairingQrCode { .. }) {
                        ready.send_replace(true);
                    }
                    for event in translate(event, &identity) {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            })
            .build()
            .await
            .map_err(|e| BotError::Connection(format!("failed to build client: {}", e)))?;

        let client = bot.client();
        tx.send(TransportEvent::ConnectionUpdate(ConnectionUpdate::Connecting))
            .await
            .map_err(|e| BotError::Connection(e.to_string()))?;

        let mut run = bot.run()
            .await
            .map_err(|e| BotError::Connection(e.to_string()))?;

        let watched = Arc::clone(&client);
        tokio::spawn(async move {
            tokio::select! {
                _ = tx.closed() => {
                    tracing::debug!("WhatsApp: event stream dropped, disconnecting");
                    watched.disconnect().await;
                    run.abort();
                }
                result = &mut run => {
                    if let Err(e) = result {
                        tracing::error!("WhatsApp client task failed: {:?}", e);
                    }
                    let reason = CloseReason::unknown();
                    let _ = tx.send(TransportEvent::ConnectionUpdate(ConnectionUpdate::Close { reason })).await;
                }
            }
        });

        Ok(Connection {
            handle: Arc::new(WhatsAppHandle { client, ready }),
            events,
        })
    }
}

pub struct WhatsAppHandle {
    client: Arc<Client>,
    ready: watch::Receiver<bool>,
}

#[async_trait]
impl ConnectionHandle for WhatsAppHandle {
    async fn send(&self, message: OutboundMessage) -> Result<SendReceipt, BotError> {
        let to: Jid = message.target_chat_id.parse()
            .map_err(|_| BotError::Send(format!("invalid chat id: {}", message.target_chat_id)))?;

        let message_id = self.client
            .send_message(to, outbound(&message))
            .await
            .map_err(|e| BotError::Send(e.to_string()))?;

        Ok(SendReceipt { message_id: message_id.to_string() })
    }

    async fn request_pairing_code(&self, phone_number: &str, custom_code: Option<&str>) -> Result<String, BotError> {
        let mut ready = self.ready.clone();
        tokio::time::timeout(PAIRING_READY_TIMEOUT, ready.wait_for(|ready| *ready))
            .await
            .map_err(|_| BotError::Pairing("server never offered pairing".to_string()))?
            .map_err(|e| BotError::Pairing(e.to_string()))?;

        let options = PairCodeOptions {
            phone_number: phone_number.to_string(),
            custom_code: custom_code.map(str::to_uppercase),
            ..Default::default()
        };
        self.client
            .pair_with_code(options)
            .await
            .map_err(|e| BotError::Pairing(e.to_string()))
    }
}

/// Map one client event onto what the supervisor consumes
// TODO: map group participant notifications to MembershipChanged once the
// client emits them as events.
fn translate(event: Event, identity: &BotIdentity) -> Vec<TransportEvent> {
    match event {
        Event::PairingQrCode { .. } => {
            tracing::debug!("WhatsApp: device not linked yet");
            vec![]
        }
        Event::PairSuccess(_) => {
            tracing::info!("WhatsApp: pairing successful");
            vec![]
        }
        Event::Connected(_) => {
            let credentials = Credentials {
                registered: true,
                me: Some(identity.id.clone()),
                keys: serde_json::json!({ "device-store": DEVICE_DB }),
            };
            vec![
                TransportEvent::CredentialsUpdate(credentials),
                TransportEvent::ConnectionUpdate(ConnectionUpdate::Open { identity: identity.clone() }),
            ]
        }
        Event::Message(msg, info) => {
            vec![TransportEvent::MessagesReceived(vec![inbound(&msg, &info)])]
        }
        Event::LoggedOut(_) => {
            let reason = CloseReason::logged_out();
            vec![TransportEvent::ConnectionUpdate(ConnectionUpdate::Close { reason })]
        }
        Event::Disconnected(_) => {
            let reason = CloseReason::unknown();
            vec![TransportEvent::ConnectionUpdate(ConnectionUpdate::Close { reason })]
        }
        _ => vec![],
    }
}

fn inbound(msg: &wa::Message, info: &MessageInfo) -> InboundMessage {
    let extended = msg.extended_text_message.as_ref();
    let image = msg.image_message.as_ref();

    let text = msg.conversation.clone()
        .or_else(|| extended.and_then(|m| m.text.clone()))
        .or_else(|| image.and_then(|m| m.caption.clone()));

    let context = extended.and_then(|m| m.context_info.as_ref())
        .or_else(|| image.and_then(|m| m.context_info.as_ref()));
    let quoted = context.and_then(|c| {
        Some(QuotedContext {
            message_id: c.stanza_id.clone()?,
            has_image: c.quoted_message.as_ref().is_some_and(|q| q.image_message.is_some()),
        })
    });

    let chat_id = info.source.chat.to_string();
    InboundMessage {
        id: info.id.clone(),
        is_group: info.source.is_group,
        sender_id: info.source.sender.to_string(),
        sender_name: Some(info.push_name.clone()).filter(|n| !n.is_empty()),
        chat_id,
        text,
        has_image: image.is_some(),
        quoted,
        from_me: info.source.is_from_me,
        timestamp: info.timestamp,
    }
}

fn outbound(message: &OutboundMessage) -> wa::Message {
    if message.quoted.is_none() && message.mentions.is_empty() {
        return wa::Message {
            conversation: Some(message.text.clone()),
            ..Default::default()
        };
    }

    let context = wa::ContextInfo {
        stanza_id: message.quoted.as_ref().map(|q| q.id.clone()),
        participant: message.quoted.as_ref().map(|q| q.sender_id.clone()),
        mentioned_jid: message.mentions.iter().cloned().collect(),
        ..Default::default()
    };
    let extended = wa::message::ExtendedTextMessage {
        text: Some(message.text.clone()),
        context_info: Some(context.into()),
        ..Default::default()
    };
    wa::Message {
        extended_text_message: Some(extended.into()),
        ..Default::default()
    }
}
