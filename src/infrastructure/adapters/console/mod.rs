//! Console adapter for development/testing
//!
//! A local transport with no network: each stdin line arrives as a message
//! from a local chat and replies are printed. Lines starting with `:` drive
//! the other events:
//!
//! - `:join <jid>...` / `:leave <jid>...` membership change in the test group
//! - `:group <text>` message in the test group
//! - `:image <text>` message carrying an image
//! - `:reply-image <text>` message quoting an image
//! - `:self <text>` message sent from the bot's own account
//! - `:close <code>` close the connection with a status code
//! - `:logout` close the connection as logged out
//!
//! End of input shuts the transport down without touching the session.

use async_trait::async_trait;
use std::sync::Arc;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::application::errors::BotError;
use crate::domain::entities::{
    BotIdentity, CloseReason, ConnectionUpdate, Credentials, InboundMessage, MembershipAction,
    OutboundMessage, QuotedContext, TransportEvent,
};
use crate::domain::traits::{Connection, ConnectionHandle, ConnectOptions, Connector, SendReceipt};

pub const CONSOLE_CHAT: &str = "6280000000000@s.whatsapp.net";
pub const CONSOLE_GROUP: &str = "120363000000000000@g.us";

const EVENT_BUFFER: usize = 64;

/// Turn one console line into a transport event
pub fn parse_line(line: &str, sender_name: &str) -> Option<TransportEvent> {
    let line = line.trim_end();
    if line.is_empty() {
        return None;
    }

    let message = |chat: &str, text: &str| {
        InboundMessage::from_text(chat, text)
            .with_sender(CONSOLE_CHAT)
            .with_sender_name(sender_name)
    };

    let Some(directive) = line.strip_prefix(':') else {
        return Some(TransportEvent::MessagesReceived(vec![message(CONSOLE_CHAT, line)]));
    };

    let (name, rest) = directive.split_once(' ').unwrap_or((directive, ""));
    let rest = rest.trim();
    let participants = || rest.split_whitespace().map(String::from).collect::<Vec<_>>();

    match name {
        "join" | "leave" => Some(TransportEvent::MembershipChanged {
            chat_id: CONSOLE_GROUP.to_string(),
            participants: participants(),
            action: if name == "join" { MembershipAction::Add } else { MembershipAction::Remove },
        }),
        "group" => Some(TransportEvent::MessagesReceived(vec![message(CONSOLE_GROUP, rest)])),
        "self" => Some(TransportEvent::MessagesReceived(vec![message(CONSOLE_CHAT, rest).sent_by_me()])),
        "image" => Some(TransportEvent::MessagesReceived(vec![message(CONSOLE_CHAT, rest).with_image()])),
        "reply-image" => {
            let quoted = QuotedContext {
                message_id: uuid::Uuid::new_v4().simple().to_string(),
                has_image: true,
            };
            Some(TransportEvent::MessagesReceived(vec![message(CONSOLE_CHAT, rest).with_quoted(quoted)]))
        }
        "logout" => {
            let reason = CloseReason::logged_out();
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Close { reason }))
        }
        "close" => {
            let reason = match rest.parse::<u16>() {
                Ok(code) => CloseReason::new(code),
                Err(_) => CloseReason::unknown(),
            };
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Close { reason }))
        }
        other => {
            tracing::warn!("Unknown console directive: :{}", other);
            None
        }
    }
}

/// Console connector. Reads stdin once and shares it across reconnects.
pub struct ConsoleConnector {
    phone_number: String,
    sender_name: String,
    lines: Arc<Mutex<Option<mpsc::Receiver<String>>>>,
}

impl ConsoleConnector {
    pub fn new(phone_number: impl Into<String>, sender_name: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            sender_name: sender_name.into(),
            lines: Arc::new(Mutex::new(None)),
        }
    }

    /// Read lines from `lines` instead of stdin
    #[cfg(test)]
    pub fn with_lines(self, lines: mpsc::Receiver<String>) -> Self {
        Self {
            lines: Arc::new(Mutex::new(Some(lines))),
            ..self
        }
    }

    fn identity(&self, display_name: &str) -> BotIdentity {
        BotIdentity::new(format!("{}:1@s.whatsapp.net", self.phone_number)).with_name(display_name)
    }
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
    rx
}

#[async_trait]
impl Connector for ConsoleConnector {
    fn name(&self) -> &'static str {
        "console"
    }

    fn pairing_hint(&self) -> &'static str {
        "The console transport accepts this code right away"
    }

    async fn connect(&self, options: ConnectOptions) -> Result<Connection, BotError> {
        tracing::info!("Starting console transport (dev mode)");
        let (tx, events) = mpsc::channel(EVENT_BUFFER);
        let identity = self.identity(&options.display_name);

        tx.send(TransportEvent::ConnectionUpdate(ConnectionUpdate::Connecting))
            .await
            .map_err(|e| BotError::Connection(e.to_string()))?;
        if options.credentials.registered {
            tx.send(TransportEvent::ConnectionUpdate(ConnectionUpdate::Open { identity: identity.clone() }))
                .await
                .map_err(|e| BotError::Connection(e.to_string()))?;
        }

        // Unpaired sessions read no input until pairing has queued its events
        let (paired, paired_rx) = if options.credentials.registered {
            (None, None)
        } else {
            let (paired, paired_rx) = oneshot::channel();
            (Some(paired), Some(paired_rx))
        };

        let lines = Arc::clone(&self.lines);
        let pump_tx = tx.clone();
        let sender_name = self.sender_name.clone();
        tokio::spawn(async move {
            if let Some(paired_rx) = paired_rx {
                tokio::select! {
                    _ = pump_tx.closed() => return,
                    _ = paired_rx => {}
                }
            }

            let mut guard = lines.lock().await;
            let lines = guard.get_or_insert_with(spawn_stdin_reader);
            loop {
                let line = tokio::select! {
                    _ = pump_tx.closed() => return,
                    line = lines.recv() => line,
                };
                let Some(line) = line else {
                    tracing::info!("Console input closed");
                    let _ = pump_tx.send(TransportEvent::Shutdown).await;
                    return;
                };
                if let Some(event) = parse_line(&line, &sender_name) {
                    let closing = matches!(event, TransportEvent::ConnectionUpdate(ConnectionUpdate::Close { .. }));
                    if pump_tx.send(event).await.is_err() || closing {
                        return;
                    }
                }
            }
        });

        Ok(Connection {
            handle: Arc::new(ConsoleHandle {
                events: tx,
                identity,
                paired: Mutex::new(paired),
            }),
            events,
        })
    }
}

/// Prints outbound messages and pairs instantly
pub struct ConsoleHandle {
    events: mpsc::Sender<TransportEvent>,
    identity: BotIdentity,
    paired: Mutex<Option<oneshot::Sender<()>>>,
}

#[async_trait]
impl ConnectionHandle for ConsoleHandle {
    async fn send(&self, message: OutboundMessage) -> Result<SendReceipt, BotError> {
        let quoted = message.quoted.as_ref()
            .map(|q| format!(" (reply to {})", q.id))
            .unwrap_or_default();
        let mut out = std::io::stdout().lock();
        writeln!(out, "[BOT → {}]{} {}", message.target_chat_id, quoted, message.text)
            .map_err(|e| BotError::Send(e.to_string()))?;
        if !message.mentions.is_empty() {
            let mentions: Vec<&str> = message.mentions.iter().map(String::as_str).collect();
            writeln!(out, "  [Mentions] {}", mentions.join(", "))
                .map_err(|e| BotError::Send(e.to_string()))?;
        }

        Ok(SendReceipt {
            message_id: uuid::Uuid::new_v4().simple().to_string().to_uppercase(),
        })
    }

    async fn request_pairing_code(&self, phone_number: &str, custom_code: Option<&str>) -> Result<String, BotError> {
        tracing::debug!("Console pairing for {}", phone_number);
        let code = match custom_code {
            Some(code) => code.to_uppercase(),
            None => uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase(),
        };

        // The console accepts the code on the spot
        let credentials = Credentials {
            registered: true,
            me: Some(self.identity.id.clone()),
            keys: serde_json::Value::Null,
        };
        let paired = [
            TransportEvent::CredentialsUpdate(credentials),
            TransportEvent::ConnectionUpdate(ConnectionUpdate::Open { identity: self.identity.clone() }),
        ];
        for event in paired {
            self.events.send(event).await.map_err(|e| BotError::Pairing(e.to_string()))?;
        }
        if let Some(paired) = self.paired.lock().await.take() {
            let _ = paired.send(());
        }

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(event: Option<TransportEvent>) -> Vec<InboundMessage> {
        match event {
            Some(TransportEvent::MessagesReceived(messages)) => messages,
            other => panic!("expected messages, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_line_is_private_message() {
        let msgs = messages(parse_line("!ping", "Alex"));
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].chat_id, CONSOLE_CHAT);
        assert_eq!(msgs[0].text(), Some("!ping"));
        assert_eq!(msgs[0].sender_name.as_deref(), Some("Alex"));
        assert!(!msgs[0].is_group);
    }

    #[test]
    fn test_blank_line_is_ignored() {
        assert!(parse_line("   ", "Alex").is_none());
        assert!(parse_line(":bogus", "Alex").is_none());
    }

    #[test]
    fn test_join_directive() {
        match parse_line(":join A@s.whatsapp.net B@s.whatsapp.net", "Alex") {
            Some(TransportEvent::MembershipChanged { chat_id, participants, action }) => {
                assert_eq!(chat_id, CONSOLE_GROUP);
                assert_eq!(participants, vec!["A@s.whatsapp.net", "B@s.whatsapp.net"]);
                assert_eq!(action, MembershipAction::Add);
            }
            other => panic!("expected membership change, got {:?}", other),
        }
    }

    #[test]
    fn test_image_directives() {
        assert!(messages(parse_line(":image !sticker", "Alex"))[0].has_image);

        let reply = messages(parse_line(":reply-image !sticker", "Alex"));
        assert!(!reply[0].has_image);
        assert!(reply[0].carries_image());
        assert_eq!(reply[0].text(), Some("!sticker"));
    }

    #[test]
    fn test_close_directive() {
        match parse_line(":close 401", "Alex") {
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Close { reason })) => {
                assert!(reason.is_terminal());
            }
            other => panic!("expected close, got {:?}", other),
        }
        match parse_line(":close", "Alex") {
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Close { reason })) => {
                assert_eq!(reason, CloseReason::unknown());
            }
            other => panic!("expected close, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pairing_emits_credentials_then_open() {
        let (_lines_tx, lines) = mpsc::channel(8);
        let connector = ConsoleConnector::new("628123456789", "Alex").with_lines(lines);
        let connection = connector
            .connect(ConnectOptions {
                credentials: Credentials::unregistered(),
                display_name: "MyBot".to_string(),
            })
            .await
            .unwrap();
        let Connection { handle, mut events } = connection;

        let code = handle.request_pairing_code("628123456789", Some("abcd1234")).await.unwrap();
        assert_eq!(code, "ABCD1234");

        assert!(matches!(
            events.recv().await,
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Connecting))
        ));
        match events.recv().await {
            Some(TransportEvent::CredentialsUpdate(credentials)) => {
                assert!(credentials.registered);
                assert_eq!(credentials.me.as_deref(), Some("628123456789:1@s.whatsapp.net"));
            }
            other => panic!("expected credentials, got {:?}", other),
        }
        assert!(matches!(
            events.recv().await,
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Open { .. }))
        ));
    }

    #[tokio::test]
    async fn test_lines_become_events_until_close() {
        let (lines_tx, lines) = mpsc::channel(8);
        let connector = ConsoleConnector::new("628123456789", "Alex").with_lines(lines);
        let mut connection = connector
            .connect(ConnectOptions {
                credentials: Credentials { registered: true, ..Credentials::default() },
                display_name: "MyBot".to_string(),
            })
            .await
            .unwrap();

        for line in ["!ping", ":close 428", "!after-close"] {
            lines_tx.send(line.to_string()).await.unwrap();
        }

        assert!(matches!(
            connection.events.recv().await,
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Connecting))
        ));
        assert!(matches!(
            connection.events.recv().await,
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Open { .. }))
        ));
        assert!(matches!(connection.events.recv().await, Some(TransportEvent::MessagesReceived(_))));
        assert!(matches!(
            connection.events.recv().await,
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Close { .. }))
        ));
        drop(connection.handle);
        assert!(connection.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_random_pairing_code_is_eight_chars() {
        let (tx, _rx) = mpsc::channel(8);
        let handle = ConsoleHandle {
            events: tx,
            identity: BotIdentity::new("628123456789:1@s.whatsapp.net"),
            paired: Mutex::new(None),
        };
        let code = handle.request_pairing_code("628123456789", None).await.unwrap();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_logout_directive_is_terminal() {
        match parse_line(":logout", "Alex") {
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Close { reason })) => {
                assert_eq!(reason, CloseReason::logged_out());
            }
            other => panic!("expected close, got {:?}", other),
        }
    }

    #[test]
    fn test_self_directive_marks_own_message() {
        let msgs = messages(parse_line(":self !ping", "Alex"));
        assert!(msgs[0].from_me);
        assert_eq!(msgs[0].text(), Some("!ping"));
    }

    #[tokio::test]
    async fn test_end_of_input_shuts_down_instead_of_logging_out() {
        let (lines_tx, lines) = mpsc::channel(8);
        let connector = ConsoleConnector::new("628123456789", "Alex").with_lines(lines);
        let mut connection = connector
            .connect(ConnectOptions {
                credentials: Credentials { registered: true, ..Credentials::default() },
                display_name: "MyBot".to_string(),
            })
            .await
            .unwrap();
        drop(lines_tx);

        assert!(matches!(
            connection.events.recv().await,
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Connecting))
        ));
        assert!(matches!(
            connection.events.recv().await,
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Open { .. }))
        ));
        assert!(matches!(connection.events.recv().await, Some(TransportEvent::Shutdown)));
    }

    #[tokio::test]
    async fn test_pairing_completes_with_input_already_queued() {
        let (lines_tx, lines) = mpsc::channel(256);
        for i in 0..200 {
            lines_tx.send(format!("line {}", i)).await.unwrap();
        }
        let connector = ConsoleConnector::new("628123456789", "Alex").with_lines(lines);
        let Connection { handle, mut events } = connector
            .connect(ConnectOptions {
                credentials: Credentials::unregistered(),
                display_name: "MyBot".to_string(),
            })
            .await
            .unwrap();
        tokio::task::yield_now().await;

        let code = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            handle.request_pairing_code("628123456789", Some("ABCD1234")),
        )
        .await
        .expect("pairing blocked on queued input")
        .unwrap();
        assert_eq!(code, "ABCD1234");

        assert!(matches!(
            events.recv().await,
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Connecting))
        ));
        assert!(matches!(events.recv().await, Some(TransportEvent::CredentialsUpdate(_))));
        assert!(matches!(
            events.recv().await,
            Some(TransportEvent::ConnectionUpdate(ConnectionUpdate::Open { .. }))
        ));
        match events.recv().await {
            Some(TransportEvent::MessagesReceived(msgs)) => assert_eq!(msgs[0].text(), Some("line 0")),
            other => panic!("expected the first queued line, got {:?}", other),
        }
    }
}
