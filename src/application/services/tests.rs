//! Supervisor scenarios against an in-memory transport

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::application::errors::{BotError, StorageError};
use crate::application::messaging::handlers::HELP_COMMAND;
use crate::application::messaging::{CommandDispatcher, HandlerContext};
use crate::domain::entities::{
    BotIdentity, CloseReason, CommandDefinition, CommandRegistry, ConnectionState, ConnectionUpdate,
    Credentials, InboundMessage, MembershipAction, OutboundMessage, Session, TransportEvent,
};
use crate::domain::traits::{Connection, ConnectionHandle, ConnectOptions, Connector, SendReceipt, SessionStore};
use super::{ConnectionSupervisor, EventService, SupervisorSettings};

const DELAY: Duration = Duration::from_secs(3);
const CHAT: &str = "123@s.whatsapp.net";

/// What one `connect` call does: fail, or deliver these events and end the stream
enum Script {
    Fail,
    Events(Vec<TransportEvent>),
}

struct MockHandle {
    sent: mpsc::UnboundedSender<OutboundMessage>,
    pairing_requests: Arc<AtomicUsize>,
}

#[async_trait]
impl ConnectionHandle for MockHandle {
    async fn send(&self, message: OutboundMessage) -> Result<SendReceipt, BotError> {
        self.sent.send(message).map_err(|e| BotError::Send(e.to_string()))?;
        Ok(SendReceipt { message_id: "SENT".to_string() })
    }

    async fn request_pairing_code(&self, _phone_number: &str, custom_code: Option<&str>) -> Result<String, BotError> {
        self.pairing_requests.fetch_add(1, Ordering::SeqCst);
        Ok(custom_code.unwrap_or("RANDOM12").to_string())
    }
}

struct MockConnector {
    scripts: Mutex<VecDeque<Script>>,
    connects: Mutex<Vec<Instant>>,
    pairing_requests: Arc<AtomicUsize>,
    sent: mpsc::UnboundedSender<OutboundMessage>,
}

impl MockConnector {
    fn new(scripts: Vec<Script>) -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (sent, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            connects: Mutex::new(Vec::new()),
            pairing_requests: Arc::new(AtomicUsize::new(0)),
            sent,
        });
        (connector, rx)
    }

    fn connect_times(&self) -> Vec<Instant> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn pairing_hint(&self) -> &'static str {
        "Enter this code in the mock"
    }

    async fn connect(&self, _options: ConnectOptions) -> Result<Connection, BotError> {
        self.connects.lock().unwrap().push(Instant::now());

        // Running out of scripts logs the bot out so every test terminates
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_else(|| {
            Script::Events(vec![close(CloseReason::LOGGED_OUT)])
        });
        let events = match script {
            Script::Fail => return Err(BotError::Connection("unreachable".to_string())),
            Script::Events(events) => events,
        };

        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            tx.try_send(event).unwrap();
        }

        Ok(Connection {
            handle: Arc::new(MockHandle {
                sent: self.sent.clone(),
                pairing_requests: Arc::clone(&self.pairing_requests),
            }),
            events: rx,
        })
    }
}

#[derive(Default)]
struct MemoryStore {
    credentials: Mutex<Credentials>,
    saves: AtomicUsize,
    fail_load: bool,
}

impl MemoryStore {
    fn registered() -> Self {
        Self {
            credentials: Mutex::new(Credentials { registered: true, ..Credentials::default() }),
            ..Self::default()
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self) -> Result<Session, StorageError> {
        if self.fail_load {
            return Err(StorageError::Serialization("corrupt".to_string()));
        }
        Ok(Session { credentials: self.credentials.lock().unwrap().clone() })
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.credentials.lock().unwrap() = credentials.clone();
        Ok(())
    }
}

fn close(code: u16) -> TransportEvent {
    TransportEvent::ConnectionUpdate(ConnectionUpdate::Close { reason: CloseReason::new(code) })
}

fn open() -> TransportEvent {
    TransportEvent::ConnectionUpdate(ConnectionUpdate::Open {
        identity: BotIdentity::new("628123456789:7@s.whatsapp.net").with_name("Paired Bot"),
    })
}

fn received(message: InboundMessage) -> TransportEvent {
    TransportEvent::MessagesReceived(vec![message])
}

fn settings() -> SupervisorSettings {
    SupervisorSettings {
        session_path: PathBuf::from("./auth_session"),
        phone_number: "628123456789".to_string(),
        pairing_code: Some("ABCD1234".to_string()),
        display_name: "MyBot".to_string(),
        reconnect_delay: DELAY,
    }
}

fn supervisor(connector: Arc<MockConnector>, store: Arc<MemoryStore>) -> ConnectionSupervisor {
    let events = EventService::new(CommandDispatcher::new('!', "MyBot").unwrap());
    ConnectionSupervisor::new(connector, store, events, settings())
}

fn assert_delay(elapsed: Duration, expected: Duration) {
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(5),
        "expected a {:?} wait, got {:?}",
        expected,
        elapsed
    );
}

/// Everything sent, once every handle has been dropped
async fn drain(mut rx: mpsc::UnboundedReceiver<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut sent = Vec::new();
    while let Some(message) = rx.recv().await {
        sent.push(message);
    }
    sent
}

#[tokio::test(start_paused = true)]
async fn test_recoverable_close_reconnects_after_fixed_delay() {
    let (connector, _rx) = MockConnector::new(vec![
        Script::Events(vec![open(), close(CloseReason::CONNECTION_CLOSED)]),
        Script::Events(vec![open(), close(CloseReason::RESTART_REQUIRED)]),
        Script::Events(vec![open(), close(CloseReason::LOGGED_OUT)]),
    ]);
    let mut supervisor = supervisor(Arc::clone(&connector), Arc::new(MemoryStore::registered()));

    let result = supervisor.run().await;

    assert!(matches!(result, Err(BotError::LoggedOut)));
    let times = connector.connect_times();
    assert_eq!(times.len(), 3, "one reconnect per recoverable close");
    for pair in times.windows(2) {
        assert_delay(pair[1] - pair[0], DELAY);
    }
    assert_eq!(supervisor.state(), ConnectionState::Closed(CloseReason::logged_out()));
}

#[tokio::test(start_paused = true)]
async fn test_logged_out_never_reconnects() {
    let (connector, _rx) = MockConnector::new(vec![
        Script::Events(vec![open(), close(CloseReason::LOGGED_OUT)]),
        Script::Events(vec![open()]),
    ]);
    let mut supervisor = supervisor(Arc::clone(&connector), Arc::new(MemoryStore::registered()));

    let started = Instant::now();
    let result = supervisor.run().await;

    assert!(matches!(result, Err(BotError::LoggedOut)));
    assert_eq!(connector.connect_times().len(), 1);
    assert_eq!(Instant::now() - started, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_is_retried() {
    let (connector, _rx) = MockConnector::new(vec![Script::Fail, Script::Fail]);
    let mut supervisor = supervisor(Arc::clone(&connector), Arc::new(MemoryStore::registered()));

    assert!(matches!(supervisor.run().await, Err(BotError::LoggedOut)));
    let times = connector.connect_times();
    assert_eq!(times.len(), 3);
    assert_delay(times[1] - times[0], DELAY);
    assert_delay(times[2] - times[1], DELAY);
}

#[tokio::test(start_paused = true)]
async fn test_stream_end_without_close_reconnects() {
    let (connector, _rx) = MockConnector::new(vec![Script::Events(vec![open()])]);
    let mut supervisor = supervisor(Arc::clone(&connector), Arc::new(MemoryStore::registered()));

    assert!(matches!(supervisor.run().await, Err(BotError::LoggedOut)));
    assert_eq!(connector.connect_times().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transport_shutdown_stops_cleanly() {
    let (connector, _rx) = MockConnector::new(vec![
        Script::Events(vec![open(), TransportEvent::Shutdown]),
        Script::Events(vec![open()]),
    ]);
    let store = Arc::new(MemoryStore::registered());
    let mut supervisor = supervisor(Arc::clone(&connector), Arc::clone(&store));

    let started = Instant::now();
    let result = supervisor.run().await;

    assert!(result.is_ok(), "shutdown must not be reported as {:?}", result);
    assert_eq!(connector.connect_times().len(), 1);
    assert_eq!(Instant::now() - started, Duration::ZERO);
    assert!(store.credentials.lock().unwrap().registered);
}

#[tokio::test]
async fn test_store_failure_is_fatal() {
    let (connector, _rx) = MockConnector::new(vec![]);
    let store = Arc::new(MemoryStore { fail_load: true, ..MemoryStore::default() });
    let mut supervisor = supervisor(Arc::clone(&connector), store);

    assert!(matches!(supervisor.run().await, Err(BotError::Session(_))));
    assert!(connector.connect_times().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unregistered_session_requests_pairing_once_per_connection() {
    let (connector, _rx) = MockConnector::new(vec![
        Script::Events(vec![close(CloseReason::CONNECTION_LOST)]),
        Script::Events(vec![close(CloseReason::LOGGED_OUT)]),
    ]);
    let mut supervisor = supervisor(Arc::clone(&connector), Arc::new(MemoryStore::default()));

    let _ = supervisor.run().await;
    assert_eq!(connector.pairing_requests.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_registered_session_skips_pairing() {
    let (connector, _rx) = MockConnector::new(vec![]);
    let mut supervisor = supervisor(Arc::clone(&connector), Arc::new(MemoryStore::registered()));

    let _ = supervisor.run().await;
    assert_eq!(connector.pairing_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_credentials_update_is_persisted() {
    let rotated = Credentials {
        registered: true,
        me: Some("628123456789:7@s.whatsapp.net".to_string()),
        keys: serde_json::json!({ "rotation": 2 }),
    };
    let (connector, _rx) = MockConnector::new(vec![Script::Events(vec![
        TransportEvent::CredentialsUpdate(rotated.clone()),
        close(CloseReason::LOGGED_OUT),
    ])]);
    let store = Arc::new(MemoryStore::default());
    let mut supervisor = supervisor(Arc::clone(&connector), Arc::clone(&store));

    let _ = supervisor.run().await;
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    assert_eq!(*store.credentials.lock().unwrap(), rotated);
}

#[tokio::test(start_paused = true)]
async fn test_open_records_identity() {
    let (connector, _rx) = MockConnector::new(vec![Script::Events(vec![open(), close(CloseReason::LOGGED_OUT)])]);
    let mut supervisor = supervisor(Arc::clone(&connector), Arc::new(MemoryStore::registered()));

    let _ = supervisor.run().await;
    assert_eq!(supervisor.identity().id, "628123456789:7@s.whatsapp.net");
    assert_eq!(supervisor.identity().name.as_deref(), Some("Paired Bot"));
}

#[tokio::test(start_paused = true)]
async fn test_messages_are_answered_and_self_messages_ignored() {
    let (connector, rx) = MockConnector::new(vec![Script::Events(vec![
        open(),
        received(InboundMessage::from_text(CHAT, "!ping")),
        received(InboundMessage::from_text(CHAT, "!ping").sent_by_me()),
        received(InboundMessage::from_text(CHAT, "!ping").with_sender("628123456789:2@s.whatsapp.net")),
        received(InboundMessage::from_text(CHAT, "just chatting")),
        close(CloseReason::LOGGED_OUT),
    ])]);
    let mut supervisor = supervisor(Arc::clone(&connector), Arc::new(MemoryStore::registered()));

    let _ = supervisor.run().await;
    drop(supervisor);
    drop(connector);

    let sent = drain(rx).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].target_chat_id, CHAT);
    assert_eq!(sent[0].text, "🏓 Pong!");
}

#[tokio::test(start_paused = true)]
async fn test_membership_add_sends_one_welcome_per_participant() {
    let (connector, rx) = MockConnector::new(vec![Script::Events(vec![
        open(),
        TransportEvent::MembershipChanged {
            chat_id: "G@g.us".to_string(),
            participants: vec!["A@g.us".to_string(), "B@g.us".to_string()],
            action: MembershipAction::Add,
        },
        close(CloseReason::LOGGED_OUT),
    ])]);
    let mut supervisor = supervisor(Arc::clone(&connector), Arc::new(MemoryStore::registered()));

    let _ = supervisor.run().await;
    drop(supervisor);
    drop(connector);

    let mut sent = drain(rx).await;
    sent.sort_by(|a, b| a.text.cmp(&b.text));
    assert_eq!(sent.len(), 2);
    for (message, participant) in sent.iter().zip(["A@g.us", "B@g.us"]) {
        assert_eq!(message.target_chat_id, "G@g.us");
        assert_eq!(message.mentions.iter().collect::<Vec<_>>(), vec![participant]);
        assert!(message.text.contains("Welcome"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_handler_does_not_stop_processing() {
    fn boom(_ctx: &HandlerContext<'_>) -> Option<OutboundMessage> {
        panic!("handler failure");
    }
    fn pong(ctx: &HandlerContext<'_>) -> Option<OutboundMessage> {
        Some(OutboundMessage::reply_to(ctx.message, "pong"))
    }

    let mut registry = CommandRegistry::new();
    registry.register(CommandDefinition::new("boom", "", boom)).unwrap();
    registry.register(CommandDefinition::new(HELP_COMMAND, "", pong)).unwrap();
    let dispatcher = CommandDispatcher::with_registry('!', "MyBot", registry).unwrap();

    let (connector, rx) = MockConnector::new(vec![Script::Events(vec![
        open(),
        received(InboundMessage::from_text(CHAT, "!boom")),
        received(InboundMessage::from_text(CHAT, "!menu")),
        close(CloseReason::LOGGED_OUT),
    ])]);
    let mut supervisor = ConnectionSupervisor::new(
        Arc::clone(&connector) as Arc<dyn Connector>,
        Arc::new(MemoryStore::registered()),
        EventService::new(dispatcher),
        settings(),
    );

    assert!(matches!(supervisor.run().await, Err(BotError::LoggedOut)));
    drop(supervisor);
    drop(connector);

    let sent = drain(rx).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "pong");
}
