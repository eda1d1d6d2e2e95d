//! Connection supervisor - Owns the connect/reconnect loop
//!
//! Each iteration loads the session, connects, pairs the device if needed and
//! drains the connection's events until it closes. A close with a recoverable
//! reason waits a fixed delay and starts over; a logged-out close ends the loop
//! with an error and a transport shutdown ends it cleanly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::BotError;
use crate::domain::entities::{BotIdentity, CloseReason, ConnectionState, ConnectionUpdate, TransportEvent};
use crate::domain::traits::{Connection, ConnectOptions, Connector, SessionStore};
use super::EventService;

/// Fixed settings for the supervisor
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub session_path: PathBuf,
    pub phone_number: String,
    pub pairing_code: Option<String>,
    pub display_name: String,
    pub reconnect_delay: Duration,
}

/// How one connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Closed(CloseReason),
    Shutdown,
}

pub struct ConnectionSupervisor {
    connector: Arc<dyn Connector>,
    store: Arc<dyn SessionStore>,
    events: EventService,
    settings: SupervisorSettings,
    state: ConnectionState,
    identity: BotIdentity,
}

impl ConnectionSupervisor {
    pub fn new(
        connector: Arc<dyn Connector>,
        store: Arc<dyn SessionStore>,
        events: EventService,
        settings: SupervisorSettings,
    ) -> Self {
        let identity = BotIdentity::new(format!("{}@s.whatsapp.net", settings.phone_number))
            .with_name(settings.display_name.clone());
        Self {
            connector,
            store,
            events,
            settings,
            // Nothing has connected yet; the first iteration moves to Connecting.
            state: ConnectionState::Closed(CloseReason::unknown()),
            identity,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    /// Run until the session is logged out, the store fails or the transport
    /// shuts down
    ///
    /// Every other failure reconnects after `reconnect_delay`, with no limit
    /// on attempts.
    pub async fn run(&mut self) -> Result<(), BotError> {
        loop {
            self.set_state(ConnectionState::Connecting);

            let reason = match self.establish().await {
                Ok(connection) => match self.run_session(connection).await {
                    SessionEnd::Closed(reason) => reason,
                    SessionEnd::Shutdown => {
                        tracing::info!("{} transport shut down, stopping", self.connector.name());
                        self.set_state(ConnectionState::Closed(CloseReason::unknown()));
                        return Ok(());
                    }
                },
                Err(BotError::Session(e)) => return Err(BotError::Session(e)),
                Err(e) => {
                    tracing::warn!("Failed to establish session: {}", e);
                    let reason = CloseReason::unknown();
                    self.set_state(ConnectionState::Closed(reason));
                    reason
                }
            };

            if reason.is_terminal() {
                tracing::error!("Logged out. Delete {} to pair again.", self.settings.session_path.display());
                return Err(BotError::LoggedOut);
            }

            tracing::warn!(
                "Connection closed: {}. Reconnecting in {}s...",
                reason,
                self.settings.reconnect_delay.as_secs_f32()
            );
            tokio::time::sleep(self.settings.reconnect_delay).await;
        }
    }

    /// Load credentials, connect, and request a pairing code for unpaired devices
    async fn establish(&mut self) -> Result<Connection, BotError> {
        let session = self.store.load().await?;
        let registered = session.credentials.registered;
        if let Some(me) = &session.credentials.me {
            self.identity.id = me.clone();
        }

        let connection = self.connector
            .connect(ConnectOptions {
                credentials: session.credentials,
                display_name: self.settings.display_name.clone(),
            })
            .await?;

        if !registered {
            tracing::info!("Requesting pairing code...");
            let code = connection.handle
                .request_pairing_code(&self.settings.phone_number, self.settings.pairing_code.as_deref())
                .await?;
            print_pairing_code(&code, self.connector.pairing_hint());
        }

        Ok(connection)
    }

    /// Process events in arrival order until the connection closes
    async fn run_session(&mut self, connection: Connection) -> SessionEnd {
        let Connection { handle, mut events } = connection;

        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::ConnectionUpdate(update) => {
                    self.set_state(ConnectionState::from(&update));
                    match update {
                        ConnectionUpdate::Open { identity } => {
                            tracing::info!("Bot Number: {}", identity.phone_number());
                            tracing::info!("Bot Name: {}", identity.display_name(&self.settings.display_name));
                            self.identity = identity;
                        }
                        ConnectionUpdate::Close { reason } => return SessionEnd::Closed(reason),
                        ConnectionUpdate::Connecting => {}
                    }
                }
                TransportEvent::CredentialsUpdate(credentials) => {
                    match self.store.save(&credentials).await {
                        Ok(()) => tracing::debug!("Credentials saved"),
                        Err(e) => tracing::error!("Failed to save credentials: {}", e),
                    }
                }
                TransportEvent::MessagesReceived(messages) => {
                    self.events.handle_messages(&handle, messages, &self.identity);
                }
                TransportEvent::MembershipChanged { chat_id, participants, action } => {
                    self.events.handle_membership(&handle, &chat_id, &participants, action);
                }
                TransportEvent::Shutdown => return SessionEnd::Shutdown,
            }
        }

        tracing::warn!("Event stream ended without a close event");
        let reason = CloseReason::unknown();
        self.set_state(ConnectionState::Closed(reason));
        SessionEnd::Closed(reason)
    }

    /// Record a transition. Repeats are ignored and invalid ones only logged.
    fn set_state(&mut self, next: ConnectionState) {
        if next == self.state {
            return;
        }
        match self.state.transition(next) {
            Ok(state) => {
                match state {
                    ConnectionState::Connecting => tracing::info!("Connecting to {}...", self.connector.name()),
                    ConnectionState::Open => tracing::info!("Connected to {}", self.connector.name()),
                    ConnectionState::Closed(reason) => tracing::info!("Connection closed: {}", reason),
                }
                self.state = state;
            }
            Err((from, to)) => {
                tracing::warn!("Ignoring connection transition {} -> {}", from, to);
            }
        }
    }
}

fn print_pairing_code(code: &str, hint: &str) {
    println!();
    println!("╔════════════════════════════════════╗");
    println!("║         PAIRING CODE               ║");
    println!("╠════════════════════════════════════╣");
    println!("║         {:<27}║", code);
    println!("╚════════════════════════════════════╝");
    println!("📱 {}", hint);
    println!();
}
