use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::application::errors::BotError;
use crate::application::messaging::CommandDispatcher;
use crate::domain::entities::{user_part, BotIdentity, InboundMessage, MembershipAction, OutboundMessage};
use crate::domain::traits::ConnectionHandle;
use super::GroupNotifier;

/// Turns message and group events into outbound messages and sends them
pub struct EventService {
    dispatcher: CommandDispatcher,
    notifier: GroupNotifier,
}

impl EventService {
    pub fn new(dispatcher: CommandDispatcher) -> Self {
        Self {
            dispatcher,
            notifier: GroupNotifier::new(),
        }
    }

    pub fn handle_messages(&self, handle: &Arc<dyn ConnectionHandle>, messages: Vec<InboundMessage>, identity: &BotIdentity) {
        for message in messages {
            self.handle_message(handle, message, identity);
        }
    }

    /// Log a message and answer it if it is a command
    pub fn handle_message(&self, handle: &Arc<dyn ConnectionHandle>, message: InboundMessage, identity: &BotIdentity) {
        if message.from_me || identity.is_same_user(&message.sender_id) {
            return;
        }
        let Some(text) = message.text() else {
            return;
        };

        let chat = if message.is_group { user_part(&message.chat_id) } else { "private chat" };
        tracing::info!(
            "[{}] New message from {} ({}): {}",
            message.timestamp.format("%H:%M:%S"),
            user_part(&message.sender_id),
            chat,
            text
        );

        // A panicking handler must not take the event loop down with it.
        let reply = panic::catch_unwind(AssertUnwindSafe(|| self.dispatcher.dispatch(&message, identity)));
        match reply {
            Ok(Some(reply)) => {
                send(handle, reply);
            }
            Ok(None) => {}
            Err(payload) => {
                let error = handler_failure(payload.as_ref());
                tracing::error!("[{}] Handler failed on message {}: {}", message.chat_id, message.id, error);
            }
        }
    }

    /// Welcome or farewell each participant of a membership change
    pub fn handle_membership(&self, handle: &Arc<dyn ConnectionHandle>, chat_id: &str, participants: &[String], action: MembershipAction) {
        tracing::info!("[{}] Membership {}: {} participant(s)", chat_id, action.as_str(), participants.len());

        for message in self.notifier.on_membership_change(chat_id, participants, action) {
            send(handle, message);
        }
    }
}

/// Send without waiting for delivery. Failures are only logged.
pub fn send(handle: &Arc<dyn ConnectionHandle>, message: OutboundMessage) -> JoinHandle<()> {
    let handle = Arc::clone(handle);
    tokio::spawn(async move {
        let chat_id = message.target_chat_id.clone();
        match handle.send(message).await {
            Ok(receipt) => {
                tracing::debug!("[{}] Sent {}", chat_id, receipt.message_id);
            }
            Err(e) => {
                tracing::warn!("[{}] Failed to send message: {}", chat_id, e);
            }
        }
    })
}

fn handler_failure(payload: &(dyn Any + Send)) -> BotError {
    let detail = payload.downcast_ref::<&str>().map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string());
    BotError::Internal(detail)
}
