use std::collections::BTreeSet;
use chrono::{DateTime, Utc};

/// Suffix of group chat ids
const GROUP_SERVER: &str = "@g.us";

/// The message an inbound message replies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedContext {
    pub message_id: String,
    pub has_image: bool,
}

/// Reference to a message, used for quoting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
}

/// A message received from the transport
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub is_group: bool,
    pub text: Option<String>,
    pub has_image: bool,
    pub quoted: Option<QuotedContext>,
    pub from_me: bool,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// New message in `chat_id`. In private chats the sender is the chat itself.
    pub fn new(chat_id: impl Into<String>) -> Self {
        let chat_id = chat_id.into();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string().to_uppercase(),
            is_group: chat_id.ends_with(GROUP_SERVER),
            sender_id: chat_id.clone(),
            chat_id,
            sender_name: None,
            text: None,
            has_image: false,
            quoted: None,
            from_me: false,
            timestamp: Utc::now(),
        }
    }

    pub fn from_text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(chat_id).with_text(text)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = sender_id.into();
        self
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    pub fn with_image(mut self) -> Self {
        self.has_image = true;
        self
    }

    pub fn with_quoted(mut self, quoted: QuotedContext) -> Self {
        self.quoted = Some(quoted);
        self
    }

    pub fn sent_by_me(mut self) -> Self {
        self.from_me = true;
        self
    }

    /// Text body, if it has one that isn't empty
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Image in the message itself or in the message it quotes
    pub fn carries_image(&self) -> bool {
        self.has_image || self.quoted.as_ref().is_some_and(|q| q.has_image)
    }

    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            id: self.id.clone(),
            chat_id: self.chat_id.clone(),
            sender_id: self.sender_id.clone(),
        }
    }
}

/// A message to be sent. Consumed by a single send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub target_chat_id: String,
    pub text: String,
    pub mentions: BTreeSet<String>,
    pub quoted: Option<MessageRef>,
}

impl OutboundMessage {
    pub fn new(target_chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target_chat_id: target_chat_id.into(),
            text: text.into(),
            mentions: BTreeSet::new(),
            quoted: None,
        }
    }

    /// Reply in the same chat, quoting the original
    pub fn reply_to(message: &InboundMessage, text: impl Into<String>) -> Self {
        Self::new(message.chat_id.clone(), text).quoting(message)
    }

    pub fn quoting(mut self, message: &InboundMessage) -> Self {
        self.quoted = Some(message.message_ref());
        self
    }

    pub fn with_mention(mut self, participant: impl Into<String>) -> Self {
        self.mentions.insert(participant.into());
        self
    }
}
