use super::{ConnectionUpdate, Credentials, InboundMessage};

/// Kind of group membership change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipAction {
    Add,
    Remove,
    Promote,
    Demote,
}

impl MembershipAction {
    pub fn as_str(&self) -> &str {
        match self {
            MembershipAction::Add => "add",
            MembershipAction::Remove => "remove",
            MembershipAction::Promote => "promote",
            MembershipAction::Demote => "demote",
        }
    }
}

/// Everything the transport reports, in arrival order
#[derive(Debug, Clone)]
pub enum TransportEvent {
    ConnectionUpdate(ConnectionUpdate),
    CredentialsUpdate(Credentials),
    MessagesReceived(Vec<InboundMessage>),
    MembershipChanged {
        chat_id: String,
        participants: Vec<String>,
        action: MembershipAction,
    },
    /// The transport stopped for good on our side, e.g. its input ended.
    /// Not a close from the server, so the session stays valid.
    Shutdown,
}
