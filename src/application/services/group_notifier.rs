use crate::domain::entities::{user_part, MembershipAction, OutboundMessage};

/// Greets members joining a group and says goodbye to those leaving
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupNotifier;

impl GroupNotifier {
    pub fn new() -> Self {
        Self
    }

    /// One message per participant, in the order the event listed them
    pub fn on_membership_change(&self, chat_id: &str, participants: &[String], action: MembershipAction) -> Vec<OutboundMessage> {
        let template = match action {
            MembershipAction::Add => "Welcome",
            MembershipAction::Remove => "Goodbye",
            MembershipAction::Promote | MembershipAction::Demote => return Vec::new(),
        };

        participants.iter()
            .map(|participant| {
                OutboundMessage::new(chat_id, format!("👋 {} @{}!", template, user_part(participant)))
                    .with_mention(participant.clone())
            })
            .collect()
    }
}
