use std::fmt;

/// Strip the device suffix and server from a WhatsApp id.
///
/// `628123456789:12@s.whatsapp.net` becomes `628123456789`.
pub fn user_part(jid: &str) -> &str {
    let without_server = jid.split('@').next().unwrap_or(jid);
    without_server.split(':').next().unwrap_or(without_server)
}

/// The authenticated account the bot runs as
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BotIdentity {
    pub id: String,
    pub name: Option<String>,
}

impl BotIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bare phone number of the account
    pub fn phone_number(&self) -> &str {
        user_part(&self.id)
    }

    /// Account name, falling back to the configured bot name
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(fallback)
    }

    /// Whether a participant id refers to this account, on any device
    pub fn is_same_user(&self, jid: &str) -> bool {
        user_part(&self.id) == user_part(jid)
    }
}

impl fmt::Display for BotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.phone_number())
    }
}
