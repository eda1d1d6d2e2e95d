use serde::{Deserialize, Serialize};

/// Authentication material owned by the protocol client
///
/// The bot only looks at `registered` and `me`; `keys` is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub registered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub me: Option<String>,
    #[serde(default)]
    pub keys: serde_json::Value,
}

impl Credentials {
    /// Fresh credentials for a device that has not been paired yet
    pub fn unregistered() -> Self {
        Self::default()
    }
}

/// What a session store hands back on load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub credentials: Credentials,
}
