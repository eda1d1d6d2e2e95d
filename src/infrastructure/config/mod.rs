//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub transport: TransportKind,
    pub session: SessionConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
}

/// Which connector the bot runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// WhatsApp Web, needs the `whatsapp` cargo feature
    Whatsapp,
    /// Local stdin/stdout transport for development
    Console,
}

impl Default for TransportKind {
    fn default() -> Self {
        if cfg!(feature = "whatsapp") {
            TransportKind::Whatsapp
        } else {
            TransportKind::Console
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    pub path: PathBuf,
    /// Phone number with country code, without `+`
    pub phone_number: String,
    /// Custom 8-character pairing code; the server picks one when absent
    pub pairing_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReconnectConfig {
    pub delay_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self { delay_seconds: 3 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "MyBot".to_string(),
                prefix: "!".to_string(),
            },
            transport: TransportKind::default(),
            session: SessionConfig {
                path: PathBuf::from("./auth_session"),
                phone_number: "628123456789".to_string(),
                pairing_code: Some("ABCD1234".to_string()),
            },
            reconnect: ReconnectConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    /// Override fields from environment variables
    pub fn apply_env(mut self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok());
        self
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(name) = var("BOT_NAME") {
            self.bot.name = name;
        }
        if let Some(prefix) = var("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }
        if let Some(phone) = var("BOT_PHONE_NUMBER") {
            self.session.phone_number = phone;
        }
        if let Some(code) = var("BOT_PAIRING_CODE") {
            // An empty value asks the server for a random code
            self.session.pairing_code = Some(code).filter(|c| !c.is_empty());
        }
        if let Some(path) = var("BOT_SESSION_PATH") {
            self.session.path = PathBuf::from(path);
        }
        match var("BOT_TRANSPORT").as_deref() {
            Some("whatsapp") => self.transport = TransportKind::Whatsapp,
            Some("console") => self.transport = TransportKind::Console,
            _ => {}
        }
    }

    /// Reject values the bot cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.name.trim().is_empty() {
            return Err(ConfigError::MissingField("bot.name".to_string()));
        }
        self.prefix()?;

        if self.transport == TransportKind::Whatsapp && !cfg!(feature = "whatsapp") {
            return Err(ConfigError::InvalidValue(
                "transport whatsapp needs a build with the `whatsapp` feature".to_string(),
            ));
        }

        let phone = &self.session.phone_number;
        if phone.is_empty() {
            return Err(ConfigError::MissingField("session.phone-number".to_string()));
        }
        if !phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue(format!(
                "phone number must be digits only with country code, got {:?}",
                phone
            )));
        }

        if let Some(code) = &self.session.pairing_code {
            let pattern = regex_lite::Regex::new("^[A-Za-z0-9]{8}$")
                .map_err(|e| ConfigError::Parse(e.to_string()))?;
            if !pattern.is_match(code) {
                return Err(ConfigError::InvalidValue(format!(
                    "pairing code must be 8 letters or digits, got {:?}",
                    code
                )));
            }
        }

        if self.reconnect.delay_seconds == 0 {
            return Err(ConfigError::InvalidValue("reconnect delay must be at least 1 second".to_string()));
        }
        Ok(())
    }

    /// The command prefix as a single character
    pub fn prefix(&self) -> Result<char, ConfigError> {
        let mut chars = self.bot.prefix.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_whitespace() => Ok(c),
            _ => Err(ConfigError::InvalidValue(format!(
                "prefix must be a single non-space character, got {:?}",
                self.bot.prefix
            ))),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect.delay_seconds)
    }
}
