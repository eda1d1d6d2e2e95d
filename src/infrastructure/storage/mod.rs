//! File-based session store

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::traits::SessionStore;
use crate::domain::entities::{Credentials, Session};
use crate::application::errors::StorageError;

const CREDS_FILE: &str = "creds.json";

/// Keeps credentials as JSON in `<base_path>/creds.json`
pub struct JsonSessionStore {
    base_path: PathBuf,
}

impl JsonSessionStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub async fn init(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    fn creds_path(&self) -> PathBuf {
        self.base_path.join(CREDS_FILE)
    }
}

#[async_trait]
impl SessionStore for JsonSessionStore {
    async fn load(&self) -> Result<Session, StorageError> {
        let content = match tokio::fs::read_to_string(self.creds_path()).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No session found in {}, starting unpaired", self.base_path.display());
                return Ok(Session { credentials: Credentials::unregistered() });
            }
            Err(e) => return Err(e.into()),
        };

        let credentials: Credentials = serde_json::from_str(&content)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Session { credentials })
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(credentials)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.init().await?;
        // Write then rename so a crash never leaves half a file behind
        let tmp = self.creds_path().with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, self.creds_path()).await?;
        Ok(())
    }
}
