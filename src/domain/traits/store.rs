use async_trait::async_trait;
use crate::application::errors::StorageError;
use crate::domain::entities::{Credentials, Session};

/// SessionStore trait - persisted credentials that allow reconnecting without re-pairing
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the stored session, or fresh unregistered credentials when there is none
    async fn load(&self) -> Result<Session, StorageError>;

    /// Persist rotated credentials
    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError>;
}
