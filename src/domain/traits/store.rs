use async_trait::async_trait;
use serde_json::Value;

use crate::application::errors::StorageError;

/// Durable single-record store for the last token response.
///
/// `save` overwrites the whole record and must not return before the write
/// is durable. `load` reports a missing record as `StorageError::NotFound`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Value, StorageError>;

    async fn save(&self, raw: &Value) -> Result<(), StorageError>;
}
