//! File-based credential storage

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::application::errors::StorageError;
use crate::domain::traits::CredentialStore;

/// On-disk record: `{ "oauth": <raw token response> }`
#[derive(Debug, Serialize, Deserialize)]
struct Record {
    oauth: Value,
}

/// JSON file store holding the last token response.
///
/// Each save replaces the whole file: the record is written to a sibling
/// temp file, flushed to disk, then renamed over the target.
pub struct JsonCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "credentials".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CredentialStore for JsonCredentialStore {
    async fn load(&self) -> Result<Value, StorageError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let record: Record = serde_json::from_str(&data)
            .map_err(|e| StorageError::Serialization(format!("{}: {}", self.path.display(), e)))?;
        Ok(record.oauth)
    }

    async fn save(&self, raw: &Value) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let data = serde_json::to_vec_pretty(&Record { oauth: raw.clone() })
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.temp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!("Saved credential to {}", self.path.display());
        Ok(())
    }
}
