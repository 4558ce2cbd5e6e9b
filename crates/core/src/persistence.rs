// Snapshot persistence
//
// The durable state is {subscriber registry, retention buffer}, captured
// together under the relay lock and written as one JSON document.
// JsonFileStore writes to a sibling temp file, fsyncs it, then renames it over
// the target so the file on disk is always a complete snapshot.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{RelayError, Result};
use crate::message::Event;
use crate::registry::SubscriberRegistry;

/// Serialized relay state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "RegistrationTokens", default, deserialize_with = "null_as_default")]
    pub subscribers: SubscriberRegistry,
    #[serde(rename = "RecentEvents", default, deserialize_with = "null_as_default")]
    pub events: Vec<Event>,
}

// Older save files write an empty map or list as `null`
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Storage backend for snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot. `Ok(None)` means nothing was saved yet.
    async fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Snapshot file on the local filesystem
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        tracing::info!(path = %self.path.display(), "Loading snapshot");
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_slice(&data)?;
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let data = serde_json::to_vec(snapshot)?;
        let temp = self.temp_path();

        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            RelayError::persistence(format!(
                "failed to move {} into place: {}",
                temp.display(),
                e
            ))
        })?;

        tracing::debug!(
            path = %self.path.display(),
            bytes = data.len(),
            events = snapshot.events.len(),
            subscribers = snapshot.subscribers.len(),
            "Snapshot saved"
        );
        Ok(())
    }
}
