//! JSON file persistence for the current snapshot.
//!
//! Saves go through a sibling `.tmp` file that is fsynced and then renamed over
//! the target, so a reader sees either the old or the new document and an
//! interrupted write leaves the previous snapshot intact.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::Snapshot;

/// What the snapshot path currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stored {
    Missing,
    /// The file exists but is not a valid snapshot. It is never overwritten
    /// except by fresh data.
    Corrupt,
    Found(Snapshot),
}

impl Stored {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Self::Found(snapshot) => Some(snapshot),
            Self::Missing | Self::Corrupt => None,
        }
    }

    pub fn into_snapshot(self) -> Option<Snapshot> {
        match self {
            Self::Found(snapshot) => Some(snapshot),
            Self::Missing | Self::Corrupt => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Read the persisted snapshot.
    ///
    /// A missing file is `None`. A file that is not a valid snapshot is also
    /// `None`, with a warning; use [`SnapshotStore::load_stored`] to tell the
    /// two apart.
    pub async fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.load_stored().await?.into_snapshot())
    }

    /// Read the snapshot path, distinguishing a missing file from a corrupt one.
    pub async fn load_stored(&self) -> Result<Stored> {
        let body = match fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No snapshot on disk");
                return Ok(Stored::Missing);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read snapshot {}", self.path.display())
                });
            }
        };

        let jd = &mut serde_json::Deserializer::from_str(&body);
        let parsed: Result<Snapshot, _> = serde_path_to_error::deserialize(jd);
        match parsed {
            Ok(snapshot) => Ok(Stored::Found(snapshot)),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    at = %e.path(),
                    error = %e.inner(),
                    "Snapshot on disk is unreadable, treating as absent"
                );
                Ok(Stored::Corrupt)
            }
        }
    }

    /// Persisted snapshot, or the `no_data` document when there is none.
    pub async fn load_or_default(&self) -> Snapshot {
        match self.load().await {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(e) => {
                warn!(error = ?e, "Failed to load snapshot, serving defaults");
                Snapshot::default()
            }
        }
    }

    /// Atomically replace the persisted snapshot.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut body =
            serde_json::to_vec_pretty(snapshot).context("Failed to serialize snapshot")?;
        body.push(b'\n');

        let tmp = self.tmp_path();
        if let Err(e) = write_synced(&tmp, &body).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }

        fs::rename(&tmp, &self.path).await.with_context(|| {
            format!(
                "Failed to move {} over {}",
                tmp.display(),
                self.path.display()
            )
        })?;

        debug!(path = %self.path.display(), bytes = body.len(), "Snapshot saved");
        Ok(())
    }
}

async fn write_synced(path: &Path, body: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.sync_all()
        .await
        .with_context(|| format!("Failed to sync {}", path.display()))?;
    Ok(())
}
