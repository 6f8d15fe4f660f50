//! Local persistence of drafts that could not be sent.
//!
//! Pending drafts are stored one JSON file per draft. Nothing here reconciles
//! them with the backend; whoever replays a pending draft overwrites the
//! server copy (last write wins).

use crate::error::OrderError;
use crate::models::{RequestedStatus, SyncStatus};
use crate::services::metrics::OFFLINE_SAVES_TOTAL;
use crate::services::submission::SubmitMode;
use crate::wizard::OrderDraft;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Reports whether the backend can currently be reached.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Fixed answer, for tests and for running without a probe.
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub bool);

#[async_trait]
impl Connectivity for StaticConnectivity {
    async fn is_online(&self) -> bool {
        self.0
    }
}

/// A draft waiting to be synchronised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDraft {
    pub local_id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub status: RequestedStatus,
    pub mode: SubmitMode,
    pub draft: OrderDraft,
    pub sync_status: SyncStatus,
}

/// Directory-backed store of pending drafts.
#[derive(Debug, Clone)]
pub struct OfflineStore {
    dir: PathBuf,
}

impl OfflineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, local_id: Uuid) -> PathBuf {
        self.dir.join(format!("{local_id}.json"))
    }

    #[instrument(skip(self, draft, mode), fields(mode = mode.as_str()))]
    pub async fn save(
        &self,
        draft: &OrderDraft,
        status: RequestedStatus,
        mode: SubmitMode,
    ) -> Result<PendingDraft, OrderError> {
        fs::create_dir_all(&self.dir).await?;

        let pending = PendingDraft {
            local_id: Uuid::new_v4(),
            saved_at: Utc::now(),
            status,
            mode,
            draft: draft.clone(),
            sync_status: SyncStatus::Pending,
        };

        let bytes = serde_json::to_vec_pretty(&pending)?;
        let path = self.path_for(pending.local_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;

        OFFLINE_SAVES_TOTAL.inc();
        info!(local_id = %pending.local_id, path = %path.display(), "Draft saved for later sync");
        Ok(pending)
    }

    /// Pending drafts, oldest first. Unreadable files are skipped.
    pub async fn list(&self) -> Result<Vec<PendingDraft>, OrderError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut drafts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<PendingDraft>(&bytes) {
                Ok(draft) => drafts.push(draft),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable draft"),
            }
        }

        drafts.sort_by_key(|d| d.saved_at);
        Ok(drafts)
    }

    pub async fn get(&self, local_id: Uuid) -> Result<Option<PendingDraft>, OrderError> {
        match fs::read(self.path_for(local_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns false when no such draft was stored.
    pub async fn remove(&self, local_id: Uuid) -> Result<bool, OrderError> {
        match fs::remove_file(self.path_for(local_id)).await {
            Ok(()) => {
                debug!(%local_id, "Pending draft removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
