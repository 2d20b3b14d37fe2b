//! Snapshot Cache
//!
//! Local JSON snapshots of the agent and asset inventories so repeated runs
//! within the freshness window skip the remote download. Freshness is an
//! explicit TTL against the snapshot file's modification time; the cache is a
//! convenience, never a source of truth.

use crate::error::SyncError;
use crate::model::{Agent, Asset};
use crate::platform::PlatformApi;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const AGENTS_SNAPSHOT: &str = "agents";
pub const ASSETS_SNAPSHOT: &str = "assets";

/// TTL-based snapshot store rooted at one directory.
pub struct SnapshotCache {
    dir: PathBuf,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(dir: PathBuf, ttl_secs: u64) -> Self {
        Self {
            dir,
            ttl: Duration::seconds(ttl_secs.min(i64::MAX as u64) as i64),
        }
    }

    /// Path of the snapshot file for a named collection.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Whether a snapshot exists and its mtime is within the TTL.
    pub fn is_fresh(&self, name: &str) -> bool {
        match self.modified_at(&self.path(name)) {
            Some(modified) => Utc::now() - modified <= self.ttl,
            None => false,
        }
    }

    fn modified_at(&self, path: &Path) -> Option<DateTime<Utc>> {
        let metadata = fs::metadata(path).ok()?;
        let modified = metadata.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// Deserialize a snapshot regardless of age.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, SyncError> {
        let path = self.path(name);
        let data = fs::read_to_string(&path)
            .map_err(|e| SyncError::Cache(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&data)
            .map_err(|e| SyncError::Cache(format!("Corrupt snapshot {}: {}", path.display(), e)))
    }

    /// Serialize a snapshot, overwriting any previous one.
    pub fn store<T: Serialize>(&self, name: &str, value: &T) -> Result<(), SyncError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(name);
        let data = serde_json::to_string(value)?;
        fs::write(&path, data)
            .map_err(|e| SyncError::Cache(format!("Failed to write {}: {}", path.display(), e)))
    }
}

/// Load agents from a fresh snapshot, else refresh from the platform.
///
/// Refresh failures are soft: the error is logged and the run continues with
/// the stale snapshot if one exists, otherwise with an empty inventory.
pub async fn load_or_refresh_agents(
    api: &dyn PlatformApi,
    cache: &SnapshotCache,
    force_refresh: bool,
) -> HashMap<String, Agent> {
    load_or_refresh(cache, AGENTS_SNAPSHOT, force_refresh, || async {
        let agents = api.list_agents().await?;
        Ok(agents.into_iter().map(|a| (a.uuid.clone(), a)).collect())
    })
    .await
}

/// Load assets from a fresh snapshot, else refresh from the platform.
pub async fn load_or_refresh_assets(
    api: &dyn PlatformApi,
    cache: &SnapshotCache,
    force_refresh: bool,
) -> HashMap<String, Asset> {
    load_or_refresh(cache, ASSETS_SNAPSHOT, force_refresh, || async {
        let assets = api.list_assets().await?;
        Ok(assets.into_iter().map(|a| (a.id.clone(), a)).collect())
    })
    .await
}

async fn load_or_refresh<T, F, Fut>(
    cache: &SnapshotCache,
    name: &str,
    force_refresh: bool,
    fetch: F,
) -> HashMap<String, T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<HashMap<String, T>, SyncError>>,
{
    if !force_refresh && cache.is_fresh(name) {
        match cache.load(name) {
            Ok(records) => {
                info!(snapshot = name, "Snapshot is fresh, loading from file");
                return records;
            }
            Err(e) => {
                warn!(snapshot = name, "Discarding unreadable snapshot: {}", e);
            }
        }
    }

    info!(snapshot = name, "Refreshing inventory from the platform");
    match fetch().await {
        Ok(records) => {
            info!(snapshot = name, count = records.len(), "Inventory refreshed");
            if let Err(e) = cache.store(name, &records) {
                warn!(snapshot = name, "Failed to persist snapshot: {}", e);
            }
            records
        }
        Err(e) => {
            error!(snapshot = name, "Trouble requesting platform data: {}", e);
            match cache.load::<HashMap<String, T>>(name) {
                Ok(records) => {
                    warn!(
                        snapshot = name,
                        count = records.len(),
                        "Falling back to stale snapshot"
                    );
                    records
                }
                Err(_) => {
                    warn!(snapshot = name, "No snapshot available, continuing empty");
                    HashMap::new()
                }
            }
        }
    }
}
