//! Disk-backed principal storage.
//!
//! Principals are kept in a single JSON document, one array per partition,
//! written back after every successful mutation.
//!
//! # Storage Location
//!
//! By default the document lives at `~/.local/share/warden/principals.json` on
//! Linux, the platform data directory elsewhere.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{Partition, PrincipalStore, StoreError};
use crate::model::{NewPrincipal, Principal, PrincipalId, PrincipalKind, ProviderTag};

/// Internal storage format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PrincipalStoreData {
    /// Version of the store format (for future migrations).
    version: u32,

    #[serde(default)]
    users: Partition,

    #[serde(default)]
    experts: Partition,
}

impl Default for PrincipalStoreData {
    fn default() -> Self {
        Self {
            version: 1,
            users: Partition::default(),
            experts: Partition::default(),
        }
    }
}

impl PrincipalStoreData {
    fn partition(&self, kind: PrincipalKind) -> &Partition {
        match kind {
            PrincipalKind::User => &self.users,
            PrincipalKind::Expert => &self.experts,
        }
    }

    fn partition_mut(&mut self, kind: PrincipalKind) -> &mut Partition {
        match kind {
            PrincipalKind::User => &mut self.users,
            PrincipalKind::Expert => &mut self.experts,
        }
    }
}

/// Principal store persisted as a JSON file.
///
/// The whole document is cached in memory behind a single `RwLock`. Writers
/// hold the lock while saving, so concurrent inserts cannot both pass the
/// uniqueness check.
pub struct FilePrincipalStore {
    path: PathBuf,
    data: RwLock<PrincipalStoreData>,
}

impl FilePrincipalStore {
    /// Get the default storage path.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("com", "raibid-labs", "warden")
            .ok_or(StoreError::DataDirUnavailable)?;

        Ok(dirs.data_dir().join("principals.json"))
    }

    /// Load the store from the default location.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from_path(Self::default_path()?)
    }

    /// Load the store from a specific path.
    ///
    /// Creates parent directories if they don't exist. A missing file is
    /// treated as an empty store and written on the first insert.
    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            PrincipalStoreData::default()
        };

        tracing::debug!(
            "Loaded principal store from {:?} ({} users, {} experts)",
            path,
            data.users.len(),
            data.experts.len()
        );

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn save(&self, data: &PrincipalStoreData) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Get the storage path for this store.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for FilePrincipalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePrincipalStore")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl PrincipalStore for FilePrincipalStore {
    async fn find_by_external(
        &self,
        kind: PrincipalKind,
        gid: &str,
        provider: &ProviderTag,
    ) -> Result<Option<Principal>, StoreError> {
        let data = self.data.read().map_err(StoreError::lock_poisoned)?;
        Ok(data.partition(kind).find_by_external(gid, provider).cloned())
    }

    async fn find_by_id(
        &self,
        kind: PrincipalKind,
        id: &PrincipalId,
    ) -> Result<Option<Principal>, StoreError> {
        let data = self.data.read().map_err(StoreError::lock_poisoned)?;
        Ok(data.partition(kind).find_by_id(id).cloned())
    }

    async fn insert(&self, principal: NewPrincipal) -> Result<Principal, StoreError> {
        let mut data = self.data.write().map_err(StoreError::lock_poisoned)?;
        let mut next = data.clone();
        let created = next.partition_mut(principal.kind).insert(principal)?;

        // Memory only changes once the document is on disk.
        self.save(&next)?;
        *data = next;
        Ok(created)
    }

    async fn remove(&self, kind: PrincipalKind, id: &PrincipalId) -> Result<bool, StoreError> {
        let mut data = self.data.write().map_err(StoreError::lock_poisoned)?;
        let mut next = data.clone();
        if !next.partition_mut(kind).remove(id) {
            return Ok(false);
        }

        self.save(&next)?;
        *data = next;
        Ok(true)
    }
}
