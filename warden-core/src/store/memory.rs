//! In-memory principal storage implementation.

use async_trait::async_trait;
use std::sync::RwLock;

use super::{Partition, PrincipalStore, StoreError};
use crate::model::{NewPrincipal, Principal, PrincipalId, PrincipalKind, ProviderTag};

/// In-memory principal store for testing and development.
///
/// This store is not persistent; data is lost when the process exits.
///
/// # Thread Safety
///
/// Each partition sits behind its own `RwLock`, so lookups run concurrently
/// and an insert holds the write lock across its uniqueness check.
pub struct MemoryPrincipalStore {
    users: RwLock<Partition>,
    experts: RwLock<Partition>,
}

impl MemoryPrincipalStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            users: RwLock::new(Partition::default()),
            experts: RwLock::new(Partition::default()),
        }
    }

    fn partition(&self, kind: PrincipalKind) -> &RwLock<Partition> {
        match kind {
            PrincipalKind::User => &self.users,
            PrincipalKind::Expert => &self.experts,
        }
    }

    /// Number of principals stored in `kind`'s partition.
    pub fn len(&self, kind: PrincipalKind) -> Result<usize, StoreError> {
        let partition = self
            .partition(kind)
            .read()
            .map_err(StoreError::lock_poisoned)?;
        Ok(partition.len())
    }

    /// Whether both partitions are empty.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len(PrincipalKind::User)? == 0 && self.len(PrincipalKind::Expert)? == 0)
    }
}

impl Default for MemoryPrincipalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryPrincipalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPrincipalStore")
            .field("users", &self.len(PrincipalKind::User).unwrap_or(0))
            .field("experts", &self.len(PrincipalKind::Expert).unwrap_or(0))
            .finish()
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn find_by_external(
        &self,
        kind: PrincipalKind,
        gid: &str,
        provider: &ProviderTag,
    ) -> Result<Option<Principal>, StoreError> {
        let partition = self
            .partition(kind)
            .read()
            .map_err(StoreError::lock_poisoned)?;
        Ok(partition.find_by_external(gid, provider).cloned())
    }

    async fn find_by_id(
        &self,
        kind: PrincipalKind,
        id: &PrincipalId,
    ) -> Result<Option<Principal>, StoreError> {
        let partition = self
            .partition(kind)
            .read()
            .map_err(StoreError::lock_poisoned)?;
        Ok(partition.find_by_id(id).cloned())
    }

    async fn insert(&self, principal: NewPrincipal) -> Result<Principal, StoreError> {
        let mut partition = self
            .partition(principal.kind)
            .write()
            .map_err(StoreError::lock_poisoned)?;
        partition.insert(principal)
    }

    async fn remove(&self, kind: PrincipalKind, id: &PrincipalId) -> Result<bool, StoreError> {
        let mut partition = self
            .partition(kind)
            .write()
            .map_err(StoreError::lock_poisoned)?;
        Ok(partition.remove(id))
    }
}
