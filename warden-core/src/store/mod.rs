//! Principal storage abstraction.
//!
//! This module provides:
//! - [`PrincipalStore`] - Trait for principal storage backends
//! - [`MemoryPrincipalStore`] - In-memory implementation for tests and development
//! - [`FilePrincipalStore`] - JSON-file implementation for the daemon
//!
//! # Partitions
//!
//! Every store keeps one partition per [`PrincipalKind`]. Lookups never cross
//! partitions, so the same external identity can exist once as a `user` and
//! once as an `expert`.
//!
//! # Uniqueness
//!
//! `(gid, auth_type)` is unique within a partition. Backends enforce this inside
//! [`insert`](PrincipalStore::insert) and report a violation as
//! [`StoreError::Conflict`], so two callbacks racing on a first login cannot
//! both create a principal.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::model::{NewPrincipal, Principal, PrincipalId, PrincipalKind, ProviderTag};

mod file;
mod memory;

pub use file::FilePrincipalStore;
pub use memory::MemoryPrincipalStore;

/// Error type for principal store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A principal with the same external identity already exists in the partition.
    #[error("{kind} with gid {gid} from {provider} already exists")]
    Conflict {
        kind: PrincipalKind,
        gid: String,
        provider: String,
    },

    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// I/O error reading or writing the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration directory not available.
    #[error("configuration directory not available")]
    DataDirUnavailable,
}

impl StoreError {
    pub(crate) fn lock_poisoned(e: impl std::fmt::Display) -> Self {
        Self::BackendError {
            message: format!("lock poisoned: {}", e),
        }
    }
}

/// Abstraction over principal storage backends.
///
/// Implementations include:
/// - [`MemoryPrincipalStore`] - In-memory storage for testing
/// - [`FilePrincipalStore`] - JSON document on disk
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Find a principal by external identity within `kind`'s partition.
    ///
    /// Returns `Ok(None)` if no principal matches.
    async fn find_by_external(
        &self,
        kind: PrincipalKind,
        gid: &str,
        provider: &ProviderTag,
    ) -> Result<Option<Principal>, StoreError>;

    /// Find a principal by storage identifier within `kind`'s partition.
    async fn find_by_id(
        &self,
        kind: PrincipalKind,
        id: &PrincipalId,
    ) -> Result<Option<Principal>, StoreError>;

    /// Persist a new principal, assigning its id and creation time.
    ///
    /// Fails with [`StoreError::Conflict`] if the external identity is already
    /// present in the partition; the check and the write are atomic.
    async fn insert(&self, principal: NewPrincipal) -> Result<Principal, StoreError>;

    /// Remove a principal. Returns whether it existed.
    async fn remove(&self, kind: PrincipalKind, id: &PrincipalId) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S: PrincipalStore + ?Sized> PrincipalStore for Arc<S> {
    async fn find_by_external(
        &self,
        kind: PrincipalKind,
        gid: &str,
        provider: &ProviderTag,
    ) -> Result<Option<Principal>, StoreError> {
        (**self).find_by_external(kind, gid, provider).await
    }

    async fn find_by_id(
        &self,
        kind: PrincipalKind,
        id: &PrincipalId,
    ) -> Result<Option<Principal>, StoreError> {
        (**self).find_by_id(kind, id).await
    }

    async fn insert(&self, principal: NewPrincipal) -> Result<Principal, StoreError> {
        (**self).insert(principal).await
    }

    async fn remove(&self, kind: PrincipalKind, id: &PrincipalId) -> Result<bool, StoreError> {
        (**self).remove(kind, id).await
    }
}

#[async_trait]
impl<S: PrincipalStore + ?Sized> PrincipalStore for Box<S> {
    async fn find_by_external(
        &self,
        kind: PrincipalKind,
        gid: &str,
        provider: &ProviderTag,
    ) -> Result<Option<Principal>, StoreError> {
        (**self).find_by_external(kind, gid, provider).await
    }

    async fn find_by_id(
        &self,
        kind: PrincipalKind,
        id: &PrincipalId,
    ) -> Result<Option<Principal>, StoreError> {
        (**self).find_by_id(kind, id).await
    }

    async fn insert(&self, principal: NewPrincipal) -> Result<Principal, StoreError> {
        (**self).insert(principal).await
    }

    async fn remove(&self, kind: PrincipalKind, id: &PrincipalId) -> Result<bool, StoreError> {
        (**self).remove(kind, id).await
    }
}

/// One kind's principals, shared by the memory and file backends.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub(crate) struct Partition {
    principals: Vec<Principal>,
}

impl Partition {
    pub(crate) fn find_by_external(&self, gid: &str, provider: &ProviderTag) -> Option<&Principal> {
        self.principals
            .iter()
            .find(|p| p.gid == gid && &p.auth_type == provider)
    }

    pub(crate) fn find_by_id(&self, id: &PrincipalId) -> Option<&Principal> {
        self.principals.iter().find(|p| &p.id == id)
    }

    /// Check uniqueness and append in one step.
    pub(crate) fn insert(&mut self, new: NewPrincipal) -> Result<Principal, StoreError> {
        if self.find_by_external(&new.gid, &new.auth_type).is_some() {
            return Err(StoreError::Conflict {
                kind: new.kind,
                gid: new.gid,
                provider: new.auth_type.to_string(),
            });
        }

        let principal = new.into_principal(PrincipalId::generate(), chrono::Utc::now());
        self.principals.push(principal.clone());
        Ok(principal)
    }

    pub(crate) fn remove(&mut self, id: &PrincipalId) -> bool {
        let initial_len = self.principals.len();
        self.principals.retain(|p| &p.id != id);
        self.principals.len() != initial_len
    }

    pub(crate) fn len(&self) -> usize {
        self.principals.len()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::model::{NewPrincipal, PrincipalKind, ProviderTag};

    pub fn new_principal(kind: PrincipalKind, gid: &str) -> NewPrincipal {
        NewPrincipal {
            kind,
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@example.com".to_string(),
            gid: gid.to_string(),
            auth_type: ProviderTag::gmail(),
            email_verified: true,
        }
    }
}
