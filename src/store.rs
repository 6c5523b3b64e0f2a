//! Document store interface consumed by the permission resolver.
//!
//! The resolver owns the semantics of policy records; storage and replication belong to the
//! store. [`crate::db_operations::DbOperations`] is the sled-backed implementation.

use crate::error::AccessResult;
use crate::permissions::types::PolicyRecord;
use crate::security::PublicSignKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Selects policy records from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyQuery {
    /// Every record
    All,
    /// Direct role assignments for one identity, served from the identity index
    DirectFor(PublicSignKey),
    /// Rules whose condition is not tied to a specific identity
    Generic,
}

/// Replication settings handed to the store at startup. Not interpreted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationOptions {
    pub factor: u32,
    pub min_replicas: u32,
    pub max_replicas: Option<u32>,
}

impl Default for ReplicationOptions {
    fn default() -> Self {
        Self {
            factor: 1,
            min_replicas: 1,
            max_replicas: None,
        }
    }
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Insert a record. Re-inserting identical content is a no-op because ids are content hashes.
    async fn put(&self, record: &PolicyRecord) -> AccessResult<()>;

    /// Delete a record by id, returning whether it existed
    async fn delete(&self, id: &str) -> AccessResult<bool>;

    async fn get(&self, id: &str) -> AccessResult<Option<PolicyRecord>>;

    async fn search(&self, query: &PolicyQuery) -> AccessResult<Vec<PolicyRecord>>;

    /// Atomically replace every record whose condition names `identity` with `record`.
    ///
    /// Returns the ids that were removed.
    async fn replace_for_identity(
        &self,
        identity: &PublicSignKey,
        record: &PolicyRecord,
    ) -> AccessResult<Vec<String>>;

    /// Atomically remove every record whose condition names `identity`, returning the removed ids
    async fn remove_for_identity(&self, identity: &PublicSignKey) -> AccessResult<Vec<String>>;

    /// Rebuild any auxiliary identity index from the authoritative record set
    async fn rebuild_index(&self) -> AccessResult<()>;
}
