use crate::error::AccessResult;
use crate::store::ReplicationOptions;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Sled-backed policy storage.
///
/// Records live in `policy_records` keyed by their content id. The
/// `policy_identity_index` tree maps a key to the ids of every record whose condition names
/// that key (role assignments and keyed rules). It is only ever written in the same
/// transaction as the records tree.
#[derive(Clone)]
pub struct DbOperations {
    /// The underlying sled database instance
    db: sled::Db,
    pub(crate) policy_records_tree: sled::Tree,
    pub(crate) policy_index_tree: sled::Tree,
    replication: ReplicationOptions,
}

impl DbOperations {
    pub fn new(db: sled::Db, replication: ReplicationOptions) -> AccessResult<Self> {
        let policy_records_tree = db.open_tree(crate::constants::POLICY_RECORDS_TREE)?;
        let policy_index_tree = db.open_tree(crate::constants::POLICY_INDEX_TREE)?;

        log::debug!(
            "Opened policy store with replication factor {} (min {}, max {:?})",
            replication.factor,
            replication.min_replicas,
            replication.max_replicas
        );

        Ok(Self {
            db,
            policy_records_tree,
            policy_index_tree,
            replication,
        })
    }

    /// Gets a reference to the underlying database
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    pub fn replication(&self) -> &ReplicationOptions {
        &self.replication
    }

    /// Gets database statistics
    pub fn get_stats(&self) -> HashMap<String, u64> {
        let mut stats = HashMap::new();
        stats.insert(
            "policy_records".to_string(),
            self.policy_records_tree.len() as u64,
        );
        stats.insert(
            "indexed_identities".to_string(),
            self.policy_index_tree.len() as u64,
        );
        stats
    }

    /// Generic function to retrieve any deserializable item from a specific tree
    pub fn get_from_tree<T: DeserializeOwned>(
        &self,
        tree: &sled::Tree,
        key: &[u8],
    ) -> AccessResult<Option<T>> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List all decodable values in a tree. Entries that fail to decode are logged and skipped.
    pub fn list_items_in_tree<T: DeserializeOwned>(&self, tree: &sled::Tree) -> AccessResult<Vec<T>> {
        let mut items = Vec::new();
        for result in tree.iter() {
            let (key, value) = result?;
            match serde_json::from_slice(&value) {
                Ok(item) => items.push(item),
                Err(e) => {
                    log::error!(
                        "Skipping undecodable entry '{}': {}",
                        String::from_utf8_lossy(&key),
                        e
                    );
                }
            }
        }
        Ok(items)
    }

    /// Ensure written policy data is durable before reporting success
    pub fn flush(&self) -> AccessResult<()> {
        self.db.flush()?;
        Ok(())
    }

    pub fn close(&self) {
        if let Err(e) = self.db.flush() {
            log::error!("Failed to flush database: {}", e);
        }
    }
}
