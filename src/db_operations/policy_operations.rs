use crate::db_operations::DbOperations;
use crate::error::{AccessError, AccessResult};
use crate::permissions::types::PolicyRecord;
use crate::security::PublicSignKey;
use crate::store::{PolicyQuery, PolicyStore};
use async_trait::async_trait;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree,
};
use sled::Transactional;
use std::collections::{BTreeMap, BTreeSet};

type IdSet = BTreeSet<String>;

fn abort<E: Into<AccessError>>(error: E) -> ConflictableTransactionError<AccessError> {
    ConflictableTransactionError::Abort(error.into())
}

fn read_index(
    index: &TransactionalTree,
    identity: &PublicSignKey,
) -> ConflictableTransactionResult<IdSet, AccessError> {
    match index.get(identity.as_bytes())? {
        Some(bytes) => serde_json::from_slice(&bytes).map_err(abort),
        None => Ok(IdSet::new()),
    }
}

fn write_index(
    index: &TransactionalTree,
    identity: &PublicSignKey,
    ids: &IdSet,
) -> ConflictableTransactionResult<(), AccessError> {
    if ids.is_empty() {
        index.remove(identity.as_bytes().as_slice())?;
    } else {
        let bytes = serde_json::to_vec(ids).map_err(abort)?;
        index.insert(identity.as_bytes().as_slice(), bytes)?;
    }
    Ok(())
}

fn insert_record(
    records: &TransactionalTree,
    index: &TransactionalTree,
    record: &PolicyRecord,
) -> ConflictableTransactionResult<(), AccessError> {
    let bytes = serde_json::to_vec(record).map_err(abort)?;
    records.insert(record.id.as_bytes(), bytes)?;

    if let Some(subject) = record.access_condition.subject() {
        let mut ids = read_index(index, subject)?;
        if ids.insert(record.id.clone()) {
            write_index(index, subject, &ids)?;
        }
    }
    Ok(())
}

fn remove_indexed(
    records: &TransactionalTree,
    index: &TransactionalTree,
    identity: &PublicSignKey,
) -> ConflictableTransactionResult<Vec<String>, AccessError> {
    let ids = read_index(index, identity)?;
    for id in &ids {
        records.remove(id.as_bytes())?;
    }
    write_index(index, identity, &IdSet::new())?;
    Ok(ids.into_iter().collect())
}

impl DbOperations {
    fn load_record(&self, id: &str) -> AccessResult<Option<PolicyRecord>> {
        self.get_from_tree(&self.policy_records_tree, id.as_bytes())
    }

    fn indexed_ids(&self, identity: &PublicSignKey) -> AccessResult<IdSet> {
        Ok(self
            .get_from_tree(&self.policy_index_tree, identity.as_bytes())?
            .unwrap_or_default())
    }
}

#[async_trait]
impl PolicyStore for DbOperations {
    async fn put(&self, record: &PolicyRecord) -> AccessResult<()> {
        (&self.policy_records_tree, &self.policy_index_tree)
            .transaction(|(records, index)| insert_record(records, index, record))?;
        self.flush()
    }

    async fn delete(&self, id: &str) -> AccessResult<bool> {
        let existed = (&self.policy_records_tree, &self.policy_index_tree).transaction(
            |(records, index)| -> ConflictableTransactionResult<bool, AccessError> {
                let Some(bytes) = records.remove(id.as_bytes())? else {
                    return Ok(false);
                };

                // An undecodable record has nothing we can unindex; removing it is enough.
                if let Ok(old) = serde_json::from_slice::<PolicyRecord>(&bytes) {
                    if let Some(subject) = old.access_condition.subject() {
                        let mut ids = read_index(index, subject)?;
                        ids.remove(id);
                        write_index(index, subject, &ids)?;
                    }
                }
                Ok(true)
            },
        )?;
        self.flush()?;
        Ok(existed)
    }

    async fn get(&self, id: &str) -> AccessResult<Option<PolicyRecord>> {
        self.load_record(id)
    }

    async fn search(&self, query: &PolicyQuery) -> AccessResult<Vec<PolicyRecord>> {
        match query {
            PolicyQuery::All => self.list_items_in_tree(&self.policy_records_tree),
            PolicyQuery::Generic => Ok(self
                .list_items_in_tree::<PolicyRecord>(&self.policy_records_tree)?
                .into_iter()
                .filter(PolicyRecord::is_generic)
                .collect()),
            PolicyQuery::DirectFor(identity) => {
                let mut found = Vec::new();
                for id in self.indexed_ids(identity)? {
                    match self.load_record(&id) {
                        Ok(Some(record)) if record.role_subject() == Some(identity) => {
                            found.push(record)
                        }
                        // Keyed rules share the index but are not role assignments
                        Ok(Some(record)) if record.access_condition.subject() == Some(identity) => {}
                        Ok(Some(_)) => {
                            log::warn!("Index entry {} does not belong to {}", id, identity)
                        }
                        Ok(None) => log::debug!("Index entry {} has no record", id),
                        Err(e) => log::error!("Skipping undecodable policy record {}: {}", id, e),
                    }
                }
                Ok(found)
            }
        }
    }

    async fn replace_for_identity(
        &self,
        identity: &PublicSignKey,
        record: &PolicyRecord,
    ) -> AccessResult<Vec<String>> {
        if record.role_subject() != Some(identity) {
            return Err(AccessError::InvalidIdentity(format!(
                "Record {} is not a role assignment for {}",
                record.id, identity
            )));
        }

        let removed = (&self.policy_records_tree, &self.policy_index_tree).transaction(
            |(records, index)| -> ConflictableTransactionResult<Vec<String>, AccessError> {
                let removed = remove_indexed(records, index, identity)?;
                insert_record(records, index, record)?;
                Ok(removed)
            },
        )?;
        self.flush()?;

        Ok(removed.into_iter().filter(|id| id != &record.id).collect())
    }

    async fn remove_for_identity(&self, identity: &PublicSignKey) -> AccessResult<Vec<String>> {
        let removed = (&self.policy_records_tree, &self.policy_index_tree)
            .transaction(|(records, index)| remove_indexed(records, index, identity))?;
        self.flush()?;
        Ok(removed)
    }

    async fn rebuild_index(&self) -> AccessResult<()> {
        let mut rebuilt: BTreeMap<PublicSignKey, IdSet> = BTreeMap::new();
        for record in self.list_items_in_tree::<PolicyRecord>(&self.policy_records_tree)? {
            if let Some(subject) = record.access_condition.subject() {
                rebuilt.entry(*subject).or_default().insert(record.id.clone());
            }
        }

        let mut batch = sled::Batch::default();
        for key in self.policy_index_tree.iter().keys() {
            batch.remove(key?);
        }
        for (subject, ids) in &rebuilt {
            batch.insert(subject.as_bytes().as_slice(), serde_json::to_vec(ids)?);
        }
        self.policy_index_tree.apply_batch(batch)?;
        self.flush()?;

        log::info!("Rebuilt policy index for {} identities", rebuilt.len());
        Ok(())
    }
}
