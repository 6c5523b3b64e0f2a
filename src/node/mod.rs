//! Standalone access-control node.
//!
//! Wires the sled policy store and the in-process trust collaborators together from an
//! [`AccessConfig`] and bootstraps the root administrator.

pub mod config;

pub use config::{load_access_config, AccessConfig, RelationConfig};

use crate::db_operations::DbOperations;
use crate::error::AccessResult;
use crate::permissions::{PermissionGuard, PermissionResolver};
use crate::trust::{MemoryIdentityGraph, StaticTrustedNetwork, TrustedNetwork};
use std::sync::Arc;

pub struct AccessNode {
    config: AccessConfig,
    db_ops: Arc<DbOperations>,
    trusted_network: Arc<StaticTrustedNetwork>,
    identity_graph: Arc<MemoryIdentityGraph>,
    resolver: Arc<PermissionResolver>,
}

impl AccessNode {
    /// Open the store described by `config` and run the admin bootstrap.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use datafold_acl::{AccessConfig, AccessNode, Ed25519KeyPair, Role};
    ///
    /// # tokio_test::block_on(async {
    /// let root = Ed25519KeyPair::generate().public_key();
    /// let config = AccessConfig::temporary().with_root_identity(root.to_base64());
    ///
    /// let node = AccessNode::open(config).await?;
    /// let resolver = node.resolver();
    /// assert_eq!(resolver.get_role(&root).await?, Some(Role::Admin));
    /// assert!(resolver.can_write(&root).await);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// # });
    /// ```
    pub async fn open(config: AccessConfig) -> AccessResult<Self> {
        config.validate()?;

        let db = if config.temporary {
            sled::Config::new().temporary(true).open()?
        } else {
            sled::open(&config.storage_path)?
        };
        let db_ops = Arc::new(DbOperations::new(db, config.replication.clone())?);

        let trusted_network = Arc::new(StaticTrustedNetwork::with_trusted(
            config.root_peer()?,
            config.trusted_keys()?,
        ));

        let identity_graph = Arc::new(MemoryIdentityGraph::new());
        for relation in config.relation_keys()? {
            identity_graph.add_relation(relation.from, relation.to).await;
        }

        let resolver = PermissionResolver::builder()
            .store(db_ops.clone())
            .trusted_network(trusted_network.clone())
            .identity_graph(identity_graph.clone())
            .open()
            .await?;

        log::info!(
            "Access node opened at {} (root {})",
            if config.temporary {
                "<temporary>".to_string()
            } else {
                config.storage_path.display().to_string()
            },
            trusted_network.root_identity()
        );

        Ok(Self {
            config,
            db_ops,
            trusted_network,
            identity_graph,
            resolver: Arc::new(resolver),
        })
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn resolver(&self) -> Arc<PermissionResolver> {
        self.resolver.clone()
    }

    pub fn guard(&self) -> PermissionGuard {
        PermissionGuard::new(self.resolver.clone())
    }

    pub fn trusted_network(&self) -> &StaticTrustedNetwork {
        &self.trusted_network
    }

    pub fn identity_graph(&self) -> &MemoryIdentityGraph {
        &self.identity_graph
    }

    pub fn db_ops(&self) -> &DbOperations {
        &self.db_ops
    }

    pub fn close(&self) {
        self.db_ops.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Role;
    use crate::security::Ed25519KeyPair;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_bootstraps_root() {
        let root = Ed25519KeyPair::generate().public_key();
        let node = AccessNode::open(AccessConfig::temporary().with_root_identity(root.to_base64()))
            .await
            .unwrap();

        assert_eq!(node.resolver().get_role(&root).await.unwrap(), Some(Role::Admin));
    }

    #[tokio::test]
    async fn test_open_without_root_fails() {
        let result = AccessNode::open(AccessConfig::temporary()).await;
        assert!(matches!(
            result.err(),
            Some(crate::error::AccessError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_roles_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let root = Ed25519KeyPair::generate().public_key();
        let writer = Ed25519KeyPair::generate().public_key();
        let config = AccessConfig::new(dir.path().join("acl_db")).with_root_identity(root.to_base64());

        {
            let node = AccessNode::open(config.clone()).await.unwrap();
            node.resolver()
                .set_role(&writer, Role::Writer, &root)
                .await
                .unwrap();
            node.close();
        }

        let node = AccessNode::open(config).await.unwrap();
        assert_eq!(node.resolver().get_role(&writer).await.unwrap(), Some(Role::Writer));
        assert_eq!(node.resolver().list_policies().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_configured_relations_grant_transitively() {
        let root = Ed25519KeyPair::generate().public_key();
        let writer = Ed25519KeyPair::generate().public_key();
        let delegate = Ed25519KeyPair::generate().public_key();
        let config = AccessConfig::temporary()
            .with_root_identity(root.to_base64())
            .with_relation(&writer, &delegate);
        let node = AccessNode::open(config).await.unwrap();

        assert!(!node.resolver().can_write(&delegate).await);
        node.resolver()
            .set_role(&writer, Role::Writer, &root)
            .await
            .unwrap();
        assert!(node.resolver().can_write(&delegate).await);
    }
}
