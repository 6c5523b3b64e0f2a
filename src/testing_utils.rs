//! Shared test fixtures: temporary sled stores and fully wired resolvers.

use crate::db_operations::DbOperations;
use crate::error::AccessResult;
use crate::permissions::PermissionResolver;
use crate::security::{Ed25519KeyPair, PeerIdentity, PublicSignKey};
use crate::store::ReplicationOptions;
use crate::trust::{MemoryIdentityGraph, StaticTrustedNetwork};
use sled::Db;
use std::sync::Arc;

/// A resolver over a temporary store, with handles to every collaborator.
pub struct TestEnvironment {
    pub db_ops: Arc<DbOperations>,
    pub trusted_network: Arc<StaticTrustedNetwork>,
    pub identity_graph: Arc<MemoryIdentityGraph>,
    pub resolver: Arc<PermissionResolver>,
    /// Root of the trusted network, bootstrapped as `ADMIN`
    pub admin: PublicSignKey,
}

pub struct TestDatabaseFactory;

impl TestDatabaseFactory {
    /// Create a temporary sled database for testing
    pub fn create_temp_sled_db() -> Result<Db, sled::Error> {
        sled::Config::new().temporary(true).open()
    }

    pub fn create_temp_db_ops() -> AccessResult<DbOperations> {
        let db = Self::create_temp_sled_db()?;
        DbOperations::new(db, ReplicationOptions::default())
    }

    /// Resolver whose trusted network is rooted at a fresh key, already bootstrapped
    pub async fn create_test_environment() -> AccessResult<TestEnvironment> {
        let admin = Ed25519KeyPair::generate().public_key();
        Self::create_environment_with_root(admin.into()).await
    }

    /// Resolver rooted at `root`. `admin` is a fresh unassigned key when `root` is opaque.
    pub async fn create_environment_with_root(root: PeerIdentity) -> AccessResult<TestEnvironment> {
        crate::logging::init_test_logging();

        let admin = root
            .to_public_key()
            .unwrap_or_else(|| Ed25519KeyPair::generate().public_key());
        let db_ops = Arc::new(Self::create_temp_db_ops()?);
        let trusted_network = Arc::new(StaticTrustedNetwork::new(root));
        let identity_graph = Arc::new(MemoryIdentityGraph::new());

        let resolver = PermissionResolver::builder()
            .store(db_ops.clone())
            .trusted_network(trusted_network.clone())
            .identity_graph(identity_graph.clone())
            .open()
            .await?;

        Ok(TestEnvironment {
            db_ops,
            trusted_network,
            identity_graph,
            resolver: Arc::new(resolver),
            admin,
        })
    }
}
