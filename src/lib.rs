//! # DataFold Access Control
//!
//! Decides who may read or write records in a replicated, multi-writer DataFold store shared
//! by untrusted peers.
//!
//! ## Core Components
//!
//! * `permissions` - Policy records, role resolution and read/write decisions
//! * `trust` - Trusted network and identity graph collaborators
//! * `store` - Document store interface for policy records
//! * `db_operations` - Sled-backed policy store
//! * `security` - Ed25519 identities
//! * `node` - Configuration and a standalone node wiring everything together
//! * `error` - Error types and handling
//!
//! ## Decisions
//!
//! A request is granted by, in order: trusted network membership, a directly assigned role,
//! a generic rule (such as "anyone may read"), or a role held by an identity that vouches for
//! the requester in the identity graph. Policy records are content addressed, and every record
//! is checked against its id before it takes part in a decision.

pub mod constants;
pub mod db_operations;
pub mod error;
pub mod logging;
pub mod node;
pub mod permissions;
pub mod security;
pub mod store;
pub mod testing_utils;
pub mod trust;

// Re-export main types for convenience
pub use db_operations::DbOperations;
pub use error::{AccessError, AccessResult};
pub use node::{load_access_config, AccessConfig, AccessNode};
pub use permissions::{
    AccessCondition, AccessType, BootstrapOutcome, Operation, PermissionGuard, PermissionResolver,
    PolicyRecord, ResolverBuilder, Role, SignedOperation,
};
pub use security::{Ed25519KeyPair, PeerIdentity, PublicSignKey};
pub use store::{PolicyQuery, PolicyStore, ReplicationOptions};
pub use trust::{IdentityGraph, MemoryIdentityGraph, StaticTrustedNetwork, TrustedNetwork};
