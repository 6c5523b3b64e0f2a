// permissions module

pub mod operation;
pub mod permission_wrapper;
pub mod resolver;
pub mod types;

pub use operation::{Operation, SignedOperation};
pub use permission_wrapper::{PermissionGuard, SignerPermissionResult};
pub use resolver::{BootstrapOutcome, PermissionResolver, ResolverBuilder};
pub use types::{AccessCondition, AccessType, PolicyRecord, PolicyRecordBuilder, Role};
