pub mod condition;
pub mod policy;
pub mod role;

pub use condition::AccessCondition;
pub use policy::{PolicyRecord, PolicyRecordBuilder};
pub use role::{AccessType, Role};
