/// Common constants used across the access-control layer.
///
/// These defaults are used for command line arguments and
/// configuration when explicit values are not provided.
pub const DEFAULT_CONFIG_PATH: &str = "config/acl_config.json";
pub const CONFIG_PATH_ENV: &str = "ACL_CONFIG";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Sled tree holding policy records keyed by content id
pub const POLICY_RECORDS_TREE: &str = "policy_records";
/// Sled tree mapping a subject key to the ids of its direct role records
pub const POLICY_INDEX_TREE: &str = "policy_identity_index";
