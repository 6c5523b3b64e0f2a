// Core database operations
pub mod core;
mod policy_operations;

// Re-export the main DbOperations struct
pub use self::core::DbOperations;
