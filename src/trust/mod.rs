//! Trust collaborators consumed by the permission resolver.
//!
//! Both are traits so the surrounding program can supply its own replicated implementations;
//! the in-process versions here back the standalone node and the tests.

pub mod identity_graph;
pub mod trusted_network;

pub use identity_graph::{path_generator, Direction, IdentityGraph, MemoryIdentityGraph, Relation};
pub use trusted_network::{StaticTrustedNetwork, TrustedNetwork};
