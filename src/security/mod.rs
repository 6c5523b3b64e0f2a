//! Identity primitives for access control
//!
//! Signature verification happens in the calling layer; by the time an identity reaches this
//! crate it is considered presented. This module only models and parses the identities.

pub mod keys;

pub use keys::{Ed25519KeyPair, PeerIdentity, PublicSignKey};
