//! Ed25519 identities used as policy subjects

use crate::error::{AccessError, AccessResult};
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Public half of an ed25519 signing identity.
///
/// Serialized as its raw 32 bytes so it matches the persisted `key` field of a
/// public-key access condition. Displayed and parsed as standard base64.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicSignKey([u8; 32]);

impl PublicSignKey {
    /// Create a public key from bytes, rejecting anything that is not a valid ed25519 point
    pub fn from_bytes(bytes: &[u8]) -> AccessResult<Self> {
        let key_bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            AccessError::InvalidIdentity(format!(
                "Public key must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;

        VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| AccessError::InvalidIdentity(e.to_string()))?;

        Ok(Self(key_bytes))
    }

    /// Create a public key from base64-encoded string
    pub fn from_base64(base64_key: &str) -> AccessResult<Self> {
        let bytes = general_purpose::STANDARD
            .decode(base64_key.trim())
            .map_err(|e| AccessError::InvalidIdentity(e.to_string()))?;

        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Get the public key as base64-encoded string
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.0)
    }
}

impl From<VerifyingKey> for PublicSignKey {
    fn from(key: VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl FromStr for PublicSignKey {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64(s)
    }
}

impl fmt::Display for PublicSignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl fmt::Debug for PublicSignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicSignKey({})", self.to_base64())
    }
}

/// Identity of a peer as known to the trusted network.
///
/// Peers are normally addressed by their signing key, but a network root may be configured
/// with an opaque peer identifier. Opaque identifiers only resolve to a public key when they
/// are themselves a base64 encoded ed25519 key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PeerIdentity {
    PublicKey(PublicSignKey),
    Opaque(String),
}

impl PeerIdentity {
    /// Parse a configured identity, keeping it opaque when it is not a valid key
    pub fn parse(value: &str) -> Self {
        match PublicSignKey::from_base64(value) {
            Ok(key) => PeerIdentity::PublicKey(key),
            Err(_) => PeerIdentity::Opaque(value.to_string()),
        }
    }

    pub fn to_public_key(&self) -> Option<PublicSignKey> {
        match self {
            PeerIdentity::PublicKey(key) => Some(*key),
            PeerIdentity::Opaque(id) => PublicSignKey::from_base64(id).ok(),
        }
    }
}

impl From<PublicSignKey> for PeerIdentity {
    fn from(key: PublicSignKey) -> Self {
        PeerIdentity::PublicKey(key)
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerIdentity::PublicKey(key) => write!(f, "{}", key),
            PeerIdentity::Opaque(id) => write!(f, "{}", id),
        }
    }
}

/// Ed25519 key pair for local identities (CLI and tests)
#[derive(Debug)]
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate a new Ed25519 key pair
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create a key pair from a secret key
    pub fn from_secret_key(secret_key: &[u8]) -> AccessResult<Self> {
        let key_bytes: [u8; 32] = secret_key.try_into().map_err(|_| {
            AccessError::InvalidIdentity("Secret key must be 32 bytes".to_string())
        })?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&key_bytes),
        })
    }

    pub fn public_key(&self) -> PublicSignKey {
        self.signing_key.verifying_key().into()
    }

    /// Get the secret key as base64-encoded string
    pub fn secret_key_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.signing_key.to_bytes())
    }
}
