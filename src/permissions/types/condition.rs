use crate::security::PublicSignKey;
use serde::{Deserialize, Serialize};

/// Predicate deciding whether an identity satisfies a policy rule.
///
/// Persisted with an explicit `type` discriminant so new variants can be added without
/// breaking records already in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AccessCondition {
    /// Satisfied only by the given key
    #[serde(rename = "publicKey")]
    PublicKey { key: PublicSignKey },
    /// Satisfied by every identity
    #[serde(rename = "any")]
    Any,
}

impl AccessCondition {
    pub fn public_key(key: PublicSignKey) -> Self {
        AccessCondition::PublicKey { key }
    }

    pub fn allowed(&self, identity: &PublicSignKey) -> bool {
        match self {
            AccessCondition::PublicKey { key } => key == identity,
            AccessCondition::Any => true,
        }
    }

    /// The subject key for identity-specific conditions
    pub fn subject(&self) -> Option<&PublicSignKey> {
        match self {
            AccessCondition::PublicKey { key } => Some(key),
            AccessCondition::Any => None,
        }
    }

    pub fn is_identity_specific(&self) -> bool {
        self.subject().is_some()
    }
}
