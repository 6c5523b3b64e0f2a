use crate::security::PublicSignKey;
use serde::{Deserialize, Serialize};

/// Anything that carries the identities that signed it.
///
/// Signatures are verified before an operation reaches the resolver; only the signer keys are
/// consulted here.
pub trait SignedOperation {
    fn signers(&self) -> &[PublicSignKey];
}

/// An append to a collection's log, as presented for write authorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub collection: String,
    pub payload: serde_json::Value,
    pub signers: Vec<PublicSignKey>,
}

impl Operation {
    pub fn new(collection: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            collection: collection.into(),
            payload,
            signers: Vec::new(),
        }
    }

    pub fn signed_by(mut self, signer: PublicSignKey) -> Self {
        self.signers.push(signer);
        self
    }
}

impl SignedOperation for Operation {
    fn signers(&self) -> &[PublicSignKey] {
        &self.signers
    }
}

impl SignedOperation for [PublicSignKey] {
    fn signers(&self) -> &[PublicSignKey] {
        self
    }
}

impl SignedOperation for Vec<PublicSignKey> {
    fn signers(&self) -> &[PublicSignKey] {
        self
    }
}
