use crate::security::{PeerIdentity, PublicSignKey};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Set of identities that are unconditionally trusted, rooted at one identity.
#[async_trait]
pub trait TrustedNetwork: Send + Sync {
    fn root_identity(&self) -> &PeerIdentity;

    async fn is_trusted(&self, identity: &PublicSignKey) -> bool;
}

/// In-process trusted network: the root plus a mutable set of trusted peers.
#[derive(Debug)]
pub struct StaticTrustedNetwork {
    root: PeerIdentity,
    trusted: RwLock<HashSet<PublicSignKey>>,
}

impl StaticTrustedNetwork {
    pub fn new(root: PeerIdentity) -> Self {
        Self {
            root,
            trusted: RwLock::new(HashSet::new()),
        }
    }

    pub fn with_trusted(root: PeerIdentity, peers: impl IntoIterator<Item = PublicSignKey>) -> Self {
        Self {
            root,
            trusted: RwLock::new(peers.into_iter().collect()),
        }
    }

    /// Adds a peer to the trusted set. Returns false if it was already trusted.
    pub async fn add_trusted(&self, identity: PublicSignKey) -> bool {
        let added = self.trusted.write().await.insert(identity);
        if added {
            log::info!("Added trusted peer {}", identity);
        }
        added
    }

    pub async fn remove_trusted(&self, identity: &PublicSignKey) -> bool {
        let removed = self.trusted.write().await.remove(identity);
        if removed {
            log::info!("Removed trusted peer {}", identity);
        }
        removed
    }

    pub async fn trusted_identities(&self) -> Vec<PublicSignKey> {
        let mut identities: Vec<_> = self.trusted.read().await.iter().copied().collect();
        identities.sort();
        identities
    }
}

#[async_trait]
impl TrustedNetwork for StaticTrustedNetwork {
    fn root_identity(&self) -> &PeerIdentity {
        &self.root
    }

    async fn is_trusted(&self, identity: &PublicSignKey) -> bool {
        if self.root.to_public_key().as_ref() == Some(identity) {
            return true;
        }
        self.trusted.read().await.contains(identity)
    }
}
