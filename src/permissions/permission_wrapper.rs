use crate::error::{AccessError, AccessResult};
use crate::permissions::operation::SignedOperation;
use crate::permissions::resolver::PermissionResolver;
use crate::security::PublicSignKey;
use std::sync::Arc;

/// Adapts resolver decisions into `Result`s for request handlers.
#[derive(Clone)]
pub struct PermissionGuard {
    resolver: Arc<PermissionResolver>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerPermissionResult {
    pub signer: PublicSignKey,
    pub allowed: bool,
}

impl PermissionGuard {
    pub fn new(resolver: Arc<PermissionResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    pub async fn require_read(&self, identity: &PublicSignKey) -> AccessResult<()> {
        if self.resolver.can_read(identity).await {
            Ok(())
        } else {
            Err(AccessError::PermissionDenied(format!(
                "Read access denied for {}",
                identity
            )))
        }
    }

    pub async fn require_write<O: SignedOperation + ?Sized>(&self, operation: &O) -> AccessResult<()> {
        if self.resolver.can_perform(operation).await {
            Ok(())
        } else {
            Err(AccessError::PermissionDenied(format!(
                "Write access denied for signers [{}]",
                operation
                    .signers()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }

    /// Evaluate every signer individually, e.g. to explain a denied write
    pub async fn check_signers<O: SignedOperation + ?Sized>(
        &self,
        operation: &O,
    ) -> Vec<SignerPermissionResult> {
        let mut results = Vec::with_capacity(operation.signers().len());
        for signer in operation.signers() {
            results.push(SignerPermissionResult {
                signer: *signer,
                allowed: self.resolver.can_write(signer).await,
            });
        }
        results
    }
}
