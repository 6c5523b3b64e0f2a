use crate::error::{AccessError, AccessResult};
use crate::permissions::operation::SignedOperation;
use crate::permissions::types::{AccessCondition, AccessType, PolicyRecord, Role};
use crate::security::{PeerIdentity, PublicSignKey};
use crate::store::{PolicyQuery, PolicyStore};
use crate::trust::{path_generator, Direction, IdentityGraph, MemoryIdentityGraph, TrustedNetwork};
use futures::StreamExt;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Result of the one-time administrator bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The root identity was assigned `ADMIN`
    Assigned,
    /// The root identity already had a direct role
    AlreadyAssigned,
    /// The root identity is not a public key; only trusted-network checks apply
    Skipped,
    /// The store could not be queried or written
    Failed,
}

/// Resolves roles and read/write decisions for presented identities.
///
/// Decisions are made in strict precedence order, short-circuiting on the first grant:
/// 1. membership of the trusted network
/// 2. the identity's directly assigned role
/// 3. generic rules whose condition is not tied to an identity
/// 4. roles (and, for reads, generic rules) of every identity that vouches for it in the
///    identity graph, directly or transitively
///
/// Decision functions are total: storage failures are logged and count as a denial.
pub struct PermissionResolver {
    store: Arc<dyn PolicyStore>,
    trusted_network: Arc<dyn TrustedNetwork>,
    identity_graph: Arc<dyn IdentityGraph>,
}

/// Dependency injection for [`PermissionResolver`].
#[derive(Default)]
pub struct ResolverBuilder {
    store: Option<Arc<dyn PolicyStore>>,
    trusted_network: Option<Arc<dyn TrustedNetwork>>,
    identity_graph: Option<Arc<dyn IdentityGraph>>,
}

impl ResolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: Arc<dyn PolicyStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn trusted_network(mut self, network: Arc<dyn TrustedNetwork>) -> Self {
        self.trusted_network = Some(network);
        self
    }

    pub fn identity_graph(mut self, graph: Arc<dyn IdentityGraph>) -> Self {
        self.identity_graph = Some(graph);
        self
    }

    pub fn build(self) -> AccessResult<PermissionResolver> {
        let store = self
            .store
            .ok_or_else(|| AccessError::Configuration("No policy store configured".to_string()))?;
        let trusted_network = self.trusted_network.ok_or_else(|| {
            AccessError::Configuration("No trusted network configured".to_string())
        })?;

        if let PeerIdentity::Opaque(id) = trusted_network.root_identity() {
            if id.trim().is_empty() {
                return Err(AccessError::Configuration(
                    "Trusted network has no root identity".to_string(),
                ));
            }
        }

        let identity_graph = self.identity_graph.unwrap_or_else(|| {
            log::debug!("No identity graph configured, transitive grants disabled");
            Arc::new(MemoryIdentityGraph::new())
        });

        Ok(PermissionResolver {
            store,
            trusted_network,
            identity_graph,
        })
    }

    /// Build the resolver, rebuild the store's identity index and run the bootstrap.
    pub async fn open(self) -> AccessResult<PermissionResolver> {
        let resolver = self.build()?;
        resolver.store.rebuild_index().await?;
        resolver.bootstrap().await;
        Ok(resolver)
    }
}

/// Drops records whose id does not match their content.
fn verified(records: Vec<PolicyRecord>) -> Vec<PolicyRecord> {
    records
        .into_iter()
        .filter(|record| match record.assert_id() {
            Ok(()) => true,
            Err(e) => {
                log::error!("Rejecting policy record {}: {}", record.id, e);
                false
            }
        })
        .collect()
}

impl PermissionResolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    pub fn trusted_network(&self) -> &Arc<dyn TrustedNetwork> {
        &self.trusted_network
    }

    /// Verified direct role records for `identity`, smallest id first.
    async fn direct_records(&self, identity: &PublicSignKey) -> AccessResult<Vec<PolicyRecord>> {
        let mut records = verified(
            self.store
                .search(&PolicyQuery::DirectFor(*identity))
                .await?,
        );
        records.retain(|r| r.role_subject() == Some(identity));
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    /// The identity's directly assigned role.
    ///
    /// Concurrent reassignment on different replicas can leave more than one direct record;
    /// the record with the lexicographically smallest id wins.
    pub async fn get_role(&self, identity: &PublicSignKey) -> AccessResult<Option<Role>> {
        let records = self.direct_records(identity).await?;
        if records.len() > 1 {
            log::warn!(
                "{} direct role records for {}, using {}",
                records.len(),
                identity,
                records[0].id
            );
        }
        Ok(records.first().and_then(|r| r.role))
    }

    async fn require_admin(&self, actor: &PublicSignKey, action: &str) -> AccessResult<()> {
        match self.get_role(actor).await? {
            Some(Role::Admin) => Ok(()),
            other => {
                let held = other.map_or("no role".to_string(), |r| r.to_string());
                log::warn!("Refused {} by {} ({})", action, actor, held);
                Err(AccessError::Authorization(format!(
                    "{} requires ADMIN, actor {} has {}",
                    action, actor, held
                )))
            }
        }
    }

    /// Assign `role` to `target`, replacing any role it held. Only administrators may do this.
    pub async fn set_role(
        &self,
        target: &PublicSignKey,
        role: Role,
        actor: &PublicSignKey,
    ) -> AccessResult<PolicyRecord> {
        self.require_admin(actor, "set_role").await?;

        let record = PolicyRecord::for_role(*target, role)?;
        let removed = self.store.replace_for_identity(target, &record).await?;
        log::info!(
            "Assigned {} to {} (replaced {} record(s))",
            role,
            target,
            removed.len()
        );
        Ok(record)
    }

    /// Return `target` to unassigned. Only administrators may do this.
    pub async fn revoke_role(
        &self,
        target: &PublicSignKey,
        actor: &PublicSignKey,
    ) -> AccessResult<Vec<String>> {
        self.require_admin(actor, "revoke_role").await?;

        let removed = self.store.remove_for_identity(target).await?;
        log::info!("Revoked role of {} ({} record(s))", target, removed.len());
        Ok(removed)
    }

    /// Add a rule that is not tied to a specific identity.
    pub async fn add_rule(
        &self,
        access_types: impl IntoIterator<Item = AccessType>,
        condition: AccessCondition,
        actor: &PublicSignKey,
    ) -> AccessResult<PolicyRecord> {
        self.require_admin(actor, "add_rule").await?;
        if condition.is_identity_specific() {
            return Err(AccessError::Configuration(
                "Identity specific grants are made with set_role".to_string(),
            ));
        }
        let record = PolicyRecord::rule(access_types, condition)?;

        self.store.put(&record).await?;
        log::info!("Added generic rule {}", record.id);
        Ok(record)
    }

    /// Delete a generic rule. Returns false if no record has this id.
    ///
    /// Role assignments and keyed rules are refused; they are removed with `revoke_role`.
    pub async fn remove_rule(&self, id: &str, actor: &PublicSignKey) -> AccessResult<bool> {
        self.require_admin(actor, "remove_rule").await?;

        let Some(record) = self.store.get(id).await? else {
            return Ok(false);
        };
        if !record.is_generic() {
            return Err(AccessError::Configuration(format!(
                "Policy record {} is tied to an identity, use revoke_role",
                id
            )));
        }

        let removed = self.store.delete(id).await?;
        log::info!("Removed generic rule {}", id);
        Ok(removed)
    }

    /// Accept a record received from another replica after checking its integrity.
    pub async fn ingest_replicated(&self, record: &PolicyRecord) -> AccessResult<()> {
        if let Err(e) = record.assert_id() {
            log::error!("Rejecting replicated policy record {}: {}", record.id, e);
            return Err(e);
        }
        self.store.put(record).await
    }

    /// Every record in the store that passes the integrity check
    pub async fn list_policies(&self) -> AccessResult<Vec<PolicyRecord>> {
        let mut records = verified(self.store.search(&PolicyQuery::All).await?);
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    pub async fn has_permission(&self, identity: &PublicSignKey, roles: &[Role]) -> bool {
        match self.get_role(identity).await {
            Ok(Some(role)) => roles.contains(&role),
            Ok(None) => false,
            Err(e) => {
                log::error!("Role lookup failed for {}: {}", identity, e);
                false
            }
        }
    }

    /// Verified generic rules granting `requested`
    async fn generic_rules(&self, requested: AccessType) -> Vec<PolicyRecord> {
        match self.store.search(&PolicyQuery::Generic).await {
            Ok(records) => verified(records)
                .into_iter()
                .filter(|r| r.grants(requested))
                .collect(),
            Err(e) => {
                log::error!("Generic rule lookup failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn grants_read(&self, identity: &PublicSignKey, generic: &[PolicyRecord]) -> bool {
        self.has_permission(identity, &Role::ALL).await
            || generic
                .iter()
                .any(|rule| rule.access_condition.allowed(identity))
    }

    pub async fn can_read(&self, identity: &PublicSignKey) -> bool {
        if self.trusted_network.is_trusted(identity).await {
            return true;
        }

        let generic = self.generic_rules(AccessType::Read).await;
        if self.grants_read(identity, &generic).await {
            return true;
        }

        let mut vouchers = path_generator(self.identity_graph.as_ref(), *identity, Direction::Incoming);
        while let Some(relation) = vouchers.next().await {
            let voucher = relation.reached(Direction::Incoming);
            if self.grants_read(&voucher, &generic).await {
                log::debug!("Read granted to {} through {}", identity, voucher);
                return true;
            }
        }

        log::debug!("Read denied for {}", identity);
        false
    }

    async fn can_write_with(&self, signer: &PublicSignKey, generic: &[PolicyRecord]) -> bool {
        if self.trusted_network.is_trusted(signer).await {
            return true;
        }
        if self.has_permission(signer, &Role::WRITERS).await {
            return true;
        }
        if generic.iter().any(|rule| rule.access_condition.allowed(signer)) {
            return true;
        }

        // Only role grants propagate along the graph for writes.
        let mut vouchers = path_generator(self.identity_graph.as_ref(), *signer, Direction::Incoming);
        while let Some(relation) = vouchers.next().await {
            let voucher = relation.reached(Direction::Incoming);
            if self.has_permission(&voucher, &Role::WRITERS).await {
                log::debug!("Write granted to {} through {}", signer, voucher);
                return true;
            }
        }
        false
    }

    /// Whether a single signer may write
    pub async fn can_write(&self, signer: &PublicSignKey) -> bool {
        let generic = self.generic_rules(AccessType::Write).await;
        self.can_write_with(signer, &generic).await
    }

    /// Authorize a write: allowed if any one of its signers may write.
    pub async fn can_perform<O: SignedOperation + ?Sized>(&self, operation: &O) -> bool {
        let signers: BTreeSet<&PublicSignKey> = operation.signers().iter().collect();
        if signers.is_empty() {
            log::debug!("Write denied: operation has no signers");
            return false;
        }

        let generic = self.generic_rules(AccessType::Write).await;
        for signer in signers {
            if self.can_write_with(signer, &generic).await {
                return true;
            }
        }

        log::debug!("Write denied for all signers");
        false
    }

    /// Assign `ADMIN` to the trusted network's root if it has no direct role yet.
    ///
    /// This is the only path that assigns a role without an administrator actor. It never
    /// fails: problems are logged and reported through the outcome.
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        let root = self.trusted_network.root_identity();
        let Some(root_key) = root.to_public_key() else {
            log::warn!(
                "Root identity {} is not a public key, skipping admin bootstrap",
                root
            );
            return BootstrapOutcome::Skipped;
        };

        match self.get_role(&root_key).await {
            Ok(Some(role)) => {
                log::info!("Root identity {} already has role {}", root_key, role);
                return BootstrapOutcome::AlreadyAssigned;
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("Admin bootstrap could not read roles: {}", e);
                return BootstrapOutcome::Failed;
            }
        }

        let result = match PolicyRecord::for_role(root_key, Role::Admin) {
            Ok(record) => self.store.replace_for_identity(&root_key, &record).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(_) => {
                log::info!("Bootstrapped {} as ADMIN", root_key);
                BootstrapOutcome::Assigned
            }
            Err(e) => {
                log::error!("Admin bootstrap failed: {}", e);
                BootstrapOutcome::Failed
            }
        }
    }
}
