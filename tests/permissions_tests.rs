use datafold_acl::testing_utils::TestDatabaseFactory;
use datafold_acl::{
    AccessCondition, AccessError, AccessType, BootstrapOutcome, Ed25519KeyPair, Operation,
    PeerIdentity, PolicyQuery, PolicyRecord, PolicyStore, PublicSignKey, Role,
};

fn new_identity() -> PublicSignKey {
    Ed25519KeyPair::generate().public_key()
}

fn write_by(signer: PublicSignKey) -> Operation {
    Operation::new("releases", serde_json::json!({ "title": "demo" })).signed_by(signer)
}

#[tokio::test]
async fn test_trusted_identity_without_role_can_read_and_write() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let peer = new_identity();
    env.trusted_network.add_trusted(peer).await;

    assert_eq!(env.resolver.get_role(&peer).await.unwrap(), None);
    assert!(env.resolver.can_read(&peer).await);
    assert!(env.resolver.can_perform(&write_by(peer)).await);
}

#[tokio::test]
async fn test_guest_can_read_but_not_write() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let user = new_identity();

    env.resolver
        .set_role(&user, Role::Guest, &env.admin)
        .await
        .unwrap();

    assert!(env.resolver.can_read(&user).await);
    assert!(!env.resolver.can_perform(&write_by(user)).await);
}

#[tokio::test]
async fn test_writer_can_read_and_write() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let user = new_identity();

    env.resolver
        .set_role(&user, Role::Writer, &env.admin)
        .await
        .unwrap();

    assert!(env.resolver.can_read(&user).await);
    assert!(env.resolver.can_perform(&write_by(user)).await);
    assert!(env.resolver.has_permission(&user, &Role::WRITERS).await);
    assert!(!env.resolver.has_permission(&user, &[Role::Admin]).await);
}

#[tokio::test]
async fn test_writer_cannot_assign_roles() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let writer = new_identity();
    let target = new_identity();
    env.resolver
        .set_role(&writer, Role::Writer, &env.admin)
        .await
        .unwrap();
    let before = env.resolver.list_policies().await.unwrap();

    let err = env
        .resolver
        .set_role(&target, Role::Admin, &writer)
        .await
        .unwrap_err();

    assert!(matches!(err, AccessError::Authorization(_)));
    assert_eq!(env.resolver.get_role(&target).await.unwrap(), None);
    assert_eq!(env.resolver.list_policies().await.unwrap(), before);
}

#[tokio::test]
async fn test_unassigned_actor_cannot_assign_roles() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let stranger = new_identity();

    let err = env
        .resolver
        .set_role(&stranger, Role::Admin, &stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::Authorization(_)));
    assert_eq!(env.resolver.list_policies().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_open_read_rule_grants_read_only() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let anyone = new_identity();

    env.resolver
        .add_rule([AccessType::Read], AccessCondition::Any, &env.admin)
        .await
        .unwrap();

    assert!(env.resolver.can_read(&anyone).await);
    assert!(!env.resolver.can_perform(&write_by(anyone)).await);
}

#[tokio::test]
async fn test_reassignment_keeps_single_direct_record() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let user = new_identity();

    for role in [Role::Guest, Role::Writer, Role::Admin, Role::Guest, Role::Guest] {
        env.resolver.set_role(&user, role, &env.admin).await.unwrap();
        let direct = env
            .db_ops
            .search(&PolicyQuery::DirectFor(user))
            .await
            .unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].role, Some(role));
    }

    assert_eq!(env.resolver.get_role(&user).await.unwrap(), Some(Role::Guest));
}

#[tokio::test]
async fn test_set_role_replaces_replicated_keyed_rules() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let user = new_identity();
    let keyed = PolicyRecord::rule([AccessType::Write], AccessCondition::public_key(user)).unwrap();
    env.resolver.ingest_replicated(&keyed).await.unwrap();

    env.resolver.set_role(&user, Role::Guest, &env.admin).await.unwrap();

    let for_user: Vec<_> = env
        .resolver
        .list_policies()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.access_condition.subject() == Some(&user))
        .collect();
    assert_eq!(for_user.len(), 1);
    assert_eq!(for_user[0].role, Some(Role::Guest));
    assert!(!env.resolver.can_perform(&write_by(user)).await);
}

#[tokio::test]
async fn test_set_role_is_idempotent() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let user = new_identity();

    let first = env.resolver.set_role(&user, Role::Writer, &env.admin).await.unwrap();
    let second = env.resolver.set_role(&user, Role::Writer, &env.admin).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(env.resolver.list_policies().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_bootstrap_twice_leaves_one_admin_record() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();

    assert_eq!(env.resolver.bootstrap().await, BootstrapOutcome::AlreadyAssigned);
    assert_eq!(env.resolver.bootstrap().await, BootstrapOutcome::AlreadyAssigned);

    let direct = env
        .db_ops
        .search(&PolicyQuery::DirectFor(env.admin))
        .await
        .unwrap();
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0].role, Some(Role::Admin));
}

#[tokio::test]
async fn test_bootstrap_keeps_existing_root_role() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    env.db_ops.remove_for_identity(&env.admin).await.unwrap();
    let guest = PolicyRecord::for_role(env.admin, Role::Guest).unwrap();
    env.db_ops.put(&guest).await.unwrap();

    assert_eq!(env.resolver.bootstrap().await, BootstrapOutcome::AlreadyAssigned);
    assert_eq!(env.resolver.get_role(&env.admin).await.unwrap(), Some(Role::Guest));
}

#[tokio::test]
async fn test_opaque_root_skips_bootstrap() {
    let env = TestDatabaseFactory::create_environment_with_root(PeerIdentity::Opaque(
        "12D3KooWOpaquePeerId".to_string(),
    ))
    .await
    .unwrap();

    assert_eq!(env.resolver.bootstrap().await, BootstrapOutcome::Skipped);
    assert!(env.resolver.list_policies().await.unwrap().is_empty());

    // Still usable in trusted-network-only mode
    let peer = new_identity();
    assert!(!env.resolver.can_read(&peer).await);
    env.trusted_network.add_trusted(peer).await;
    assert!(env.resolver.can_read(&peer).await);
    assert!(env.resolver.can_perform(&write_by(peer)).await);
}

#[tokio::test]
async fn test_vouched_identity_inherits_roles() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let writer = new_identity();
    let guest = new_identity();
    let delegate = new_identity();
    let second_hop = new_identity();
    env.resolver.set_role(&writer, Role::Writer, &env.admin).await.unwrap();
    env.resolver.set_role(&guest, Role::Guest, &env.admin).await.unwrap();

    // guest vouches for delegate: read is inherited, write is not
    env.identity_graph.add_relation(guest, delegate).await;
    assert!(env.resolver.can_read(&delegate).await);
    assert!(!env.resolver.can_perform(&write_by(delegate)).await);

    // writer vouches for delegate who vouches for second_hop
    env.identity_graph.add_relation(writer, delegate).await;
    env.identity_graph.add_relation(delegate, second_hop).await;
    assert!(env.resolver.can_perform(&write_by(delegate)).await);
    assert!(env.resolver.can_perform(&write_by(second_hop)).await);
    assert!(env.resolver.can_read(&second_hop).await);
}

#[tokio::test]
async fn test_vouching_does_not_flow_backwards() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let writer = new_identity();
    let voucher = new_identity();
    env.resolver.set_role(&writer, Role::Writer, &env.admin).await.unwrap();

    // voucher vouches for writer, so voucher gains nothing from writer's role
    env.identity_graph.add_relation(voucher, writer).await;
    assert!(!env.resolver.can_read(&voucher).await);
    assert!(!env.resolver.can_perform(&write_by(voucher)).await);
}

#[tokio::test]
async fn test_trust_is_not_inherited_through_graph() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let trusted = new_identity();
    let delegate = new_identity();
    env.trusted_network.add_trusted(trusted).await;
    env.identity_graph.add_relation(trusted, delegate).await;

    assert!(!env.resolver.can_read(&delegate).await);
    assert!(!env.resolver.can_perform(&write_by(delegate)).await);
}

#[tokio::test]
async fn test_operation_without_signers_is_denied() {
    let env = TestDatabaseFactory::create_test_environment().await.unwrap();
    let unsigned = Operation::new("releases", serde_json::Value::Null);
    assert!(!env.resolver.can_perform(&unsigned).await);
}
