use super::condition::AccessCondition;
use super::role::{AccessType, Role};
use crate::error::{AccessError, AccessResult};
use crate::security::PublicSignKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Content-addressed access rule.
///
/// The `id` is never assigned by callers: it is the hex SHA-256 of the canonical JSON form of
/// `(access_types, access_condition, role)`, so identical rules always share an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRecord {
    pub id: String,
    pub access_types: BTreeSet<AccessType>,
    pub access_condition: AccessCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Field order here is the canonical hashing order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdPreimage<'a> {
    access_types: &'a BTreeSet<AccessType>,
    access_condition: &'a AccessCondition,
    role: Option<Role>,
}

impl PolicyRecord {
    /// Direct role assignment for one identity
    pub fn for_role(key: PublicSignKey, role: Role) -> AccessResult<Self> {
        PolicyRecordBuilder::new()
            .access_condition(AccessCondition::public_key(key))
            .role(role)
            .build()
    }

    /// Role-less rule, e.g. an "open to everyone" read grant
    pub fn rule(
        access_types: impl IntoIterator<Item = AccessType>,
        access_condition: AccessCondition,
    ) -> AccessResult<Self> {
        PolicyRecordBuilder::new()
            .access_types(access_types)
            .access_condition(access_condition)
            .build()
    }

    pub fn calculate_id(&self) -> AccessResult<String> {
        if self.access_types.is_empty() {
            return Err(AccessError::NotInitialized(
                "Policy record has no access types".to_string(),
            ));
        }

        let preimage = IdPreimage {
            access_types: &self.access_types,
            access_condition: &self.access_condition,
            role: self.role,
        };
        let bytes = serde_json::to_vec(&preimage)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Verify the stored id against the record content.
    pub fn assert_id(&self) -> AccessResult<()> {
        let expected = self.calculate_id()?;
        if expected != self.id {
            return Err(AccessError::Integrity(format!(
                "Policy record id {} does not match content hash {}",
                self.id, expected
            )));
        }
        Ok(())
    }

    /// The identity this record assigns a role to, if it is a direct role assignment
    pub fn role_subject(&self) -> Option<&PublicSignKey> {
        self.role.and(self.access_condition.subject())
    }

    /// Whether this record is a rule that applies independent of a specific identity
    pub fn is_generic(&self) -> bool {
        !self.access_condition.is_identity_specific()
    }

    pub fn grants(&self, requested: AccessType) -> bool {
        self.access_types.iter().any(|t| t.grants(requested))
    }
}

/// Builder for policy records; `build` computes the content id.
#[derive(Debug, Default, Clone)]
pub struct PolicyRecordBuilder {
    access_types: Option<BTreeSet<AccessType>>,
    access_condition: Option<AccessCondition>,
    role: Option<Role>,
}

impl PolicyRecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_types(mut self, access_types: impl IntoIterator<Item = AccessType>) -> Self {
        self.access_types = Some(access_types.into_iter().collect());
        self
    }

    pub fn access_condition(mut self, condition: AccessCondition) -> Self {
        self.access_condition = Some(condition);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn build(self) -> AccessResult<PolicyRecord> {
        let access_condition = self.access_condition.ok_or_else(|| {
            AccessError::NotInitialized("Policy record has no access condition".to_string())
        })?;

        // Role assignments derive their access types; role-less rules must state them.
        let access_types = match (self.access_types, self.role) {
            (Some(types), _) if !types.is_empty() => types,
            (_, Some(role)) => role.access_types(),
            _ => {
                return Err(AccessError::NotInitialized(
                    "Policy record has neither access types nor a role".to_string(),
                ))
            }
        };

        let mut record = PolicyRecord {
            id: String::new(),
            access_types,
            access_condition,
            role: self.role,
        };
        record.id = record.calculate_id()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::Ed25519KeyPair;

    #[test]
    fn test_identical_content_same_id() {
        let key = Ed25519KeyPair::generate().public_key();
        let a = PolicyRecord::for_role(key, Role::Writer).unwrap();
        let b = PolicyRecord::for_role(key, Role::Writer).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 64);
        a.assert_id().unwrap();
    }

    #[test]
    fn test_any_field_change_changes_id() {
        let key = Ed25519KeyPair::generate().public_key();
        let base = PolicyRecord::for_role(key, Role::Writer).unwrap();

        let mut role_changed = base.clone();
        role_changed.role = Some(Role::Admin);
        assert_ne!(role_changed.calculate_id().unwrap(), base.id);
        assert!(matches!(role_changed.assert_id(), Err(AccessError::Integrity(_))));

        let mut condition_changed = base.clone();
        condition_changed.access_condition = AccessCondition::Any;
        assert!(matches!(condition_changed.assert_id(), Err(AccessError::Integrity(_))));

        let mut types_changed = base.clone();
        types_changed.access_types.remove(&AccessType::Write);
        assert!(matches!(types_changed.assert_id(), Err(AccessError::Integrity(_))));

        let mut role_removed = base;
        role_removed.role = None;
        assert!(matches!(role_removed.assert_id(), Err(AccessError::Integrity(_))));
    }

    #[test]
    fn test_access_type_order_does_not_matter() {
        let a = PolicyRecord::rule([AccessType::Write, AccessType::Read], AccessCondition::Any)
            .unwrap();
        let b = PolicyRecord::rule([AccessType::Read, AccessType::Write], AccessCondition::Any)
            .unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_incomplete_records_are_rejected() {
        let err = PolicyRecordBuilder::new()
            .access_types([AccessType::Read])
            .build()
            .unwrap_err();
        assert!(matches!(err, AccessError::NotInitialized(_)));

        let err = PolicyRecordBuilder::new()
            .access_condition(AccessCondition::Any)
            .build()
            .unwrap_err();
        assert!(matches!(err, AccessError::NotInitialized(_)));

        let mut record = PolicyRecord::rule([AccessType::Read], AccessCondition::Any).unwrap();
        record.access_types.clear();
        assert!(matches!(record.calculate_id(), Err(AccessError::NotInitialized(_))));
    }

    #[test]
    fn test_persisted_shape() {
        let key = Ed25519KeyPair::generate().public_key();
        let record = PolicyRecord::for_role(key, Role::Guest).unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], serde_json::Value::String(record.id.clone()));
        assert_eq!(json["accessTypes"], serde_json::json!([1]));
        assert_eq!(json["role"], "GUEST");
        assert_eq!(json["accessCondition"]["type"], "publicKey");

        let rule = PolicyRecord::rule([AccessType::Read], AccessCondition::Any).unwrap();
        let json = serde_json::to_value(&rule).unwrap();
        assert!(json.get("role").is_none());
        let parsed: PolicyRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn test_role_subject_only_for_role_records() {
        let key = Ed25519KeyPair::generate().public_key();
        let assignment = PolicyRecord::for_role(key, Role::Admin).unwrap();
        assert_eq!(assignment.role_subject(), Some(&key));
        assert!(!assignment.is_generic());

        let keyed_rule =
            PolicyRecord::rule([AccessType::Read], AccessCondition::public_key(key)).unwrap();
        assert_eq!(keyed_rule.role_subject(), None);

        let open = PolicyRecord::rule([AccessType::Any], AccessCondition::Any).unwrap();
        assert!(open.is_generic());
        assert!(open.grants(AccessType::Write));
    }
}
