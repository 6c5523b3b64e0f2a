use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Coarse permission level directly assigned to one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Writer,
    Guest,
}

impl Role {
    /// Every role grants read access.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Writer, Role::Guest];
    /// Roles that may append to a collection.
    pub const WRITERS: [Role; 2] = [Role::Admin, Role::Writer];

    /// Access types mechanically derived from the role when it is assigned.
    pub fn access_types(self) -> BTreeSet<AccessType> {
        match self {
            Role::Admin | Role::Writer => BTreeSet::from([AccessType::Read, AccessType::Write]),
            Role::Guest => BTreeSet::from([AccessType::Read]),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Writer => "WRITER",
            Role::Guest => "GUEST",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "WRITER" => Ok(Role::Writer),
            "GUEST" => Ok(Role::Guest),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

/// Capability bit attached to a policy rule, persisted as `u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum AccessType {
    Any = 0,
    Read = 1,
    Write = 2,
}

impl AccessType {
    /// Whether a rule carrying this access type satisfies a request for `requested`.
    pub fn grants(self, requested: AccessType) -> bool {
        self == AccessType::Any || self == requested
    }
}

impl From<AccessType> for u16 {
    fn from(access_type: AccessType) -> Self {
        access_type as u16
    }
}

impl TryFrom<u16> for AccessType {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccessType::Any),
            1 => Ok(AccessType::Read),
            2 => Ok(AccessType::Write),
            other => Err(format!("Unknown access type {}", other)),
        }
    }
}
