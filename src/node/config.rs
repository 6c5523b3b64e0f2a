use crate::constants::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_LOG_LEVEL};
use crate::error::{AccessError, AccessResult};
use crate::security::{PeerIdentity, PublicSignKey};
use crate::store::ReplicationOptions;
use crate::trust::Relation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A configured identity graph edge, both ends base64 public keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationConfig {
    pub from: String,
    pub to: String,
}

/// Configuration for an [`AccessNode`](super::AccessNode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Path where the policy store keeps its data
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    /// Use a throwaway sled database that is removed when the node closes
    #[serde(default)]
    pub temporary: bool,
    /// Root of the trusted network: a base64 ed25519 key or an opaque peer id
    #[serde(default)]
    pub root_identity: Option<String>,
    /// Additional trusted peers, base64 ed25519 keys
    #[serde(default)]
    pub trusted_peers: Vec<String>,
    /// Initial identity graph edges
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
    /// Passed through to the store
    #[serde(default)]
    pub replication: ReplicationOptions,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("datafold_acl"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            temporary: false,
            root_identity: None,
            trusted_peers: Vec::new(),
            relations: Vec::new(),
            replication: ReplicationOptions::default(),
            log_level: default_log_level(),
        }
    }
}

impl AccessConfig {
    /// Create a new configuration with the specified storage path
    pub fn new(storage_path: PathBuf) -> Self {
        Self {
            storage_path,
            ..Default::default()
        }
    }

    /// Configuration backed by a temporary database, mostly for tests
    pub fn temporary() -> Self {
        Self {
            temporary: true,
            ..Default::default()
        }
    }

    pub fn with_root_identity(mut self, root: impl Into<String>) -> Self {
        self.root_identity = Some(root.into());
        self
    }

    pub fn with_trusted_peer(mut self, peer: &PublicSignKey) -> Self {
        self.trusted_peers.push(peer.to_base64());
        self
    }

    pub fn with_relation(mut self, from: &PublicSignKey, to: &PublicSignKey) -> Self {
        self.relations.push(RelationConfig {
            from: from.to_base64(),
            to: to.to_base64(),
        });
        self
    }

    pub fn root_peer(&self) -> AccessResult<PeerIdentity> {
        match self.root_identity.as_deref().map(str::trim) {
            Some(root) if !root.is_empty() => Ok(PeerIdentity::parse(root)),
            _ => Err(AccessError::Configuration(
                "root_identity must be set".to_string(),
            )),
        }
    }

    pub fn trusted_keys(&self) -> AccessResult<Vec<PublicSignKey>> {
        self.trusted_peers
            .iter()
            .map(|peer| PublicSignKey::from_base64(peer))
            .collect()
    }

    pub fn relation_keys(&self) -> AccessResult<Vec<Relation>> {
        self.relations
            .iter()
            .map(|r| {
                Ok(Relation::new(
                    PublicSignKey::from_base64(&r.from)?,
                    PublicSignKey::from_base64(&r.to)?,
                ))
            })
            .collect()
    }

    pub fn validate(&self) -> AccessResult<()> {
        self.root_peer()?;
        self.trusted_keys()?;
        self.relation_keys()?;

        let replication = &self.replication;
        if replication.factor == 0 || replication.min_replicas == 0 {
            return Err(AccessError::Configuration(
                "replication factor and min_replicas must be at least 1".to_string(),
            ));
        }
        if let Some(max) = replication.max_replicas {
            if max < replication.min_replicas {
                return Err(AccessError::Configuration(format!(
                    "max_replicas ({}) is below min_replicas ({})",
                    max, replication.min_replicas
                )));
            }
        }
        Ok(())
    }
}

fn parse_config(path: &Path, contents: &str) -> AccessResult<AccessConfig> {
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    if is_toml {
        Ok(toml::from_str(contents)?)
    } else {
        Ok(serde_json::from_str(contents)?)
    }
}

/// Load an access configuration from the given path or from the `ACL_CONFIG`
/// environment variable.
///
/// `.toml` files are parsed as TOML, anything else as JSON. If the file does not exist a
/// default [`AccessConfig`] is returned.
pub fn load_access_config(path: Option<&str>) -> AccessResult<AccessConfig> {
    let config_path = path
        .map(|p| p.to_string())
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config_path = PathBuf::from(config_path);

    if !config_path.exists() {
        log::info!(
            "No configuration at {}, using defaults",
            config_path.display()
        );
        return Ok(AccessConfig::default());
    }

    let contents = std::fs::read_to_string(&config_path)?;
    parse_config(&config_path, &contents).map_err(|e| {
        log::error!("Failed to parse access configuration: {}", e);
        e
    })
}
