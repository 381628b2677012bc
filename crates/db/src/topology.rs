//! Topology files: groups of databases declared in YAML or TOML.
//!
//! ```yaml
//! groups:
//!   primary:
//!     databases:
//!       default: { driver_type: mysql, host: db1, port: 3306, user: app, db_name: app }
//!     derive:
//!       - from: default
//!         targets: { order: order_db, goods: goods_db }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::DbConfig;
use crate::derive::register_to_db;
use crate::error::{Error, Result};
use crate::lifecycle::Manager;

/// Every group of a deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topology {
    /// Groups by name.
    #[serde(default)]
    pub groups: BTreeMap<String, GroupSpec>,
}

/// One group: explicit databases plus derived ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupSpec {
    /// Databases by registry name.
    pub databases: BTreeMap<String, DbConfig>,
    /// Databases derived from one of `databases`.
    pub derive: Vec<DeriveSpec>,
}

/// Derive `targets` (registry name to database name) from `from`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeriveSpec {
    /// Source entry in the same group.
    pub from: String,
    /// Registry name to database name.
    #[serde(default)]
    pub targets: BTreeMap<String, String>,
}

impl Topology {
    /// Load a topology file; `.toml` files are parsed as TOML, anything
    /// else as YAML.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, [`Error::Topology`] if it
    /// cannot be parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            toml::from_str(&text).map_err(|err| err.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|err| err.to_string())
        };
        let topology: Self = parsed.map_err(|reason| Error::topology(path, reason))?;
        tracing::debug!(path = %path.display(), groups = topology.groups.len(), "Loaded topology");
        Ok(topology)
    }

    /// Parse YAML text.
    ///
    /// # Errors
    ///
    /// [`Error::Topology`] on malformed input.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|err| Error::topology("<yaml>", err.to_string()))
    }

    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// [`Error::Topology`] on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| Error::topology("<toml>", err.to_string()))
    }

    /// Register everything into `manager`.
    ///
    /// Groups are created as needed. Each database gets its registry name
    /// as `name` when none is set and is [prepared](DbConfig::prepare)
    /// before registration; derivations run after the group's explicit
    /// databases. Nothing is opened.
    ///
    /// # Errors
    ///
    /// Stops at the first driver resolution or derivation failure; entries
    /// registered before it stay registered.
    pub fn apply(&self, manager: &Manager) -> Result<()> {
        for (group_name, spec) in &self.groups {
            manager.add_group(group_name.as_str());
            let group = manager.group(group_name)?;

            for (name, config) in &spec.databases {
                let mut config = config.clone();
                if config.name.is_empty() {
                    name.clone_into(&mut config.name);
                }
                config.prepare()?;
                group.register(name.as_str(), config)?;
            }

            for derive in &spec.derive {
                for (to, to_db_name) in &derive.targets {
                    register_to_db(&group, &derive.from, to, to_db_name)?;
                }
            }
            tracing::info!(group = %group_name, entries = group.len(), "Applied topology group");
        }
        Ok(())
    }
}
