use std::{fs, io, path::{Path, PathBuf}};

use serde::Deserialize;
use thiserror::Error;

use super::{
    NetworkDefinition, NetworkDefinitionError, NetworkParams,
    node::{NodeConfig, NodeParams, NodeRole},
};
use crate::{constants::DEFAULT_BOOTSTRAP_ATTEMPTS, genesis::GenesisConfig};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read network manifest {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse network manifest")]
    Parse(#[from] serde_yaml::Error),
    #[error("node `{node}` references staker {staker}, genesis has {available}")]
    UnknownStaker {
        node: String,
        staker: usize,
        available: usize,
    },
    #[error(transparent)]
    Definition(#[from] NetworkDefinitionError),
}

/// YAML description of a network.
///
/// ```yaml
/// image: avaplatform/avalanchego:dev
/// tx_fee: 1000000000
/// snow_sample_size: 5
/// snow_quorum_size: 5
/// nodes:
///   - id: bootstrap-node-1
///     bootstrap: true
///     staking: true
///     staker: 0
///   - id: validator-node
///     staking: true
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkManifest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tx_fee: Option<u64>,
    #[serde(default)]
    pub snow_sample_size: Option<u32>,
    #[serde(default)]
    pub snow_quorum_size: Option<u32>,
    #[serde(default)]
    pub nodes: Vec<NodeManifest>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeManifest {
    pub id: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub staking: bool,
    #[serde(default)]
    pub bootstrap: bool,
    #[serde(default)]
    pub ordinal: usize,
    /// Index into the genesis stakers whose identity this node takes.
    #[serde(default)]
    pub staker: Option<usize>,
    #[serde(default)]
    pub bootstrap_attempts: Option<u32>,
}

impl NetworkManifest {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let raw = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Build a validated definition, nodes added in manifest order.
    pub fn into_definition(
        self,
        genesis: &GenesisConfig,
    ) -> Result<NetworkDefinition, ManifestError> {
        let defaults = NetworkParams::default();
        let mut definition = NetworkDefinition::new(NetworkParams {
            image: self.image.unwrap_or(defaults.image),
            tx_fee: self.tx_fee.unwrap_or(defaults.tx_fee),
            snow_sample_size: self.snow_sample_size.unwrap_or(defaults.snow_sample_size),
            snow_quorum_size: self.snow_quorum_size.unwrap_or(defaults.snow_quorum_size),
        })?;

        for node in self.nodes {
            let credentials = match node.staker {
                Some(index) => {
                    let staker = genesis.stakers.get(index).ok_or_else(|| {
                        ManifestError::UnknownStaker {
                            node: node.id.clone(),
                            staker: index,
                            available: genesis.stakers.len(),
                        }
                    })?;
                    staker.credentials.clone()
                }
                None => None,
            };
            let role = if node.bootstrap {
                NodeRole::Bootstrap {
                    ordinal: node.ordinal,
                }
            } else {
                NodeRole::Regular
            };
            definition.add_node(NodeConfig::new(NodeParams {
                image: node.image,
                staking: node.staking,
                credentials,
                role,
                bootstrap_attempts: node.bootstrap_attempts.unwrap_or(DEFAULT_BOOTSTRAP_ATTEMPTS),
                ..NodeParams::new(node.id)
            }))?;
        }

        Ok(definition)
    }
}
