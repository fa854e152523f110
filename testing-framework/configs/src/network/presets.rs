use super::{
    NetworkDefinition, NetworkDefinitionError, NetworkParams,
    node::{NodeConfig, NodeParams, NodeRole},
};
use crate::{constants::STAKING_PRESET_SNOW_SIZE, genesis::GenesisConfig};

/// Id of the `ordinal`-th (1-based) bootstrap node of the staking preset.
#[must_use]
pub fn bootstrap_node_id(ordinal: usize) -> String {
    format!("bootstrap-node-{ordinal}")
}

/// Network with one staking bootstrap node per genesis staker, each pinned to
/// that staker's identity.
pub fn bootstrapping_network(
    params: NetworkParams,
    genesis: &GenesisConfig,
) -> Result<NetworkDefinition, NetworkDefinitionError> {
    let mut definition = NetworkDefinition::new(NetworkParams {
        snow_sample_size: STAKING_PRESET_SNOW_SIZE,
        snow_quorum_size: STAKING_PRESET_SNOW_SIZE,
        ..params
    })?;

    for (index, staker) in genesis.stakers.iter().enumerate() {
        let ordinal = index + 1;
        definition.add_node(NodeConfig::new(NodeParams {
            staking: true,
            credentials: staker.credentials.clone(),
            role: NodeRole::Bootstrap { ordinal },
            ..NodeParams::new(bootstrap_node_id(ordinal))
        }))?;
    }

    Ok(definition)
}
