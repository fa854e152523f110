use std::sync::Arc;

use testnet_config::{
    genesis::GenesisConfig,
    network::{
        NetworkDefinition, NetworkDefinitionError, NetworkParams, NodeConfig, NodeParams,
        presets::bootstrapping_network,
    },
};
use testnet_core::{nodes::UserPass, topology::TopologyOrchestrator};
use tracing::info;

use crate::{
    bootstrap::bootstrap_added_nodes,
    error::WorkflowError,
    settings::{StakeAmounts, WorkflowSettings},
    topology::Topology,
};

pub const VALIDATOR_NODE: &str = "validator-node";
pub const DELEGATOR_NODE: &str = "delegator-node";

const GENESIS_USERNAME: &str = "genesis";
const GENESIS_PASSWORD: &str = "MyNameIs!Jeff";
const STAKER_USERNAME: &str = "staker";
const STAKER_PASSWORD: &str = "test34test!23";
const DELEGATOR_USERNAME: &str = "delegator";
const DELEGATOR_PASSWORD: &str = "test34test!23";

const DEFAULT_ADDED_NODES: usize = 2;

/// Five bootstrap stakers plus a validator and a delegator node. The
/// validator stakes, the delegator delegates to it, both return their
/// leftovers to X, and finally a couple of fresh nodes join the network.
#[derive(Clone, Debug)]
pub struct StakingScenario {
    pub amounts: StakeAmounts,
    pub added_nodes: usize,
    /// Image of the nodes this scenario adds; `None` uses the network image.
    pub image: Option<String>,
}

impl Default for StakingScenario {
    fn default() -> Self {
        Self {
            amounts: StakeAmounts::default(),
            added_nodes: DEFAULT_ADDED_NODES,
            image: None,
        }
    }
}

impl StakingScenario {
    pub fn definition(
        &self,
        params: NetworkParams,
        genesis: &GenesisConfig,
    ) -> Result<NetworkDefinition, NetworkDefinitionError> {
        let mut definition = bootstrapping_network(
            NetworkParams {
                tx_fee: self.amounts.fee,
                ..params
            },
            genesis,
        )?;
        for id in [VALIDATOR_NODE, DELEGATOR_NODE] {
            definition.add_node(NodeConfig::new(NodeParams {
                image: self.image.clone(),
                staking: true,
                ..NodeParams::new(id)
            }))?;
        }
        Ok(definition)
    }

    /// Start `definition` and drive the whole staking workflow against it.
    pub async fn run(
        &self,
        orchestrator: Arc<TopologyOrchestrator>,
        definition: &mut NetworkDefinition,
        genesis: &GenesisConfig,
        settings: WorkflowSettings,
    ) -> Result<Topology, WorkflowError> {
        let amounts = self.amounts;
        amounts.validate()?;
        orchestrator.start_network(definition).await?;

        let mut topology = Topology::new(Arc::clone(&orchestrator), settings);
        let validator = topology
            .add_node(VALIDATOR_NODE, UserPass::new(STAKER_USERNAME, STAKER_PASSWORD))
            .await?
            .clone();
        let delegator = topology
            .add_node(
                DELEGATOR_NODE,
                UserPass::new(DELEGATOR_USERNAME, DELEGATOR_PASSWORD),
            )
            .await?
            .clone();
        topology
            .add_genesis(
                VALIDATOR_NODE,
                UserPass::new(GENESIS_USERNAME, GENESIS_PASSWORD),
                &genesis.funded,
            )
            .await?
            .fund_x_addresses(&[validator.x_address(), delegator.x_address()], amounts.total)
            .await?;

        validator.become_validator(&amounts).await?;
        delegator
            .become_delegator(&amounts, validator.node_id())
            .await?;
        validator.return_stake_leftover(&amounts).await?;
        delegator.return_stake_leftover(&amounts).await?;
        info!("transferred staker and delegator leftovers back to the X lane");

        bootstrap_added_nodes(
            &orchestrator,
            definition,
            self.image.as_deref(),
            self.added_nodes,
        )
        .await?;
        info!(nodes = orchestrator.node_ids().len(), "staking scenario finished");
        Ok(topology)
    }
}
