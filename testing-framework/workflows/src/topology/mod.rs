mod genesis;
mod node;

use std::{collections::BTreeMap, sync::Arc};

pub use genesis::Genesis;
pub use node::RunningNode;
use testnet_config::{
    constants::DEFAULT_USER_PASSWORD, genesis::FundedAccount, network::NetworkDefinition,
};
use testnet_core::{nodes::UserPass, topology::TopologyOrchestrator};
use tracing::info;

use crate::{error::WorkflowError, settings::WorkflowSettings};

/// Workflow view of a running network: nodes with keystore users and
/// addresses, plus the genesis funder.
pub struct Topology {
    orchestrator: Arc<TopologyOrchestrator>,
    settings: Arc<WorkflowSettings>,
    genesis: Option<Genesis>,
    nodes: BTreeMap<String, RunningNode>,
}

impl Topology {
    #[must_use]
    pub fn new(orchestrator: Arc<TopologyOrchestrator>, settings: WorkflowSettings) -> Self {
        Self {
            orchestrator,
            settings: Arc::new(settings),
            genesis: None,
            nodes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Arc<TopologyOrchestrator> {
        &self.orchestrator
    }

    /// Register an orchestrated node, creating `user` and its addresses.
    pub async fn add_node(
        &mut self,
        id: &str,
        user: UserPass,
    ) -> Result<&RunningNode, WorkflowError> {
        let tracked = self.orchestrator.tracked(id)?;
        let node = RunningNode::register(tracked, user, Arc::clone(&self.settings)).await?;
        self.nodes.insert(id.to_owned(), node);
        self.node(id)
    }

    /// Make `id` the genesis funder by importing the funded account under
    /// `user`.
    pub async fn add_genesis(
        &mut self,
        id: &str,
        user: UserPass,
        funded: &FundedAccount,
    ) -> Result<&Genesis, WorkflowError> {
        let client = self.orchestrator.client(id)?;
        let genesis = Genesis::import_funds(
            id.to_owned(),
            client,
            user,
            funded.private_key.clone(),
            Arc::clone(&self.settings),
        )
        .await?;
        Ok(self.genesis.insert(genesis))
    }

    /// Register every node of `definition`, each with a user named after it.
    pub async fn load_defined_network(
        &mut self,
        definition: &NetworkDefinition,
    ) -> Result<(), WorkflowError> {
        for config in definition.nodes() {
            self.add_node(config.id(), UserPass::new(config.id(), DEFAULT_USER_PASSWORD))
                .await?;
        }
        info!(nodes = self.nodes.len(), "loaded defined network into topology");
        Ok(())
    }

    pub fn genesis(&self) -> Result<&Genesis, WorkflowError> {
        self.genesis.as_ref().ok_or(WorkflowError::MissingGenesis)
    }

    pub fn node(&self, id: &str) -> Result<&RunningNode, WorkflowError> {
        self.nodes
            .get(id)
            .ok_or_else(|| WorkflowError::UnknownNode { id: id.to_owned() })
    }

    /// Nodes ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &RunningNode> {
        self.nodes.values()
    }

    /// Forget a node. The underlying service keeps running.
    pub fn remove_node(&mut self, id: &str) -> Option<RunningNode> {
        self.nodes.remove(id)
    }
}
