use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use super::node::{BootstrapPeer, NodeConfig, NodeRole, join_identities};
use crate::{
    constants::{DEFAULT_SNOW_QUORUM_SIZE, DEFAULT_SNOW_SAMPLE_SIZE, node_image},
    units::DEFAULT_TX_FEE,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkDefinitionError {
    #[error("node `{id}` is already part of the network")]
    DuplicateNode { id: String },
    #[error("bootstrap node `{id}` requested position {ordinal}, next free position is {next}")]
    InvalidBootstrapOrdinal {
        id: String,
        ordinal: usize,
        next: usize,
    },
    #[error("snow quorum size {quorum} must be within 1..={sample}")]
    InvalidConsensusSizes { sample: u32, quorum: u32 },
    #[error("network image must not be empty")]
    EmptyImage,
    #[error("node id must not be empty")]
    EmptyNodeId,
}

/// Network-wide parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkParams {
    pub image: String,
    pub tx_fee: u64,
    pub snow_sample_size: u32,
    pub snow_quorum_size: u32,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            image: node_image(),
            tx_fee: DEFAULT_TX_FEE,
            snow_sample_size: DEFAULT_SNOW_SAMPLE_SIZE,
            snow_quorum_size: DEFAULT_SNOW_QUORUM_SIZE,
        }
    }
}

impl NetworkParams {
    pub fn validate(&self) -> Result<(), NetworkDefinitionError> {
        if self.image.trim().is_empty() {
            return Err(NetworkDefinitionError::EmptyImage);
        }
        if self.snow_quorum_size == 0 || self.snow_quorum_size > self.snow_sample_size {
            return Err(NetworkDefinitionError::InvalidConsensusSizes {
                sample: self.snow_sample_size,
                quorum: self.snow_quorum_size,
            });
        }
        Ok(())
    }
}

/// Set of nodes plus the bootstrap chain they form.
///
/// Populated single-threaded before orchestration starts. The chain order is
/// the start-up order: the node at position `i` may assume positions `0..i`
/// are already running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkDefinition {
    params: NetworkParams,
    nodes: HashMap<String, NodeConfig>,
    order: Vec<String>,
    bootstrap_chain: Vec<BootstrapPeer>,
}

impl NetworkDefinition {
    pub fn new(params: NetworkParams) -> Result<Self, NetworkDefinitionError> {
        params.validate()?;
        Ok(Self {
            params,
            nodes: HashMap::new(),
            order: Vec::new(),
            bootstrap_chain: Vec::new(),
        })
    }

    /// Add a node, stamping it with the current bootstrap chain.
    ///
    /// Bootstrap nodes are appended to the chain after being stamped, so the
    /// k-th bootstrap node depends on exactly the k-1 before it. Regular
    /// nodes depend on the whole chain as it stands now.
    pub fn add_node(
        &mut self,
        mut node: NodeConfig,
    ) -> Result<&NodeConfig, NetworkDefinitionError> {
        if node.id().is_empty() {
            return Err(NetworkDefinitionError::EmptyNodeId);
        }
        if self.nodes.contains_key(node.id()) {
            return Err(NetworkDefinitionError::DuplicateNode {
                id: node.id().to_owned(),
            });
        }
        if let NodeRole::Bootstrap { ordinal } = node.role() {
            let next = self.bootstrap_chain.len() + 1;
            if ordinal != 0 && ordinal != next {
                return Err(NetworkDefinitionError::InvalidBootstrapOrdinal {
                    id: node.id().to_owned(),
                    ordinal,
                    next,
                });
            }
        }

        node.stamp(&self.bootstrap_chain);
        if node.is_bootstrap() {
            self.bootstrap_chain.push(node.as_peer());
        }
        debug!(
            node = node.id(),
            bootstrap = node.is_bootstrap(),
            depends_on = %node.bootstrap_ids(),
            "node added to network definition"
        );

        let id = node.id().to_owned();
        self.order.push(id.clone());
        Ok(self.nodes.entry(id).or_insert(node))
    }

    /// Remove a node. Snapshots already taken by nodes added after it are
    /// left untouched.
    ///
    /// A removed bootstrap node also leaves the chain, so nodes added later
    /// never depend on it and the next free ordinal shrinks by one.
    pub fn remove_node(&mut self, id: &str) -> Option<NodeConfig> {
        let removed = self.nodes.remove(id)?;
        self.order.retain(|entry| entry != id);
        self.bootstrap_chain.retain(|peer| peer.node != id);
        Some(removed)
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&NodeConfig> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeConfig> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Bootstrap nodes in chain order.
    pub fn bootstrap_nodes(&self) -> impl Iterator<Item = &NodeConfig> {
        self.bootstrap_chain
            .iter()
            .filter_map(|peer| self.nodes.get(&peer.node))
    }

    /// Non-bootstrap nodes in insertion order.
    pub fn regular_nodes(&self) -> impl Iterator<Item = &NodeConfig> {
        self.nodes().filter(|node| !node.is_bootstrap())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn bootstrap_chain(&self) -> &[BootstrapPeer] {
        &self.bootstrap_chain
    }

    /// Comma-joined identities of the whole bootstrap chain.
    #[must_use]
    pub fn bootstrap_ids(&self) -> String {
        join_identities(&self.bootstrap_chain)
    }

    #[must_use]
    pub fn num_bootstrap_nodes(&self) -> usize {
        self.bootstrap_chain.len()
    }

    #[must_use]
    pub fn has_bootstrap_nodes(&self) -> bool {
        !self.bootstrap_chain.is_empty()
    }

    #[must_use]
    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    #[must_use]
    pub fn image(&self) -> &str {
        &self.params.image
    }

    /// Image a node runs: its own override or the network image.
    #[must_use]
    pub fn image_for<'a>(&'a self, node: &'a NodeConfig) -> &'a str {
        node.image().unwrap_or(&self.params.image)
    }

    #[must_use]
    pub const fn tx_fee(&self) -> u64 {
        self.params.tx_fee
    }

    #[must_use]
    pub const fn snow_sample_size(&self) -> u32 {
        self.params.snow_sample_size
    }

    #[must_use]
    pub const fn snow_quorum_size(&self) -> u32 {
        self.params.snow_quorum_size
    }
}
