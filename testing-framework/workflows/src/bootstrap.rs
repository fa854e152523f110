use testnet_config::network::{NetworkDefinition, NodeConfig, NodeParams};
use testnet_core::topology::{TopologyOrchestrator, TrackedNode};
use tracing::{info, warn};

use crate::error::WorkflowError;

#[must_use]
pub fn added_node_id(index: usize) -> String {
    format!("new-node-{index}")
}

/// Add `count` staking nodes to a running network one at a time, waiting
/// for each to bootstrap before adding the next. A node that fails is removed
/// from `definition` and the orchestrator again, so the call can be retried.
pub async fn bootstrap_added_nodes(
    orchestrator: &TopologyOrchestrator,
    definition: &mut NetworkDefinition,
    image: Option<&str>,
    count: usize,
) -> Result<Vec<TrackedNode>, WorkflowError> {
    info!(count, "adding nodes and waiting for them to bootstrap");
    let mut added = Vec::with_capacity(count);

    for index in 1..=count {
        let config = definition
            .add_node(NodeConfig::new(NodeParams {
                image: image.map(str::to_owned),
                staking: true,
                ..NodeParams::new(added_node_id(index))
            }))?
            .clone();
        let tracked = match orchestrator.create_node(definition, &config).await {
            Ok(tracked) => tracked,
            Err(err) => {
                warn!(node = config.id(), error = %err, "added node failed; rolling it back");
                definition.remove_node(config.id());
                if orchestrator.contains(config.id()) {
                    if let Err(stop_err) = orchestrator.remove_node(config.id()).await {
                        warn!(node = config.id(), error = %stop_err, "failed to stop added node");
                    }
                }
                return Err(err.into());
            }
        };
        info!(node = %tracked.id, ip = %tracked.ip, "added node finished bootstrapping");
        added.push(tracked);
    }
    Ok(added)
}
