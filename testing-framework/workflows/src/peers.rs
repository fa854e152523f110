use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{error::WorkflowError, topology::RunningNode};

/// Every peer reported by a node in `nodes` must be one of `expected`.
pub async fn verify_connected_peers(
    nodes: &[&RunningNode],
    expected: &[&RunningNode],
) -> Result<(), WorkflowError> {
    for node in nodes {
        let peers = node
            .client()
            .info()
            .peers()
            .await
            .map_err(WorkflowError::api("info.peers"))?;

        for peer in &peers {
            let host = peer.host();
            if !expected.iter().any(|candidate| candidate.ip().to_string() == host) {
                let known: BTreeMap<String, String> = expected
                    .iter()
                    .map(|candidate| (candidate.node_id().to_owned(), candidate.ip().to_string()))
                    .collect();
                warn!(node = node.id(), peer = host, ?known, "unexpected peer");
                return Err(WorkflowError::PeerMismatch {
                    peer: host.to_owned(),
                    known,
                });
            }
        }
        debug!(node = node.id(), peers = peers.len(), "peers verified");
    }
    Ok(())
}
