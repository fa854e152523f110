use std::{collections::BTreeMap, time::Duration};

use testnet_config::chain::Lane;
use testnet_core::{
    nodes::{ApiClientError, TxId},
    topology::TopologyError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcceptanceError {
    #[error("tx {tx} on lane {lane} not accepted after {elapsed:?}")]
    Timeout {
        tx: TxId,
        lane: Lane,
        elapsed: Duration,
        #[source]
        last_error: Option<ApiClientError>,
    },
    #[error("tx {tx} on lane {lane} was abandoned: {reason}")]
    Abandoned { tx: TxId, lane: Lane, reason: String },
    #[error("lane {lane} exposes no transaction status")]
    Unsupported { lane: Lane },
}

impl AcceptanceError {
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("balance of {address} on lane {lane} is {actual}, expected {expected}")]
    Mismatch {
        lane: Lane,
        address: String,
        expected: u128,
        actual: u128,
    },
    #[error("failed to query balance of {address} on lane {lane}")]
    Query {
        lane: Lane,
        address: String,
        #[source]
        source: ApiClientError,
    },
    #[error("balance check of {address} did not complete")]
    Task {
        address: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{step} failed")]
    Api {
        step: &'static str,
        #[source]
        source: ApiClientError,
    },
    #[error(transparent)]
    Acceptance(#[from] AcceptanceError),
    #[error(transparent)]
    Balance(#[from] BalanceError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Configuration(#[from] testnet_config::network::NetworkDefinitionError),
    #[error("node {node_id} not found among current validators {validators:?}")]
    ValidatorMissing {
        node_id: String,
        validators: Vec<String>,
    },
    #[error("peer address {peer} not found in the peer list: {known:?}")]
    PeerMismatch {
        peer: String,
        known: BTreeMap<String, String>,
    },
    #[error("amounts do not cover fees: {reason}")]
    InvalidAmounts { reason: String },
    #[error("node `{id}` is not part of the topology")]
    UnknownNode { id: String },
    #[error("topology has no genesis")]
    MissingGenesis,
}

impl WorkflowError {
    pub(crate) fn api(step: &'static str) -> impl FnOnce(ApiClientError) -> Self {
        move |source| {
            tracing::warn!(step, error = %source, "workflow step failed");
            Self::Api { step, source }
        }
    }
}
