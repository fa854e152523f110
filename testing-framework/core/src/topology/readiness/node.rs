use std::sync::Arc;

use testnet_config::chain::Lane;
use tracing::{debug, info};

use super::ReadinessCheck;
use crate::nodes::NodeApi;

/// Lanes in the order they are queried.
const QUERY_ORDER: [Lane; 3] = [Lane::P, Lane::C, Lane::X];

/// Per-lane bootstrap flags. Flags only ever go from `false` to `true`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadinessRecord {
    p_bootstrapped: bool,
    c_bootstrapped: bool,
    x_bootstrapped: bool,
}

impl ReadinessRecord {
    #[must_use]
    pub const fn lane(&self, lane: Lane) -> bool {
        match lane {
            Lane::P => self.p_bootstrapped,
            Lane::C => self.c_bootstrapped,
            Lane::X => self.x_bootstrapped,
        }
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.p_bootstrapped && self.c_bootstrapped && self.x_bootstrapped
    }

    fn mark(&mut self, lane: Lane) {
        match lane {
            Lane::P => self.p_bootstrapped = true,
            Lane::C => self.c_bootstrapped = true,
            Lane::X => self.x_bootstrapped = true,
        }
    }
}

/// Tracks whether a started node has bootstrapped all of its lanes.
pub struct NodeReadinessChecker {
    node: String,
    client: Arc<dyn NodeApi>,
    record: ReadinessRecord,
    last_error: Option<String>,
}

impl NodeReadinessChecker {
    #[must_use]
    pub fn new(node: impl Into<String>, client: Arc<dyn NodeApi>) -> Self {
        Self {
            node: node.into(),
            client,
            record: ReadinessRecord::default(),
            last_error: None,
        }
    }

    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    #[must_use]
    pub const fn record(&self) -> ReadinessRecord {
        self.record
    }

    /// Query every lane not yet marked bootstrapped. The round stops at the
    /// first lane that fails to answer or answers `false`.
    pub async fn poll_once(&mut self) -> bool {
        for lane in QUERY_ORDER {
            if self.record.lane(lane) {
                continue;
            }
            match self.client.info().is_bootstrapped(lane).await {
                Ok(true) => {
                    debug!(node = %self.node, %lane, "lane bootstrapped");
                    self.record.mark(lane);
                }
                Ok(false) => {
                    debug!(node = %self.node, %lane, "lane still bootstrapping");
                    return false;
                }
                Err(err) => {
                    debug!(node = %self.node, %lane, error = %err, "bootstrap status query failed");
                    self.last_error = Some(err.to_string());
                    return false;
                }
            }
        }

        if self.record.is_ready() {
            info!(node = %self.node, "node bootstrapped on every lane");
        }
        true
    }
}

#[async_trait::async_trait]
impl ReadinessCheck for NodeReadinessChecker {
    async fn poll(&mut self) -> bool {
        self.poll_once().await
    }

    fn timeout_message(&self) -> String {
        let pending: Vec<_> = QUERY_ORDER
            .iter()
            .filter(|lane| !self.record.lane(**lane))
            .map(|lane| lane.alias())
            .collect();
        match &self.last_error {
            Some(err) => format!(
                "node `{}` never bootstrapped lanes [{}]; last error: {err}",
                self.node,
                pending.join(",")
            ),
            None => format!(
                "node `{}` never bootstrapped lanes [{}]",
                self.node,
                pending.join(",")
            ),
        }
    }
}
