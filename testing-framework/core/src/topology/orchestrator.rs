use std::{
    collections::HashMap,
    net::IpAddr,
    sync::{Arc, RwLock},
    time::Duration,
};

use futures::future::join_all;
use testnet_config::{
    adjust_timeout,
    network::{NetworkDefinition, NetworkDefinitionError, NodeConfig},
    timeouts,
};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use super::{
    launch::{NodeLaunch, node_files},
    lifecycle::{DynError, ServiceLifecycle, ServiceSpec},
    readiness::{NodeReadinessChecker, PollBudget, ReadinessError, wait_ready},
};
use crate::nodes::{ApiClientError, HttpNodeClient, NodeApi};

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error(transparent)]
    Configuration(#[from] NetworkDefinitionError),
    #[error("node `{id}` is not tracked")]
    NotFound { id: String },
    #[error("failed to {action} node `{id}`")]
    Lifecycle {
        id: String,
        action: &'static str,
        #[source]
        source: DynError,
    },
    #[error("failed to bind a client to node `{id}`")]
    Client {
        id: String,
        #[source]
        source: ApiClientError,
    },
    #[error("node `{id}` failed to start")]
    Readiness {
        id: String,
        #[source]
        source: ReadinessError,
    },
    #[error("readiness task for node `{id}` did not complete")]
    ReadinessTask {
        id: String,
        #[source]
        source: JoinError,
    },
}

/// Binds an RPC client to a freshly started node.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, ip: IpAddr) -> Result<Arc<dyn NodeApi>, ApiClientError>;
}

/// JSON-RPC over HTTP on the default port.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn connect(&self, ip: IpAddr) -> Result<Arc<dyn NodeApi>, ApiClientError> {
        Ok(Arc::new(HttpNodeClient::for_ip(ip)?))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub startup: PollBudget,
    pub bootstrap_wave: PollBudget,
    pub termination_grace: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            startup: PollBudget::startup(),
            bootstrap_wave: PollBudget::bootstrap_wave(),
            termination_grace: adjust_timeout(timeouts::termination_grace()),
        }
    }
}

/// Running node as tracked by the orchestrator.
#[derive(Clone)]
pub struct TrackedNode {
    pub id: String,
    pub ip: IpAddr,
    pub client: Arc<dyn NodeApi>,
}

impl std::fmt::Debug for TrackedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedNode")
            .field("id", &self.id)
            .field("ip", &self.ip)
            .finish_non_exhaustive()
    }
}

/// Starts the nodes of a [`NetworkDefinition`] and keeps track of them.
pub struct TopologyOrchestrator {
    lifecycle: Arc<dyn ServiceLifecycle>,
    clients: Arc<dyn ClientFactory>,
    settings: OrchestratorSettings,
    nodes: RwLock<HashMap<String, TrackedNode>>,
}

impl TopologyOrchestrator {
    #[must_use]
    pub fn new(lifecycle: Arc<dyn ServiceLifecycle>, clients: Arc<dyn ClientFactory>) -> Self {
        Self::with_settings(lifecycle, clients, OrchestratorSettings::default())
    }

    #[must_use]
    pub fn with_settings(
        lifecycle: Arc<dyn ServiceLifecycle>,
        clients: Arc<dyn ClientFactory>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            lifecycle,
            clients,
            settings,
            nodes: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Start every node of `definition`.
    ///
    /// Bootstrap nodes are created one after the other in chain order and
    /// then awaited together, one task per node. Regular nodes follow, each
    /// awaited before the next is created.
    pub async fn start_network(&self, definition: &NetworkDefinition) -> Result<(), TopologyError> {
        info!(
            bootstrap = definition.num_bootstrap_nodes(),
            total = definition.len(),
            "starting network"
        );

        let mut pending = Vec::with_capacity(definition.num_bootstrap_nodes());
        for node in definition.bootstrap_nodes() {
            pending.push(self.create_node_no_check(definition, node).await?);
        }
        self.await_bootstrap_wave(pending).await?;
        info!(nodes = definition.num_bootstrap_nodes(), "bootstrap wave ready");

        for node in definition.regular_nodes() {
            self.create_node(definition, node).await?;
        }
        info!(nodes = definition.len(), "network ready");

        Ok(())
    }

    async fn await_bootstrap_wave(
        &self,
        pending: Vec<NodeReadinessChecker>,
    ) -> Result<(), TopologyError> {
        let budget = self.settings.bootstrap_wave;
        let tasks = pending.into_iter().map(|mut checker| {
            let id = checker.node().to_owned();
            let handle = tokio::spawn(async move { wait_ready(&mut checker, budget).await });
            async move { (id, handle.await) }
        });

        let mut first_error = None;
        for (id, joined) in join_all(tasks).await {
            let failure = match joined {
                Ok(Ok(())) => {
                    debug!(node = %id, "bootstrap node ready");
                    continue;
                }
                Ok(Err(source)) => TopologyError::Readiness { id, source },
                Err(source) => TopologyError::ReadinessTask { id, source },
            };
            warn!(error = %failure, "bootstrap node failed to start");
            first_error.get_or_insert(failure);
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Start `node` and wait until every lane has bootstrapped.
    pub async fn create_node(
        &self,
        definition: &NetworkDefinition,
        node: &NodeConfig,
    ) -> Result<TrackedNode, TopologyError> {
        let mut readiness = self.create_node_no_check(definition, node).await?;
        wait_ready(&mut readiness, self.settings.startup)
            .await
            .map_err(|source| TopologyError::Readiness {
                id: node.id().to_owned(),
                source,
            })?;
        self.tracked(node.id())
    }

    /// Start `node` without waiting, returning its readiness handle.
    pub async fn create_node_no_check(
        &self,
        definition: &NetworkDefinition,
        node: &NodeConfig,
    ) -> Result<NodeReadinessChecker, TopologyError> {
        let id = node.id();
        if self.contains(id) {
            return Err(NetworkDefinitionError::DuplicateNode { id: id.to_owned() }.into());
        }

        let bootstrap_ips = node
            .depends_on()
            .iter()
            .map(|peer| self.ip_address(&peer.node))
            .collect::<Result<Vec<_>, _>>()?;
        let spec = ServiceSpec {
            service_id: id.to_owned(),
            image: definition.image_for(node).to_owned(),
            files: node_files(node),
            command: Box::new(NodeLaunch::new(definition, node, bootstrap_ips)),
        };
        debug!(node = id, spec = ?spec, "starting node service");

        let started = self
            .lifecycle
            .start_service(spec)
            .await
            .map_err(|source| TopologyError::Lifecycle {
                id: id.to_owned(),
                action: "start",
                source,
            })?;
        let client = match self.clients.connect(started.ip) {
            Ok(client) => client,
            Err(source) => {
                warn!(
                    node = id,
                    ip = %started.ip,
                    error = %source,
                    "client setup failed; stopping service"
                );
                if let Err(err) = self
                    .lifecycle
                    .stop_service(id, self.settings.termination_grace)
                    .await
                {
                    warn!(node = id, error = %err, "failed to stop service");
                }
                return Err(TopologyError::Client {
                    id: id.to_owned(),
                    source,
                });
            }
        };

        let tracked = TrackedNode {
            id: id.to_owned(),
            ip: started.ip,
            client: Arc::clone(&client),
        };
        self.nodes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.to_owned(), tracked);
        info!(node = id, ip = %started.ip, "node started");

        Ok(NodeReadinessChecker::new(id, client))
    }

    pub fn client(&self, id: &str) -> Result<Arc<dyn NodeApi>, TopologyError> {
        self.tracked(id).map(|node| node.client)
    }

    pub fn ip_address(&self, id: &str) -> Result<IpAddr, TopologyError> {
        self.tracked(id).map(|node| node.ip)
    }

    pub fn tracked(&self, id: &str) -> Result<TrackedNode, TopologyError> {
        self.nodes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| TopologyError::NotFound { id: id.to_owned() })
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(id)
    }

    /// Ids of every tracked node, sorted.
    #[must_use]
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self
            .nodes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Stop tracking `id` and tear its service down within the grace period.
    pub async fn remove_node(&self, id: &str) -> Result<(), TopologyError> {
        let removed = self
            .nodes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);
        if removed.is_none() {
            return Err(TopologyError::NotFound { id: id.to_owned() });
        }

        info!(node = id, grace = ?self.settings.termination_grace, "removing node");
        self.lifecycle
            .stop_service(id, self.settings.termination_grace)
            .await
            .map_err(|source| TopologyError::Lifecycle {
                id: id.to_owned(),
                action: "stop",
                source,
            })
    }
}
