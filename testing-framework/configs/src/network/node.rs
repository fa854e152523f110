use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BOOTSTRAP_ATTEMPTS, node_log_level};

/// TLS pair pinning a node to a well-known network identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingCredentials {
    /// Identity the network derives from `tls_cert`.
    pub node_id: String,
    pub tls_cert: String,
    pub tls_key: String,
}

impl fmt::Debug for StakingCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StakingCredentials")
            .field("node_id", &self.node_id)
            .field("tls_cert_len", &self.tls_cert.len())
            .finish_non_exhaustive()
    }
}

impl StakingCredentials {
    /// Both halves of the pair are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.tls_cert.is_empty() && !self.tls_key.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    /// Member of the bootstrap chain. `ordinal` is the 1-based chain position,
    /// 0 appends at the end.
    Bootstrap { ordinal: usize },
    #[default]
    Regular,
}

/// Parameters a [`NodeConfig`] is built from.
#[derive(Clone, Debug)]
pub struct NodeParams {
    pub id: String,
    /// Falls back to the network image when unset.
    pub image: Option<String>,
    pub staking: bool,
    pub credentials: Option<StakingCredentials>,
    pub role: NodeRole,
    pub bootstrap_attempts: u32,
    pub log_level: String,
}

impl NodeParams {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image: None,
            staking: false,
            credentials: None,
            role: NodeRole::Regular,
            bootstrap_attempts: DEFAULT_BOOTSTRAP_ATTEMPTS,
            log_level: node_log_level(),
        }
    }
}

/// Description of one node. Immutable once added to a
/// [`NetworkDefinition`](super::NetworkDefinition), which stamps it with the
/// bootstrap chain as it stood at insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfig {
    id: String,
    image: Option<String>,
    staking: bool,
    credentials: Option<StakingCredentials>,
    role: NodeRole,
    bootstrap_attempts: u32,
    log_level: String,
    depends_on: Vec<BootstrapPeer>,
}

/// Entry of the bootstrap chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapPeer {
    /// Node id inside the definition.
    pub node: String,
    /// Identity other nodes connect to.
    pub identity: String,
}

impl NodeConfig {
    #[must_use]
    pub fn new(params: NodeParams) -> Self {
        Self {
            id: params.id,
            image: params.image,
            staking: params.staking,
            credentials: params.credentials,
            role: params.role,
            bootstrap_attempts: params.bootstrap_attempts,
            log_level: params.log_level,
            depends_on: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    #[must_use]
    pub const fn is_staking(&self) -> bool {
        self.staking
    }

    /// Credentials are only handed out when both cert and key are present.
    #[must_use]
    pub fn credentials(&self) -> Option<&StakingCredentials> {
        self.credentials
            .as_ref()
            .filter(|credentials| credentials.is_complete())
    }

    #[must_use]
    pub const fn role(&self) -> NodeRole {
        self.role
    }

    #[must_use]
    pub const fn is_bootstrap(&self) -> bool {
        matches!(self.role, NodeRole::Bootstrap { .. })
    }

    #[must_use]
    pub const fn bootstrap_attempts(&self) -> u32 {
        self.bootstrap_attempts
    }

    #[must_use]
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Identity other nodes use to reach this one.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.credentials()
            .map_or(self.id.as_str(), |credentials| credentials.node_id.as_str())
    }

    /// Bootstrap peers this node must connect to, in chain order.
    #[must_use]
    pub fn depends_on(&self) -> &[BootstrapPeer] {
        &self.depends_on
    }

    /// Comma-joined identities of [`Self::depends_on`].
    #[must_use]
    pub fn bootstrap_ids(&self) -> String {
        join_identities(&self.depends_on)
    }

    pub(crate) fn stamp(&mut self, chain: &[BootstrapPeer]) {
        self.depends_on = chain.to_vec();
    }

    pub(crate) fn as_peer(&self) -> BootstrapPeer {
        BootstrapPeer {
            node: self.id.clone(),
            identity: self.identity().to_owned(),
        }
    }
}

pub(crate) fn join_identities(peers: &[BootstrapPeer]) -> String {
    peers
        .iter()
        .map(|peer| peer.identity.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
