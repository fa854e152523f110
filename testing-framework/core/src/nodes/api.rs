use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use testnet_config::chain::Lane;

use super::api_client::ApiClientError;

/// Identifier of a submitted ledger operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub String);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Keystore credential owning a node's addresses.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPass {
    pub username: String,
    pub password: String,
}

impl UserPass {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for UserPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPass")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// X lane transaction status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum XTxStatus {
    Accepted,
    Processing,
    Rejected,
    #[serde(other)]
    Unknown,
}

/// P lane transaction status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum PTxStatus {
    Committed,
    Processing,
    Dropped,
    Aborted,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PTxStatusReply {
    pub status: PTxStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

impl PTxStatusReply {
    #[must_use]
    pub const fn new(status: PTxStatus) -> Self {
        Self {
            status,
            reason: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Peer {
    /// `ip:port` the peer is reached at.
    pub ip: String,
    #[serde(rename = "nodeID")]
    pub node_id: String,
}

impl Peer {
    /// IP part of [`Self::ip`].
    #[must_use]
    pub fn host(&self) -> &str {
        self.ip
            .rsplit_once(':')
            .map_or(self.ip.as_str(), |(host, _)| host)
    }
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    #[serde(rename = "nodeID")]
    pub node_id: String,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub start_time: Option<u64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub end_time: Option<u64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub stake_amount: Option<u64>,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendOutput {
    #[serde(rename = "assetID")]
    pub asset_id: String,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u64,
    pub to: String,
}

/// Staking request shared by validators and delegators. Times are unix
/// seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct StakeRequest {
    pub node_id: String,
    pub reward_address: String,
    pub stake_amount: u64,
    pub start_time: u64,
    pub end_time: u64,
}

/// Node information and subsystem health.
#[async_trait::async_trait]
pub trait InfoApi: Send + Sync {
    async fn node_id(&self) -> Result<String, ApiClientError>;

    /// `Ok(false)` while the lane is still bootstrapping.
    async fn is_bootstrapped(&self, lane: Lane) -> Result<bool, ApiClientError>;

    async fn peers(&self) -> Result<Vec<Peer>, ApiClientError>;
}

#[async_trait::async_trait]
pub trait KeystoreApi: Send + Sync {
    async fn create_user(&self, user: &UserPass) -> Result<(), ApiClientError>;
}

#[async_trait::async_trait]
pub trait XChainApi: Send + Sync {
    async fn create_address(&self, user: &UserPass) -> Result<String, ApiClientError>;

    /// Import a private key into the keystore, returning its X address.
    async fn import_key(&self, user: &UserPass, private_key: &str)
    -> Result<String, ApiClientError>;

    async fn send(
        &self,
        user: &UserPass,
        amount: u64,
        asset: &str,
        to: &str,
    ) -> Result<TxId, ApiClientError>;

    async fn send_multiple(
        &self,
        user: &UserPass,
        outputs: &[SendOutput],
    ) -> Result<TxId, ApiClientError>;

    /// Export native asset to an address on another lane.
    async fn export(&self, user: &UserPass, amount: u64, to: &str)
    -> Result<TxId, ApiClientError>;

    /// Import funds exported to `to` from `source_chain`.
    async fn import(
        &self,
        user: &UserPass,
        to: &str,
        source_chain: &str,
    ) -> Result<TxId, ApiClientError>;

    async fn tx_status(&self, tx: &TxId) -> Result<XTxStatus, ApiClientError>;

    async fn balance(&self, address: &str, asset: &str) -> Result<u64, ApiClientError>;
}

#[async_trait::async_trait]
pub trait PChainApi: Send + Sync {
    async fn create_address(&self, user: &UserPass) -> Result<String, ApiClientError>;

    async fn import(
        &self,
        user: &UserPass,
        to: &str,
        source_chain: &str,
    ) -> Result<TxId, ApiClientError>;

    async fn export(&self, user: &UserPass, to: &str, amount: u64)
    -> Result<TxId, ApiClientError>;

    async fn add_validator(
        &self,
        user: &UserPass,
        request: &StakeRequest,
        delegation_fee_rate: f32,
    ) -> Result<TxId, ApiClientError>;

    async fn add_delegator(
        &self,
        user: &UserPass,
        request: &StakeRequest,
    ) -> Result<TxId, ApiClientError>;

    async fn tx_status(&self, tx: &TxId) -> Result<PTxStatusReply, ApiClientError>;

    async fn balance(&self, address: &str) -> Result<u64, ApiClientError>;

    async fn current_validators(&self) -> Result<Vec<Validator>, ApiClientError>;
}

#[async_trait::async_trait]
pub trait CChainApi: Send + Sync {
    async fn import_key(&self, user: &UserPass, private_key: &str)
    -> Result<String, ApiClientError>;

    async fn import(
        &self,
        user: &UserPass,
        to: &str,
        source_chain: &str,
    ) -> Result<TxId, ApiClientError>;

    /// Balance of a hex address in the lane's smallest unit.
    async fn balance(&self, address: &str) -> Result<u128, ApiClientError>;
}

/// Handle to every API of one node.
pub trait NodeApi: Send + Sync {
    fn info(&self) -> &dyn InfoApi;

    fn keystore(&self) -> &dyn KeystoreApi;

    fn x_chain(&self) -> &dyn XChainApi;

    fn p_chain(&self) -> &dyn PChainApi;

    fn c_chain(&self) -> &dyn CChainApi;
}
