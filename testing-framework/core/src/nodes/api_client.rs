use std::{
    net::IpAddr,
    sync::atomic::{AtomicU64, Ordering},
};

use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use serde_with::{DisplayFromStr, serde_as};
use testnet_config::{
    chain::Lane,
    constants::{DEFAULT_HTTP_PORT, DEFAULT_REQUEST_TIMEOUT},
};
use tracing::{debug, error};

use super::{
    api::{
        CChainApi, InfoApi, KeystoreApi, NodeApi, PChainApi, PTxStatusReply, Peer, SendOutput,
        StakeRequest, TxId, UserPass, Validator, XChainApi, XTxStatus,
    },
    streaming::{ConcurrentEthClient, EthRpcTransport},
};

const INFO_PATH: &str = "/ext/info";
const KEYSTORE_PATH: &str = "/ext/keystore";
const X_CHAIN_PATH: &str = "/ext/bc/X";
const P_CHAIN_PATH: &str = "/ext/P";
const C_CHAIN_AVAX_PATH: &str = "/ext/bc/C/avax";
const C_CHAIN_RPC_PATH: &str = "/ext/bc/C/rpc";

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("{method} failed with rpc error {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    #[error("{method} returned neither a result nor an error")]
    EmptyReply { method: String },
    #[error("malformed {field} in reply to {method}: {value}")]
    Malformed {
        method: String,
        field: &'static str,
        value: String,
    },
    #[error("{method} is not available on this client")]
    Unsupported { method: &'static str },
}

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcReply<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// One JSON-RPC endpoint of a node.
#[derive(Debug)]
pub struct RpcEndpoint {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcEndpoint {
    #[must_use]
    pub fn new(client: Client, base_url: &str, path: &str) -> Self {
        Self {
            client,
            url: Self::join_url(base_url, path),
            next_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one JSON-RPC call and decode its result.
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R, ApiClientError>
    where
        P: Serialize + Send + Sync,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(url = %self.url, method, "rpc call");
        let reply: RpcReply<R> = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match (reply.result, reply.error) {
            (_, Some(err)) => {
                error!(
                    url = %self.url,
                    method,
                    code = err.code,
                    message = %err.message,
                    "rpc call failed"
                );
                Err(ApiClientError::Rpc {
                    method: method.to_owned(),
                    code: err.code,
                    message: err.message,
                })
            }
            (Some(result), None) => Ok(result),
            (None, None) => Err(ApiClientError::EmptyReply {
                method: method.to_owned(),
            }),
        }
    }

    fn join_url(base: &str, path: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[derive(Serialize)]
struct WithUser<'a, T: Serialize> {
    #[serde(flatten)]
    user: &'a UserPass,
    #[serde(flatten)]
    params: T,
}

fn with_user<T: Serialize>(user: &UserPass, params: T) -> WithUser<'_, T> {
    WithUser { user, params }
}

#[derive(Deserialize)]
struct NodeIdReply {
    #[serde(rename = "nodeID")]
    node_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IsBootstrappedReply {
    is_bootstrapped: bool,
}

#[derive(Deserialize)]
struct PeersReply {
    #[serde(default)]
    peers: Option<Vec<Peer>>,
}

#[derive(Deserialize)]
struct AddressReply {
    address: String,
}

#[derive(Deserialize)]
struct TxIdReply {
    #[serde(rename = "txID")]
    tx_id: TxId,
}

#[derive(Deserialize)]
struct XStatusReply {
    status: XTxStatus,
}

#[serde_as]
#[derive(Deserialize)]
struct BalanceReply {
    #[serde_as(as = "DisplayFromStr")]
    balance: u64,
}

#[derive(Deserialize)]
struct ValidatorsReply {
    validators: Vec<Validator>,
}

#[derive(Deserialize)]
struct SuccessReply {
    success: bool,
}

pub struct InfoClient(RpcEndpoint);

#[async_trait::async_trait]
impl InfoApi for InfoClient {
    async fn node_id(&self) -> Result<String, ApiClientError> {
        let reply: NodeIdReply = self.0.call("info.getNodeID", json!({})).await?;
        Ok(reply.node_id)
    }

    async fn is_bootstrapped(&self, lane: Lane) -> Result<bool, ApiClientError> {
        let reply: IsBootstrappedReply = self
            .0
            .call("info.isBootstrapped", json!({ "chain": lane.alias() }))
            .await?;
        Ok(reply.is_bootstrapped)
    }

    async fn peers(&self) -> Result<Vec<Peer>, ApiClientError> {
        let reply: PeersReply = self.0.call("info.peers", json!({})).await?;
        Ok(reply.peers.unwrap_or_default())
    }
}

pub struct KeystoreClient(RpcEndpoint);

#[async_trait::async_trait]
impl KeystoreApi for KeystoreClient {
    async fn create_user(&self, user: &UserPass) -> Result<(), ApiClientError> {
        const METHOD: &str = "keystore.createUser";
        let reply: SuccessReply = self.0.call(METHOD, user).await?;
        if reply.success {
            Ok(())
        } else {
            Err(ApiClientError::Malformed {
                method: METHOD.to_owned(),
                field: "success",
                value: "false".to_owned(),
            })
        }
    }
}

pub struct XChainClient(RpcEndpoint);

#[async_trait::async_trait]
impl XChainApi for XChainClient {
    async fn create_address(&self, user: &UserPass) -> Result<String, ApiClientError> {
        let reply: AddressReply = self.0.call("avm.createAddress", user).await?;
        Ok(reply.address)
    }

    async fn import_key(
        &self,
        user: &UserPass,
        private_key: &str,
    ) -> Result<String, ApiClientError> {
        let reply: AddressReply = self
            .0
            .call(
                "avm.importKey",
                with_user(user, json!({ "privateKey": private_key })),
            )
            .await?;
        Ok(reply.address)
    }

    async fn send(
        &self,
        user: &UserPass,
        amount: u64,
        asset: &str,
        to: &str,
    ) -> Result<TxId, ApiClientError> {
        let reply: TxIdReply = self
            .0
            .call(
                "avm.send",
                with_user(
                    user,
                    json!({ "amount": amount.to_string(), "assetID": asset, "to": to, "memo": "" }),
                ),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn send_multiple(
        &self,
        user: &UserPass,
        outputs: &[SendOutput],
    ) -> Result<TxId, ApiClientError> {
        let reply: TxIdReply = self
            .0
            .call(
                "avm.sendMultiple",
                with_user(user, json!({ "outputs": outputs, "memo": "" })),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn export(&self, user: &UserPass, amount: u64, to: &str) -> Result<TxId, ApiClientError> {
        let reply: TxIdReply = self
            .0
            .call(
                "avm.exportAVAX",
                with_user(user, json!({ "amount": amount.to_string(), "to": to })),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn import(
        &self,
        user: &UserPass,
        to: &str,
        source_chain: &str,
    ) -> Result<TxId, ApiClientError> {
        let reply: TxIdReply = self
            .0
            .call(
                "avm.importAVAX",
                with_user(user, json!({ "to": to, "sourceChain": source_chain })),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn tx_status(&self, tx: &TxId) -> Result<XTxStatus, ApiClientError> {
        let reply: XStatusReply = self
            .0
            .call("avm.getTxStatus", json!({ "txID": tx }))
            .await?;
        Ok(reply.status)
    }

    async fn balance(&self, address: &str, asset: &str) -> Result<u64, ApiClientError> {
        let reply: BalanceReply = self
            .0
            .call(
                "avm.getBalance",
                json!({ "address": address, "assetID": asset }),
            )
            .await?;
        Ok(reply.balance)
    }
}

pub struct PChainClient(RpcEndpoint);

impl PChainClient {
    fn stake_params(request: &StakeRequest) -> Value {
        json!({
            "nodeID": request.node_id,
            "rewardAddress": request.reward_address,
            "stakeAmount": request.stake_amount.to_string(),
            "startTime": request.start_time.to_string(),
            "endTime": request.end_time.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl PChainApi for PChainClient {
    async fn create_address(&self, user: &UserPass) -> Result<String, ApiClientError> {
        let reply: AddressReply = self.0.call("platform.createAddress", user).await?;
        Ok(reply.address)
    }

    async fn import(
        &self,
        user: &UserPass,
        to: &str,
        source_chain: &str,
    ) -> Result<TxId, ApiClientError> {
        let reply: TxIdReply = self
            .0
            .call(
                "platform.importAVAX",
                with_user(user, json!({ "to": to, "sourceChain": source_chain })),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn export(&self, user: &UserPass, to: &str, amount: u64) -> Result<TxId, ApiClientError> {
        let reply: TxIdReply = self
            .0
            .call(
                "platform.exportAVAX",
                with_user(user, json!({ "to": to, "amount": amount.to_string() })),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn add_validator(
        &self,
        user: &UserPass,
        request: &StakeRequest,
        delegation_fee_rate: f32,
    ) -> Result<TxId, ApiClientError> {
        let mut params = Self::stake_params(request);
        params["delegationFeeRate"] = json!(delegation_fee_rate.to_string());
        let reply: TxIdReply = self
            .0
            .call("platform.addValidator", with_user(user, params))
            .await?;
        Ok(reply.tx_id)
    }

    async fn add_delegator(
        &self,
        user: &UserPass,
        request: &StakeRequest,
    ) -> Result<TxId, ApiClientError> {
        let reply: TxIdReply = self
            .0
            .call(
                "platform.addDelegator",
                with_user(user, Self::stake_params(request)),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn tx_status(&self, tx: &TxId) -> Result<PTxStatusReply, ApiClientError> {
        self.0
            .call(
                "platform.getTxStatus",
                json!({ "txID": tx, "includeReason": true }),
            )
            .await
    }

    async fn balance(&self, address: &str) -> Result<u64, ApiClientError> {
        let reply: BalanceReply = self
            .0
            .call("platform.getBalance", json!({ "address": address }))
            .await?;
        Ok(reply.balance)
    }

    async fn current_validators(&self) -> Result<Vec<Validator>, ApiClientError> {
        let reply: ValidatorsReply = self
            .0
            .call("platform.getCurrentValidators", json!({}))
            .await?;
        Ok(reply.validators)
    }
}

pub struct CChainClient {
    avax: RpcEndpoint,
    eth: ConcurrentEthClient<EthRpcTransport>,
}

impl CChainClient {
    /// Streaming client of the lane, shared by every caller of this node.
    #[must_use]
    pub const fn eth(&self) -> &ConcurrentEthClient<EthRpcTransport> {
        &self.eth
    }
}

#[async_trait::async_trait]
impl CChainApi for CChainClient {
    async fn import_key(
        &self,
        user: &UserPass,
        private_key: &str,
    ) -> Result<String, ApiClientError> {
        let reply: AddressReply = self
            .avax
            .call(
                "avax.importKey",
                with_user(user, json!({ "privateKey": private_key })),
            )
            .await?;
        Ok(reply.address)
    }

    async fn import(
        &self,
        user: &UserPass,
        to: &str,
        source_chain: &str,
    ) -> Result<TxId, ApiClientError> {
        let reply: TxIdReply = self
            .avax
            .call(
                "avax.import",
                with_user(user, json!({ "to": to, "sourceChain": source_chain })),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn balance(&self, address: &str) -> Result<u128, ApiClientError> {
        self.eth.balance_at(address).await
    }
}

/// JSON-RPC client for every API of one node.
pub struct HttpNodeClient {
    base_url: String,
    info: InfoClient,
    keystore: KeystoreClient,
    x_chain: XChainClient,
    p_chain: PChainClient,
    c_chain: CChainClient,
}

impl HttpNodeClient {
    /// Client for the node reachable at `ip` on the default HTTP port.
    pub fn for_ip(ip: IpAddr) -> Result<Self, ApiClientError> {
        Self::new(&format!("http://{ip}:{DEFAULT_HTTP_PORT}"))
    }

    pub fn new(base_url: &str) -> Result<Self, ApiClientError> {
        let client = Client::builder().timeout(DEFAULT_REQUEST_TIMEOUT).build()?;
        let endpoint = |path| RpcEndpoint::new(client.clone(), base_url, path);
        Ok(Self {
            base_url: base_url.to_owned(),
            info: InfoClient(endpoint(INFO_PATH)),
            keystore: KeystoreClient(endpoint(KEYSTORE_PATH)),
            x_chain: XChainClient(endpoint(X_CHAIN_PATH)),
            p_chain: PChainClient(endpoint(P_CHAIN_PATH)),
            c_chain: CChainClient {
                avax: endpoint(C_CHAIN_AVAX_PATH),
                eth: ConcurrentEthClient::new(EthRpcTransport::new(endpoint(C_CHAIN_RPC_PATH))),
            },
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn c_chain_client(&self) -> &CChainClient {
        &self.c_chain
    }
}

impl NodeApi for HttpNodeClient {
    fn info(&self) -> &dyn InfoApi {
        &self.info
    }

    fn keystore(&self) -> &dyn KeystoreApi {
        &self.keystore
    }

    fn x_chain(&self) -> &dyn XChainApi {
        &self.x_chain
    }

    fn p_chain(&self) -> &dyn PChainApi {
        &self.p_chain
    }

    fn c_chain(&self) -> &dyn CChainApi {
        &self.c_chain
    }
}
