use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use testnet_config::chain::Lane;

use super::{
    ApiClientError,
    api::{
        CChainApi, InfoApi, KeystoreApi, NodeApi, PChainApi, PTxStatusReply, Peer, SendOutput,
        StakeRequest, TxId, UserPass, Validator, XChainApi, XTxStatus,
    },
};

type Answer = Result<bool, &'static str>;

/// Node answering bootstrap queries from a per-lane script. Every other API
/// is unsupported.
pub struct ScriptedNode {
    script: Mutex<HashMap<Lane, VecDeque<Answer>>>,
    fallback: bool,
    queries: AtomicUsize,
}

impl ScriptedNode {
    pub fn always_bootstrapped() -> Self {
        Self::scripted(std::iter::empty(), true)
    }

    pub fn never_bootstrapped() -> Self {
        Self::scripted(std::iter::empty(), false)
    }

    /// Answers are consumed per lane; exhausted lanes answer `false`.
    pub fn with_bootstrap_script(script: impl IntoIterator<Item = (Lane, Answer)>) -> Self {
        Self::scripted(script, false)
    }

    fn scripted(script: impl IntoIterator<Item = (Lane, Answer)>, fallback: bool) -> Self {
        let mut lanes: HashMap<Lane, VecDeque<Answer>> = HashMap::new();
        for (lane, answer) in script {
            lanes.entry(lane).or_default().push_back(answer);
        }
        Self {
            script: Mutex::new(lanes),
            fallback,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn bootstrap_queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

fn unsupported<T>(method: &'static str) -> Result<T, ApiClientError> {
    Err(ApiClientError::Unsupported { method })
}

#[async_trait::async_trait]
impl InfoApi for ScriptedNode {
    async fn node_id(&self) -> Result<String, ApiClientError> {
        Ok("NodeID-scripted".to_owned())
    }

    async fn is_bootstrapped(&self, lane: Lane) -> Result<bool, ApiClientError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let answer = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get_mut(&lane)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(self.fallback));
        answer.map_err(|message| ApiClientError::Rpc {
            method: "info.isBootstrapped".to_owned(),
            code: -32000,
            message: message.to_owned(),
        })
    }

    async fn peers(&self) -> Result<Vec<Peer>, ApiClientError> {
        Ok(Vec::new())
    }
}

#[async_trait::async_trait]
impl KeystoreApi for ScriptedNode {
    async fn create_user(&self, _user: &UserPass) -> Result<(), ApiClientError> {
        unsupported("keystore.createUser")
    }
}

#[async_trait::async_trait]
impl XChainApi for ScriptedNode {
    async fn create_address(&self, _user: &UserPass) -> Result<String, ApiClientError> {
        unsupported("avm.createAddress")
    }

    async fn import_key(&self, _user: &UserPass, _key: &str) -> Result<String, ApiClientError> {
        unsupported("avm.importKey")
    }

    async fn send(
        &self,
        _user: &UserPass,
        _amount: u64,
        _asset: &str,
        _to: &str,
    ) -> Result<TxId, ApiClientError> {
        unsupported("avm.send")
    }

    async fn send_multiple(
        &self,
        _user: &UserPass,
        _outputs: &[SendOutput],
    ) -> Result<TxId, ApiClientError> {
        unsupported("avm.sendMultiple")
    }

    async fn export(
        &self,
        _user: &UserPass,
        _amount: u64,
        _to: &str,
    ) -> Result<TxId, ApiClientError> {
        unsupported("avm.exportAVAX")
    }

    async fn import(
        &self,
        _user: &UserPass,
        _to: &str,
        _source: &str,
    ) -> Result<TxId, ApiClientError> {
        unsupported("avm.importAVAX")
    }

    async fn tx_status(&self, _tx: &TxId) -> Result<XTxStatus, ApiClientError> {
        unsupported("avm.getTxStatus")
    }

    async fn balance(&self, _address: &str, _asset: &str) -> Result<u64, ApiClientError> {
        unsupported("avm.getBalance")
    }
}

#[async_trait::async_trait]
impl PChainApi for ScriptedNode {
    async fn create_address(&self, _user: &UserPass) -> Result<String, ApiClientError> {
        unsupported("platform.createAddress")
    }

    async fn import(
        &self,
        _user: &UserPass,
        _to: &str,
        _source: &str,
    ) -> Result<TxId, ApiClientError> {
        unsupported("platform.importAVAX")
    }

    async fn export(
        &self,
        _user: &UserPass,
        _to: &str,
        _amount: u64,
    ) -> Result<TxId, ApiClientError> {
        unsupported("platform.exportAVAX")
    }

    async fn add_validator(
        &self,
        _user: &UserPass,
        _request: &StakeRequest,
        _rate: f32,
    ) -> Result<TxId, ApiClientError> {
        unsupported("platform.addValidator")
    }

    async fn add_delegator(
        &self,
        _user: &UserPass,
        _request: &StakeRequest,
    ) -> Result<TxId, ApiClientError> {
        unsupported("platform.addDelegator")
    }

    async fn tx_status(&self, _tx: &TxId) -> Result<PTxStatusReply, ApiClientError> {
        unsupported("platform.getTxStatus")
    }

    async fn balance(&self, _address: &str) -> Result<u64, ApiClientError> {
        unsupported("platform.getBalance")
    }

    async fn current_validators(&self) -> Result<Vec<Validator>, ApiClientError> {
        unsupported("platform.getCurrentValidators")
    }
}

#[async_trait::async_trait]
impl CChainApi for ScriptedNode {
    async fn import_key(&self, _user: &UserPass, _key: &str) -> Result<String, ApiClientError> {
        unsupported("avax.importKey")
    }

    async fn import(
        &self,
        _user: &UserPass,
        _to: &str,
        _source: &str,
    ) -> Result<TxId, ApiClientError> {
        unsupported("avax.import")
    }

    async fn balance(&self, _address: &str) -> Result<u128, ApiClientError> {
        unsupported("eth_getBalance")
    }
}

impl NodeApi for ScriptedNode {
    fn info(&self) -> &dyn InfoApi {
        self
    }

    fn keystore(&self) -> &dyn KeystoreApi {
        self
    }

    fn x_chain(&self) -> &dyn XChainApi {
        self
    }

    fn p_chain(&self) -> &dyn PChainApi {
        self
    }

    fn c_chain(&self) -> &dyn CChainApi {
        self
    }
}
