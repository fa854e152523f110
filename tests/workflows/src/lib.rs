//! In-memory stand-ins for a running network: a single shared ledger that
//! serves every node's RPC API and a service lifecycle that only hands out
//! addresses.

use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use testnet_config::{
    chain::{Lane, address_on_lane},
    constants::TEST_VOLUME_MOUNTPOINT,
    genesis::GenesisConfig,
    network::{NetworkDefinition, NetworkParams},
    units::{DEFAULT_TX_FEE, UNIT},
};
use testnet_core::{
    nodes::{
        ApiClientError, CChainApi, InfoApi, KeystoreApi, NodeApi, PChainApi, PTxStatus,
        PTxStatusReply, Peer, SendOutput, StakeRequest, TxId, UserPass, Validator, XChainApi,
        XTxStatus,
    },
    topology::{
        ClientFactory, DynError, OrchestratorSettings, PollBudget, ServiceLifecycle, ServiceSpec,
        StartedService, TopologyError, TopologyOrchestrator,
    },
};
use testnet_workflows::{
    DELEGATOR_NODE, PollSettings, StakeAmounts, StakingScenario, Topology, VALIDATOR_NODE,
    WorkflowError, WorkflowSettings,
};

pub const FUNDED_BALANCE: u64 = 300_000_000 * UNIT;

#[derive(Clone, Debug)]
pub struct StartedNode {
    pub ip: IpAddr,
    pub image: String,
    pub command: Vec<String>,
}

#[derive(Default)]
struct State {
    fee: u64,
    funded_key: String,
    funded_address: String,
    services: BTreeMap<String, StartedNode>,
    start_order: Vec<String>,
    start_calls: usize,
    stopped: Vec<String>,
    never_ready: HashSet<String>,
    users: HashSet<String>,
    x_addresses: HashMap<String, Vec<String>>,
    p_addresses: HashMap<String, Vec<String>>,
    x: HashMap<String, u64>,
    p: HashMap<String, u64>,
    c: HashMap<String, u128>,
    atomic: HashMap<String, u64>,
    history: HashMap<String, Vec<u64>>,
    next_tx: u64,
    x_scripts: VecDeque<Vec<XTxStatus>>,
    p_scripts: VecDeque<Vec<PTxStatusReply>>,
    x_status: HashMap<TxId, VecDeque<XTxStatus>>,
    p_status: HashMap<TxId, VecDeque<PTxStatusReply>>,
    polls: HashMap<TxId, usize>,
    hide_validators: bool,
    validators: Vec<Validator>,
    delegations: Vec<StakeRequest>,
    peers: HashMap<IpAddr, Vec<Peer>>,
}

fn rpc_error(method: &str, message: impl Into<String>) -> ApiClientError {
    ApiClientError::Rpc {
        method: method.to_owned(),
        code: -32000,
        message: message.into(),
    }
}

impl State {
    fn first_address(
        book: &HashMap<String, Vec<String>>,
        user: &UserPass,
        method: &str,
    ) -> Result<String, ApiClientError> {
        book.get(&user.username)
            .and_then(|addresses| addresses.first().cloned())
            .ok_or_else(|| rpc_error(method, format!("user {} has no address", user.username)))
    }

    fn check_user(&self, user: &UserPass, method: &str) -> Result<(), ApiClientError> {
        if self.users.contains(&user.username) {
            Ok(())
        } else {
            Err(rpc_error(method, format!("unknown user {}", user.username)))
        }
    }

    fn new_address(
        &mut self,
        lane: Lane,
        user: &UserPass,
        method: &str,
    ) -> Result<String, ApiClientError> {
        self.check_user(user, method)?;
        let book = match lane {
            Lane::P => &mut self.p_addresses,
            Lane::X | Lane::C => &mut self.x_addresses,
        };
        let addresses = book.entry(user.username.clone()).or_default();
        let address = format!("{lane}-local1{}{}", user.username, addresses.len());
        addresses.push(address.clone());
        Ok(address)
    }

    fn adjust(
        &mut self,
        lane: Lane,
        address: &str,
        credit: u64,
        debit: u64,
        method: &str,
    ) -> Result<(), ApiClientError> {
        let balances = match lane {
            Lane::P => &mut self.p,
            Lane::X | Lane::C => &mut self.x,
        };
        let current = balances.get(address).copied().unwrap_or_default();
        let next = (current + credit)
            .checked_sub(debit)
            .ok_or_else(|| rpc_error(method, format!("insufficient funds on {address}")))?;
        balances.insert(address.to_owned(), next);
        self.history.entry(address.to_owned()).or_default().push(next);
        Ok(())
    }

    fn claim_atomic(&mut self, key: &str, method: &str) -> Result<u64, ApiClientError> {
        let pending = self.atomic.remove(key).unwrap_or_default();
        pending
            .checked_sub(self.fee)
            .filter(|amount| *amount > 0)
            .ok_or_else(|| rpc_error(method, format!("no funds to import for {key}")))
    }

    fn submit(&mut self, lane: Lane) -> TxId {
        self.next_tx += 1;
        let tx = TxId(format!("tx-{}", self.next_tx));
        match lane {
            Lane::P => {
                if let Some(script) = self.p_scripts.pop_front() {
                    self.p_status.insert(tx.clone(), script.into());
                }
            }
            Lane::X => {
                if let Some(script) = self.x_scripts.pop_front() {
                    self.x_status.insert(tx.clone(), script.into());
                }
            }
            Lane::C => {}
        }
        tx
    }
}

/// Shared fake ledger plus service registry.
///
/// Fees: an X send or export debits `amount + fee`; a P export debits
/// `amount + fee`; an import credits the exported amount minus one fee;
/// staking debits the stake with no fee.
#[derive(Clone)]
pub struct FakeNetwork {
    state: Arc<Mutex<State>>,
}

impl FakeNetwork {
    #[must_use]
    pub fn new(genesis: &GenesisConfig) -> Self {
        Self::with_fee(genesis, DEFAULT_TX_FEE)
    }

    #[must_use]
    pub fn with_fee(genesis: &GenesisConfig, fee: u64) -> Self {
        let mut state = State {
            fee,
            funded_key: genesis.funded.private_key.clone(),
            funded_address: genesis.funded.address.clone(),
            ..State::default()
        };
        state
            .x
            .insert(genesis.funded.address.clone(), FUNDED_BALANCE);
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake network state")
    }

    /// Orchestrator over this network with short readiness budgets.
    #[must_use]
    pub fn orchestrator(&self) -> Arc<TopologyOrchestrator> {
        let budget = PollBudget {
            interval: Duration::from_secs(1),
            max_attempts: 3,
        };
        Arc::new(TopologyOrchestrator::with_settings(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            OrchestratorSettings {
                startup: budget,
                bootstrap_wave: budget,
                termination_grace: Duration::from_secs(1),
            },
        ))
    }

    /// The service never reports any lane as bootstrapped.
    pub fn never_ready(&self, service_id: &str) {
        self.state().never_ready.insert(service_id.to_owned());
    }

    pub fn ready_again(&self, service_id: &str) {
        self.state().never_ready.remove(service_id);
    }

    /// Status sequence of the next X transaction submitted.
    pub fn script_next_x(&self, statuses: Vec<XTxStatus>) {
        self.state().x_scripts.push_back(statuses);
    }

    /// Status sequence of the next P transaction submitted.
    pub fn script_next_p(&self, statuses: Vec<PTxStatus>) {
        self.state()
            .p_scripts
            .push_back(statuses.into_iter().map(PTxStatusReply::new).collect());
    }

    /// Accept add-validator transactions without adding to the validator set.
    pub fn hide_validators(&self) {
        self.state().hide_validators = true;
    }

    pub fn set_peers(&self, ip: IpAddr, peers: Vec<Peer>) {
        self.state().peers.insert(ip, peers);
    }

    #[must_use]
    pub fn start_calls(&self) -> usize {
        self.state().start_calls
    }

    #[must_use]
    pub fn start_order(&self) -> Vec<String> {
        self.state().start_order.clone()
    }

    #[must_use]
    pub fn started(&self, service_id: &str) -> Option<StartedNode> {
        self.state().services.get(service_id).cloned()
    }

    #[must_use]
    pub fn stopped(&self) -> Vec<String> {
        self.state().stopped.clone()
    }

    #[must_use]
    pub fn x_balance(&self, address: &str) -> u64 {
        self.state().x.get(address).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn p_balance(&self, address: &str) -> u64 {
        self.state().p.get(address).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn c_balance(&self, address: &str) -> u128 {
        self.state().c.get(address).copied().unwrap_or_default()
    }

    /// Every balance `address` has had, in order.
    #[must_use]
    pub fn history(&self, address: &str) -> Vec<u64> {
        self.state().history.get(address).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn polls(&self, tx: &str) -> usize {
        self.state()
            .polls
            .get(&TxId::from(tx))
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn delegations(&self) -> Vec<StakeRequest> {
        self.state().delegations.clone()
    }

    #[must_use]
    pub fn funded_address(&self) -> String {
        self.state().funded_address.clone()
    }

    /// Credit `amount` directly to an X address.
    pub fn mint_x(&self, address: &str, amount: u64) {
        self.state()
            .adjust(Lane::X, address, amount, 0, "mint")
            .expect("credit never fails");
    }
}

#[async_trait]
impl ServiceLifecycle for FakeNetwork {
    async fn start_service(&self, spec: ServiceSpec) -> Result<StartedService, DynError> {
        let mut state = self.state();
        state.start_calls += 1;
        if state.services.contains_key(&spec.service_id) {
            return Err(format!("service {} already running", spec.service_id).into());
        }
        let host = u8::try_from(state.start_order.len() + 2)?;
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, host));
        let mounted: HashMap<String, PathBuf> = spec
            .files
            .keys()
            .map(|id| (id.clone(), Path::new(TEST_VOLUME_MOUNTPOINT).join(id)))
            .collect();
        let command = spec.command.render(ip, &mounted);
        state.start_order.push(spec.service_id.clone());
        state.services.insert(
            spec.service_id,
            StartedNode {
                ip,
                image: spec.image,
                command,
            },
        );
        Ok(StartedService { ip })
    }

    async fn stop_service(&self, service_id: &str, _grace: Duration) -> Result<(), DynError> {
        let mut state = self.state();
        state
            .services
            .remove(service_id)
            .ok_or_else(|| format!("service {service_id} not running"))?;
        state.stopped.push(service_id.to_owned());
        Ok(())
    }
}

impl ClientFactory for FakeNetwork {
    fn connect(&self, ip: IpAddr) -> Result<Arc<dyn NodeApi>, ApiClientError> {
        let service = self
            .state()
            .services
            .iter()
            .find(|(_, started)| started.ip == ip)
            .map(|(id, _)| id.clone())
            .ok_or(ApiClientError::Unsupported { method: "connect" })?;
        Ok(Arc::new(FakeNode {
            network: self.clone(),
            service,
            ip,
        }))
    }
}

/// RPC client of one fake node.
pub struct FakeNode {
    network: FakeNetwork,
    service: String,
    ip: IpAddr,
}

impl FakeNode {
    fn state(&self) -> MutexGuard<'_, State> {
        self.network.state()
    }
}

#[must_use]
pub fn fake_node_id(service_id: &str) -> String {
    format!("NodeID-{service_id}")
}

impl NodeApi for FakeNode {
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

#[async_trait]
impl InfoApi for FakeNode {
    async fn node_id(&self) -> Result<String, ApiClientError> {
        Ok(fake_node_id(&self.service))
    }

    async fn is_bootstrapped(&self, _lane: Lane) -> Result<bool, ApiClientError> {
        Ok(!self.state().never_ready.contains(&self.service))
    }

    async fn peers(&self) -> Result<Vec<Peer>, ApiClientError> {
        Ok(self.state().peers.get(&self.ip).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl KeystoreApi for FakeNode {
    async fn create_user(&self, user: &UserPass) -> Result<(), ApiClientError> {
        if self.state().users.insert(user.username.clone()) {
            Ok(())
        } else {
            Err(rpc_error("keystore.createUser", "user already exists"))
        }
    }
}

#[async_trait]
impl XChainApi for FakeNode {
    async fn create_address(&self, user: &UserPass) -> Result<String, ApiClientError> {
        self.state().new_address(Lane::X, user, "avm.createAddress")
    }

    async fn import_key(
        &self,
        user: &UserPass,
        private_key: &str,
    ) -> Result<String, ApiClientError> {
        let mut state = self.state();
        state.check_user(user, "avm.importKey")?;
        if private_key != state.funded_key {
            return Err(rpc_error("avm.importKey", "unknown key"));
        }
        let address = state.funded_address.clone();
        state
            .x_addresses
            .entry(user.username.clone())
            .or_default()
            .insert(0, address.clone());
        Ok(address)
    }

    async fn send(
        &self,
        user: &UserPass,
        amount: u64,
        _asset: &str,
        to: &str,
    ) -> Result<TxId, ApiClientError> {
        let mut state = self.state();
        let from = State::first_address(&state.x_addresses, user, "avm.send")?;
        let fee = state.fee;
        state.adjust(Lane::X, &from, 0, amount + fee, "avm.send")?;
        state.adjust(Lane::X, to, amount, 0, "avm.send")?;
        Ok(state.submit(Lane::X))
    }

    async fn send_multiple(
        &self,
        user: &UserPass,
        outputs: &[SendOutput],
    ) -> Result<TxId, ApiClientError> {
        let mut state = self.state();
        let from = State::first_address(&state.x_addresses, user, "avm.sendMultiple")?;
        let total: u64 = outputs.iter().map(|output| output.amount).sum();
        let fee = state.fee;
        state.adjust(Lane::X, &from, 0, total + fee, "avm.sendMultiple")?;
        for output in outputs {
            state.adjust(Lane::X, &output.to, output.amount, 0, "avm.sendMultiple")?;
        }
        Ok(state.submit(Lane::X))
    }

    async fn export(&self, user: &UserPass, amount: u64, to: &str) -> Result<TxId, ApiClientError> {
        let mut state = self.state();
        let from = State::first_address(&state.x_addresses, user, "avm.exportAVAX")?;
        let fee = state.fee;
        state.adjust(Lane::X, &from, 0, amount + fee, "avm.exportAVAX")?;
        *state.atomic.entry(to.to_owned()).or_default() += amount;
        Ok(state.submit(Lane::X))
    }

    async fn import(
        &self,
        user: &UserPass,
        to: &str,
        _source_chain: &str,
    ) -> Result<TxId, ApiClientError> {
        let mut state = self.state();
        state.check_user(user, "avm.importAVAX")?;
        let amount = state.claim_atomic(to, "avm.importAVAX")?;
        state.adjust(Lane::X, to, amount, 0, "avm.importAVAX")?;
        Ok(state.submit(Lane::X))
    }

    async fn tx_status(&self, tx: &TxId) -> Result<XTxStatus, ApiClientError> {
        let mut state = self.state();
        *state.polls.entry(tx.clone()).or_default() += 1;
        let status = state
            .x_status
            .get_mut(tx)
            .and_then(VecDeque::pop_front)
            .unwrap_or(XTxStatus::Accepted);
        Ok(status)
    }

    async fn balance(&self, address: &str, _asset: &str) -> Result<u64, ApiClientError> {
        Ok(self.state().x.get(address).copied().unwrap_or_default())
    }
}

#[async_trait]
impl PChainApi for FakeNode {
    async fn create_address(&self, user: &UserPass) -> Result<String, ApiClientError> {
        self.state().new_address(Lane::P, user, "platform.createAddress")
    }

    async fn import(
        &self,
        user: &UserPass,
        to: &str,
        _source_chain: &str,
    ) -> Result<TxId, ApiClientError> {
        let mut state = self.state();
        state.check_user(user, "platform.importAVAX")?;
        let amount = state.claim_atomic(to, "platform.importAVAX")?;
        state.adjust(Lane::P, to, amount, 0, "platform.importAVAX")?;
        Ok(state.submit(Lane::P))
    }

    async fn export(&self, user: &UserPass, to: &str, amount: u64) -> Result<TxId, ApiClientError> {
        let mut state = self.state();
        let from = State::first_address(&state.p_addresses, user, "platform.exportAVAX")?;
        let fee = state.fee;
        state.adjust(Lane::P, &from, 0, amount + fee, "platform.exportAVAX")?;
        *state.atomic.entry(to.to_owned()).or_default() += amount;
        Ok(state.submit(Lane::P))
    }

    async fn add_validator(
        &self,
        user: &UserPass,
        request: &StakeRequest,
        _delegation_fee_rate: f32,
    ) -> Result<TxId, ApiClientError> {
        let mut state = self.state();
        let from = State::first_address(&state.p_addresses, user, "platform.addValidator")?;
        state.adjust(Lane::P, &from, 0, request.stake_amount, "platform.addValidator")?;
        if !state.hide_validators {
            state.validators.push(Validator {
                node_id: request.node_id.clone(),
                start_time: Some(request.start_time),
                end_time: Some(request.end_time),
                stake_amount: Some(request.stake_amount),
            });
        }
        Ok(state.submit(Lane::P))
    }

    async fn add_delegator(
        &self,
        user: &UserPass,
        request: &StakeRequest,
    ) -> Result<TxId, ApiClientError> {
        let mut state = self.state();
        let from = State::first_address(&state.p_addresses, user, "platform.addDelegator")?;
        state.adjust(Lane::P, &from, 0, request.stake_amount, "platform.addDelegator")?;
        state.delegations.push(request.clone());
        Ok(state.submit(Lane::P))
    }

    async fn tx_status(&self, tx: &TxId) -> Result<PTxStatusReply, ApiClientError> {
        let mut state = self.state();
        *state.polls.entry(tx.clone()).or_default() += 1;
        let reply = state
            .p_status
            .get_mut(tx)
            .and_then(VecDeque::pop_front)
            .unwrap_or(PTxStatusReply::new(PTxStatus::Committed));
        Ok(reply)
    }

    async fn balance(&self, address: &str) -> Result<u64, ApiClientError> {
        Ok(self.state().p.get(address).copied().unwrap_or_default())
    }

    async fn current_validators(&self) -> Result<Vec<Validator>, ApiClientError> {
        Ok(self.state().validators.clone())
    }
}

#[async_trait]
impl CChainApi for FakeNode {
    async fn import_key(
        &self,
        user: &UserPass,
        private_key: &str,
    ) -> Result<String, ApiClientError> {
        let state = self.state();
        state.check_user(user, "avax.importKey")?;
        if private_key != state.funded_key {
            return Err(rpc_error("avax.importKey", "unknown key"));
        }
        Ok(address_on_lane(&state.funded_address, Lane::C))
    }

    async fn import(
        &self,
        user: &UserPass,
        to: &str,
        _source_chain: &str,
    ) -> Result<TxId, ApiClientError> {
        let mut state = self.state();
        let x_address = State::first_address(&state.x_addresses, user, "avax.import")?;
        let amount = state.claim_atomic(&address_on_lane(&x_address, Lane::C), "avax.import")?;
        *state.c.entry(to.to_owned()).or_default() += u128::from(amount);
        Ok(state.submit(Lane::C))
    }

    async fn balance(&self, address: &str) -> Result<u128, ApiClientError> {
        Ok(self.state().c.get(address).copied().unwrap_or_default())
    }
}

pub const TEST_IMAGE: &str = "ledger/node:test";

/// The staking network (five bootstrap stakers, a validator and a delegator
/// node) on top of a [`FakeNetwork`].
pub struct Harness {
    pub genesis: GenesisConfig,
    pub network: FakeNetwork,
    pub orchestrator: Arc<TopologyOrchestrator>,
    pub definition: NetworkDefinition,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        let genesis = GenesisConfig::local();
        let network = FakeNetwork::new(&genesis);
        let definition = StakingScenario::default()
            .definition(
                NetworkParams {
                    image: TEST_IMAGE.to_owned(),
                    ..NetworkParams::default()
                },
                &genesis,
            )
            .expect("staking network definition");
        Self {
            orchestrator: network.orchestrator(),
            genesis,
            network,
            definition,
        }
    }

    pub async fn start(&self) -> Result<(), TopologyError> {
        self.orchestrator.start_network(&self.definition).await
    }

    /// Start the network, register the validator and delegator nodes, make
    /// the validator node the genesis funder and send `amounts.total` to
    /// both X addresses.
    pub async fn funded_topology(&self, amounts: &StakeAmounts) -> Result<Topology, WorkflowError> {
        self.start().await?;
        let mut topology = Topology::new(Arc::clone(&self.orchestrator), settings());
        topology
            .add_node(VALIDATOR_NODE, UserPass::new("staker", "test34test!23"))
            .await?;
        topology
            .add_node(DELEGATOR_NODE, UserPass::new("delegator", "test34test!23"))
            .await?;
        topology
            .add_genesis(
                VALIDATOR_NODE,
                UserPass::new("genesis", "MyNameIs!Jeff"),
                &self.genesis.funded,
            )
            .await?;

        let validator = topology.node(VALIDATOR_NODE)?.x_address().to_owned();
        let delegator = topology.node(DELEGATOR_NODE)?.x_address().to_owned();
        topology
            .genesis()?
            .fund_x_addresses(&[&validator, &delegator], amounts.total)
            .await?;
        Ok(topology)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Workflow settings with fixed timings, independent of the environment.
#[must_use]
pub fn settings() -> WorkflowSettings {
    let acceptance = PollSettings {
        interval: Duration::from_secs(1),
        timeout: Duration::from_secs(30),
    };
    WorkflowSettings {
        acceptance,
        export_acceptance: acceptance.with_timeout(Duration::from_secs(120)),
        ..WorkflowSettings::default()
    }
}
