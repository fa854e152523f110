use std::{
    net::IpAddr,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use testnet_config::chain::Lane;
use testnet_core::{
    nodes::{NodeApi, StakeRequest, TxId, UserPass},
    topology::TrackedNode,
};
use tokio::time::{Instant, sleep_until};
use tracing::{info, warn};

use crate::{
    acceptance::{LaneAcceptance, PollSettings, await_acceptance},
    balance::{LaneBalance, check_balance},
    error::WorkflowError,
    settings::{StakeAmounts, WorkflowSettings},
};

/// A started node with a keystore user and one address on the X and P lanes.
#[derive(Clone)]
pub struct RunningNode {
    id: String,
    ip: IpAddr,
    client: Arc<dyn NodeApi>,
    user: UserPass,
    node_id: String,
    x_address: String,
    p_address: String,
    settings: Arc<WorkflowSettings>,
}

impl std::fmt::Debug for RunningNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningNode")
            .field("id", &self.id)
            .field("ip", &self.ip)
            .field("node_id", &self.node_id)
            .field("x_address", &self.x_address)
            .field("p_address", &self.p_address)
            .finish_non_exhaustive()
    }
}

impl RunningNode {
    /// Create `user` on the node and generate its X and P addresses.
    pub(crate) async fn register(
        tracked: TrackedNode,
        user: UserPass,
        settings: Arc<WorkflowSettings>,
    ) -> Result<Self, WorkflowError> {
        let client = tracked.client;
        let node_id = client
            .info()
            .node_id()
            .await
            .map_err(WorkflowError::api("info.getNodeID"))?;
        client
            .keystore()
            .create_user(&user)
            .await
            .map_err(WorkflowError::api("keystore.createUser"))?;
        let x_address = client
            .x_chain()
            .create_address(&user)
            .await
            .map_err(WorkflowError::api("avm.createAddress"))?;
        let p_address = client
            .p_chain()
            .create_address(&user)
            .await
            .map_err(WorkflowError::api("platform.createAddress"))?;

        info!(
            node = %tracked.id,
            node_id = %node_id,
            x = %x_address,
            p = %p_address,
            "node joined topology"
        );
        Ok(Self {
            id: tracked.id,
            ip: tracked.ip,
            client,
            user,
            node_id,
            x_address,
            p_address,
            settings,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn ip(&self) -> IpAddr {
        self.ip
    }

    #[must_use]
    pub fn client(&self) -> &Arc<dyn NodeApi> {
        &self.client
    }

    #[must_use]
    pub fn user(&self) -> &UserPass {
        &self.user
    }

    /// Network identity reported by the node.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    #[must_use]
    pub fn x_address(&self) -> &str {
        &self.x_address
    }

    #[must_use]
    pub fn p_address(&self) -> &str {
        &self.p_address
    }

    #[must_use]
    pub fn acceptance(&self, lane: Lane) -> LaneAcceptance {
        LaneAcceptance::new(Arc::clone(&self.client), lane)
    }

    #[must_use]
    pub fn balances(&self, lane: Lane) -> LaneBalance {
        LaneBalance::new(Arc::clone(&self.client), lane, self.settings.asset())
    }

    async fn await_lane(
        &self,
        lane: Lane,
        tx: &TxId,
        settings: PollSettings,
    ) -> Result<(), WorkflowError> {
        await_acceptance(&self.acceptance(lane), tx, settings)
            .await
            .map_err(|err| {
                warn!(node = %self.id, %tx, %lane, error = %err, "acceptance failed");
                err.into()
            })
    }

    async fn expect_balance(&self, lane: Lane, expected: u64) -> Result<(), WorkflowError> {
        let address = match lane {
            Lane::P => &self.p_address,
            Lane::X | Lane::C => &self.x_address,
        };
        check_balance(&self.balances(lane), address, u128::from(expected)).await?;
        Ok(())
    }

    /// Move `seed` from X to P: export `seed + fee`, import on P, then check
    /// P = seed and X = total - seed - 2 * fee.
    async fn seed_p_lane(
        &self,
        amounts: &StakeAmounts,
        export_settings: PollSettings,
    ) -> Result<(), WorkflowError> {
        amounts.validate_stake()?;
        let export = self
            .client
            .x_chain()
            .export(&self.user, amounts.seed_export(), &self.p_address)
            .await
            .map_err(WorkflowError::api("avm.exportAVAX"))?;
        self.await_lane(Lane::X, &export, export_settings).await?;

        let import = self
            .client
            .p_chain()
            .import(
                &self.user,
                &self.p_address,
                self.settings.chain_ids.chain_id(Lane::X),
            )
            .await
            .map_err(WorkflowError::api("platform.importAVAX"))?;
        self.await_lane(Lane::P, &import, self.settings.acceptance)
            .await?;

        self.expect_balance(Lane::P, amounts.seed).await?;
        self.expect_balance(Lane::X, amounts.x_after_seed()).await?;
        info!(node = %self.id, seed = amounts.seed, "seeded P lane");
        Ok(())
    }

    fn stake_request(
        &self,
        node_id: &str,
        amount: u64,
        period: Duration,
    ) -> (StakeRequest, Instant) {
        let delay = self.settings.schedule.start_delay;
        let start = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            + delay;
        let request = StakeRequest {
            node_id: node_id.to_owned(),
            reward_address: self.p_address.clone(),
            stake_amount: amount,
            start_time: start.as_secs(),
            end_time: (start + period).as_secs(),
        };
        (request, Instant::now() + delay)
    }

    /// Seed the P lane, register this node as a validator bonding
    /// `amounts.stake`, wait for the validation period to begin and check
    /// the node shows up among the current validators.
    pub async fn become_validator(&self, amounts: &StakeAmounts) -> Result<(), WorkflowError> {
        self.seed_p_lane(amounts, self.settings.export_acceptance)
            .await?;

        let schedule = self.settings.schedule;
        let (request, starts_at) =
            self.stake_request(&self.node_id, amounts.stake, schedule.validation_period);
        let tx = self
            .client
            .p_chain()
            .add_validator(&self.user, &request, schedule.delegation_fee_rate)
            .await
            .map_err(WorkflowError::api("platform.addValidator"))?;
        self.await_lane(Lane::P, &tx, self.settings.acceptance)
            .await?;

        sleep_until(starts_at + schedule.start_grace).await;

        let validators = self
            .client
            .p_chain()
            .current_validators()
            .await
            .map_err(WorkflowError::api("platform.getCurrentValidators"))?;
        if !validators.iter().any(|v| v.node_id == self.node_id) {
            let validators: Vec<String> = validators.into_iter().map(|v| v.node_id).collect();
            warn!(
                node = %self.id,
                node_id = %self.node_id,
                ?validators,
                "node missing from validator set"
            );
            return Err(WorkflowError::ValidatorMissing {
                node_id: self.node_id.clone(),
                validators,
            });
        }

        self.expect_balance(Lane::P, amounts.p_after_stake()).await?;
        info!(
            node = %self.id,
            node_id = %self.node_id,
            stake = amounts.stake,
            "node is validating"
        );
        Ok(())
    }

    /// Seed the P lane and delegate `amounts.stake` to `validator_node_id`.
    pub async fn become_delegator(
        &self,
        amounts: &StakeAmounts,
        validator_node_id: &str,
    ) -> Result<(), WorkflowError> {
        self.seed_p_lane(amounts, self.settings.acceptance).await?;

        let schedule = self.settings.schedule;
        let (request, starts_at) =
            self.stake_request(validator_node_id, amounts.stake, schedule.delegation_period);
        let tx = self
            .client
            .p_chain()
            .add_delegator(&self.user, &request)
            .await
            .map_err(WorkflowError::api("platform.addDelegator"))?;
        self.await_lane(Lane::P, &tx, self.settings.acceptance)
            .await?;

        sleep_until(starts_at + schedule.start_grace).await;

        self.expect_balance(Lane::P, amounts.p_after_stake()).await?;
        info!(
            node = %self.id,
            validator = validator_node_id,
            stake = amounts.stake,
            "node is delegating"
        );
        Ok(())
    }

    /// Send what is left on P after staking back to X, leaving P empty.
    pub async fn return_stake_leftover(&self, amounts: &StakeAmounts) -> Result<(), WorkflowError> {
        amounts.validate_leftover()?;
        let export = self
            .client
            .p_chain()
            .export(&self.user, &self.x_address, amounts.leftover_export())
            .await
            .map_err(WorkflowError::api("platform.exportAVAX"))?;
        self.await_lane(Lane::P, &export, self.settings.acceptance)
            .await?;

        let import = self
            .client
            .x_chain()
            .import(
                &self.user,
                &self.x_address,
                self.settings.chain_ids.chain_id(Lane::P),
            )
            .await
            .map_err(WorkflowError::api("avm.importAVAX"))?;
        self.await_lane(Lane::X, &import, self.settings.acceptance)
            .await?;

        self.expect_balance(Lane::P, 0).await?;
        self.expect_balance(Lane::X, amounts.x_after_leftover())
            .await?;
        info!(node = %self.id, "returned stake leftover to X lane");
        Ok(())
    }
}
