use std::time::Duration;

use testnet_config::{
    chain::ChainIds,
    timeouts,
    units::{DEFAULT_TX_FEE, KILO_UNIT},
};

use crate::{acceptance::PollSettings, error::WorkflowError};

const VALIDATION_PERIOD: Duration = Duration::from_secs(72 * 60 * 60);
const DELEGATION_PERIOD: Duration = Duration::from_secs(36 * 60 * 60);
const DELEGATION_FEE_RATE: f32 = 2.0;

/// Timing of add-validator / add-delegator operations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StakingSchedule {
    /// Distance between submission and the declared start time.
    pub start_delay: Duration,
    /// Extra wait after the start time before checking the validator set.
    pub start_grace: Duration,
    pub validation_period: Duration,
    pub delegation_period: Duration,
    pub delegation_fee_rate: f32,
}

impl Default for StakingSchedule {
    fn default() -> Self {
        Self {
            start_delay: timeouts::staking_start_delay(),
            start_grace: timeouts::staking_start_grace(),
            validation_period: VALIDATION_PERIOD,
            delegation_period: DELEGATION_PERIOD,
            delegation_fee_rate: DELEGATION_FEE_RATE,
        }
    }
}

/// Amounts moved by the staking workflows, in nano units.
///
/// `total` is what the node's X address holds before the workflow, `seed` is
/// what lands on its P address and `stake` is what gets bonded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeAmounts {
    pub total: u64,
    pub seed: u64,
    pub stake: u64,
    pub fee: u64,
}

impl Default for StakeAmounts {
    fn default() -> Self {
        Self {
            total: 10 * KILO_UNIT,
            seed: 5 * KILO_UNIT,
            stake: 3 * KILO_UNIT,
            fee: DEFAULT_TX_FEE,
        }
    }
}

impl StakeAmounts {
    /// Checks every step of the staking workflows, leftover return included.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        self.validate_leftover()
    }

    /// Amounts the seed and stake steps can move: `seed` plus the export and
    /// import fees must fit in `total`, and at most `seed` can be bonded.
    pub fn validate_stake(&self) -> Result<(), WorkflowError> {
        let seed_cost = self
            .fee
            .checked_mul(2)
            .and_then(|fees| self.seed.checked_add(fees));
        if seed_cost.is_none_or(|cost| cost > self.total) {
            return Err(WorkflowError::InvalidAmounts {
                reason: format!(
                    "seed {} plus two fees of {} exceeds total {}",
                    self.seed, self.fee, self.total
                ),
            });
        }
        if self.stake > self.seed {
            return Err(WorkflowError::InvalidAmounts {
                reason: format!("stake {} exceeds seed {}", self.stake, self.seed),
            });
        }
        Ok(())
    }

    /// Additionally, what stays unbonded on P must pay for the export back
    /// to X and its import.
    pub fn validate_leftover(&self) -> Result<(), WorkflowError> {
        self.validate_stake()?;
        let leftover_cost = self
            .fee
            .checked_mul(2)
            .and_then(|fees| self.stake.checked_add(fees));
        if leftover_cost.is_none_or(|cost| cost > self.seed) {
            return Err(WorkflowError::InvalidAmounts {
                reason: format!(
                    "stake {} plus two fees of {} exceeds seed {}",
                    self.stake, self.fee, self.seed
                ),
            });
        }
        Ok(())
    }

    /// Exported from X so that `seed` arrives on P after the import fee.
    #[must_use]
    pub const fn seed_export(&self) -> u64 {
        self.seed + self.fee
    }

    /// X balance once the seed has been moved to P.
    #[must_use]
    pub const fn x_after_seed(&self) -> u64 {
        self.total - self.seed - 2 * self.fee
    }

    /// P balance once the stake is bonded.
    #[must_use]
    pub const fn p_after_stake(&self) -> u64 {
        self.seed - self.stake
    }

    /// Exported from P when returning the unbonded rest to X.
    #[must_use]
    pub const fn leftover_export(&self) -> u64 {
        self.seed - self.stake - self.fee
    }

    /// X balance once the leftover is back.
    #[must_use]
    pub const fn x_after_leftover(&self) -> u64 {
        self.x_after_seed() + self.seed - self.stake - 2 * self.fee
    }
}

/// Everything a workflow needs besides the node it runs on.
#[derive(Clone, Debug)]
pub struct WorkflowSettings {
    pub chain_ids: ChainIds,
    pub acceptance: PollSettings,
    /// Used for the X export that seeds a validator's P address.
    pub export_acceptance: PollSettings,
    pub schedule: StakingSchedule,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            chain_ids: ChainIds::default(),
            acceptance: PollSettings::acceptance(),
            export_acceptance: PollSettings::export(),
            schedule: StakingSchedule::default(),
        }
    }
}

impl WorkflowSettings {
    #[must_use]
    pub fn asset(&self) -> &str {
        &self.chain_ids.native_asset_alias
    }
}
