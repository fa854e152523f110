pub mod acceptance;
pub mod balance;
pub mod bootstrap;
pub mod error;
pub mod peers;
pub mod scenario;
pub mod settings;
pub mod topology;

pub use acceptance::{
    AcceptanceState, LaneAcceptance, PollSettings, TxAcceptance, await_acceptance,
    await_acceptance_or_wait,
};
pub use balance::{BalanceSource, LaneBalance, check_balance, check_balances};
pub use bootstrap::{added_node_id, bootstrap_added_nodes};
pub use error::{AcceptanceError, BalanceError, WorkflowError};
pub use peers::verify_connected_peers;
pub use scenario::{DELEGATOR_NODE, StakingScenario, VALIDATOR_NODE};
pub use settings::{StakeAmounts, StakingSchedule, WorkflowSettings};
pub use topology::{Genesis, RunningNode, Topology};
