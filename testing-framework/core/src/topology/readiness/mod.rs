pub mod node;

use std::time::Duration;

pub use node::{NodeReadinessChecker, ReadinessRecord};
use testnet_config::timeouts;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

use crate::adjust_timeout;

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("{message} (after {attempts} attempts)")]
    Exhausted { message: String, attempts: u32 },
}

/// Fixed-interval attempt budget of a readiness wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollBudget {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollBudget {
    /// Budget for a node started on its own.
    #[must_use]
    pub fn startup() -> Self {
        Self {
            interval: adjust_timeout(timeouts::startup_poll_interval()),
            max_attempts: timeouts::startup_max_polls(),
        }
    }

    /// Budget for each node of the bootstrap wave.
    #[must_use]
    pub fn bootstrap_wave() -> Self {
        Self {
            interval: adjust_timeout(timeouts::bootstrap_wave_poll_interval()),
            max_attempts: timeouts::bootstrap_wave_max_polls(),
        }
    }
}

#[async_trait::async_trait]
pub trait ReadinessCheck: Send {
    /// Run one round of queries, returning overall readiness.
    async fn poll(&mut self) -> bool;

    fn timeout_message(&self) -> String;
}

/// Poll `check` until it reports ready or `budget` runs out.
pub async fn wait_ready<C>(check: &mut C, budget: PollBudget) -> Result<(), ReadinessError>
where
    C: ReadinessCheck + ?Sized,
{
    for attempt in 1..=budget.max_attempts {
        if check.poll().await {
            return Ok(());
        }
        debug!(attempt, max = budget.max_attempts, "not ready yet");
        if attempt < budget.max_attempts {
            sleep(budget.interval).await;
        }
    }

    Err(ReadinessError::Exhausted {
        message: check.timeout_message(),
        attempts: budget.max_attempts,
    })
}
