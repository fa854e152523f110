use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use testnet_config::{adjust_timeout, chain::Lane, timeouts};
use testnet_core::nodes::{ApiClientError, NodeApi, PTxStatus, PTxStatusReply, TxId, XTxStatus};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::error::AcceptanceError;

/// Where a submitted operation stands, in lane-independent terms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcceptanceState {
    Pending,
    Accepted,
    Abandoned { reason: String },
}

impl From<XTxStatus> for AcceptanceState {
    fn from(status: XTxStatus) -> Self {
        match status {
            XTxStatus::Accepted => Self::Accepted,
            XTxStatus::Rejected => Self::Abandoned {
                reason: "rejected".to_owned(),
            },
            XTxStatus::Processing | XTxStatus::Unknown => Self::Pending,
        }
    }
}

impl From<PTxStatusReply> for AcceptanceState {
    fn from(reply: PTxStatusReply) -> Self {
        let label = match reply.status {
            PTxStatus::Committed => return Self::Accepted,
            PTxStatus::Dropped => "dropped",
            PTxStatus::Aborted => "aborted",
            PTxStatus::Processing | PTxStatus::Unknown => return Self::Pending,
        };
        Self::Abandoned {
            reason: reply
                .reason
                .filter(|reason| !reason.is_empty())
                .unwrap_or_else(|| label.to_owned()),
        }
    }
}

/// Status query of one lane.
///
/// Returning [`ApiClientError::Unsupported`] means the lane cannot report
/// status at all; every other error is treated as transient.
#[async_trait]
pub trait TxAcceptance: Send + Sync {
    fn lane(&self) -> Lane;

    async fn check(&self, tx: &TxId) -> Result<AcceptanceState, ApiClientError>;
}

/// [`TxAcceptance`] backed by a node's RPC client.
#[derive(Clone)]
pub struct LaneAcceptance {
    client: Arc<dyn NodeApi>,
    lane: Lane,
}

impl LaneAcceptance {
    #[must_use]
    pub fn new(client: Arc<dyn NodeApi>, lane: Lane) -> Self {
        Self { client, lane }
    }
}

#[async_trait]
impl TxAcceptance for LaneAcceptance {
    fn lane(&self) -> Lane {
        self.lane
    }

    async fn check(&self, tx: &TxId) -> Result<AcceptanceState, ApiClientError> {
        match self.lane {
            Lane::X => self.client.x_chain().tx_status(tx).await.map(Into::into),
            Lane::P => self.client.p_chain().tx_status(tx).await.map(Into::into),
            // The C lane API has no status-by-id query.
            Lane::C => Err(ApiClientError::Unsupported {
                method: "avax.getAtomicTxStatus",
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    #[must_use]
    pub fn acceptance() -> Self {
        Self {
            interval: timeouts::acceptance_poll_interval(),
            timeout: adjust_timeout(timeouts::acceptance_timeout()),
        }
    }

    /// Cross-lane exports take longer to settle.
    #[must_use]
    pub fn export() -> Self {
        Self {
            timeout: adjust_timeout(timeouts::export_acceptance_timeout()),
            ..Self::acceptance()
        }
    }

    #[must_use]
    pub const fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::acceptance()
    }
}

/// Poll `tx` once per interval until it is accepted, abandoned, or the next
/// poll would fall past the timeout.
pub async fn await_acceptance<A>(
    acceptance: &A,
    tx: &TxId,
    settings: PollSettings,
) -> Result<(), AcceptanceError>
where
    A: TxAcceptance + ?Sized,
{
    let lane = acceptance.lane();
    let started = Instant::now();
    let mut last_error = None;
    let mut polls = 0u32;

    loop {
        polls += 1;
        match acceptance.check(tx).await {
            Ok(AcceptanceState::Accepted) => {
                info!(%tx, %lane, polls, "transaction accepted");
                return Ok(());
            }
            Ok(AcceptanceState::Abandoned { reason }) => {
                warn!(%tx, %lane, reason = %reason, "transaction abandoned");
                return Err(AcceptanceError::Abandoned {
                    tx: tx.clone(),
                    lane,
                    reason,
                });
            }
            Ok(AcceptanceState::Pending) => {
                debug!(%tx, %lane, polls, "transaction pending");
            }
            Err(ApiClientError::Unsupported { .. }) => {
                return Err(AcceptanceError::Unsupported { lane });
            }
            Err(err) => {
                debug!(%tx, %lane, polls, error = %err, "status query failed");
                last_error = Some(err);
            }
        }

        let elapsed = started.elapsed();
        if elapsed + settings.interval > settings.timeout {
            warn!(%tx, %lane, ?elapsed, polls, "transaction acceptance timed out");
            return Err(AcceptanceError::Timeout {
                tx: tx.clone(),
                lane,
                elapsed,
                last_error,
            });
        }
        sleep(settings.interval).await;
    }
}

/// Like [`await_acceptance`], but a lane without status queries degrades to
/// a fixed wait of a fifth of the timeout.
pub async fn await_acceptance_or_wait<A>(
    acceptance: &A,
    tx: &TxId,
    settings: PollSettings,
) -> Result<(), AcceptanceError>
where
    A: TxAcceptance + ?Sized,
{
    match await_acceptance(acceptance, tx, settings).await {
        Err(AcceptanceError::Unsupported { lane }) => {
            let wait = settings.timeout / 5;
            warn!(%tx, %lane, ?wait, "lane cannot confirm acceptance; waiting instead");
            sleep(wait).await;
            Ok(())
        }
        other => other,
    }
}
