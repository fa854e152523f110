use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use testnet_config::chain::Lane;
use testnet_core::nodes::{ApiClientError, NodeApi};
use tracing::{debug, info, warn};

use crate::error::BalanceError;

/// Balance query of one lane.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    fn lane(&self) -> Lane;

    async fn balance(&self, address: &str) -> Result<u128, ApiClientError>;
}

/// [`BalanceSource`] backed by a node's RPC client. `asset` is only used on
/// the X lane.
#[derive(Clone)]
pub struct LaneBalance {
    client: Arc<dyn NodeApi>,
    lane: Lane,
    asset: String,
}

impl LaneBalance {
    #[must_use]
    pub fn new(client: Arc<dyn NodeApi>, lane: Lane, asset: impl Into<String>) -> Self {
        Self {
            client,
            lane,
            asset: asset.into(),
        }
    }
}

#[async_trait]
impl BalanceSource for LaneBalance {
    fn lane(&self) -> Lane {
        self.lane
    }

    async fn balance(&self, address: &str) -> Result<u128, ApiClientError> {
        match self.lane {
            Lane::X => self
                .client
                .x_chain()
                .balance(address, &self.asset)
                .await
                .map(u128::from),
            Lane::P => self.client.p_chain().balance(address).await.map(u128::from),
            Lane::C => self.client.c_chain().balance(address).await,
        }
    }
}

/// Fail unless `address` holds exactly `expected`.
pub async fn check_balance<S>(source: &S, address: &str, expected: u128) -> Result<(), BalanceError>
where
    S: BalanceSource + ?Sized,
{
    let lane = source.lane();
    let actual = source.balance(address).await.map_err(|source| {
        warn!(%lane, address, expected, error = %source, "balance query failed");
        BalanceError::Query {
            lane,
            address: address.to_owned(),
            source,
        }
    })?;

    if actual != expected {
        warn!(%lane, address, expected, actual, "balance mismatch");
        return Err(BalanceError::Mismatch {
            lane,
            address: address.to_owned(),
            expected,
            actual,
        });
    }
    debug!(%lane, address, balance = actual, "balance verified");
    Ok(())
}

/// Check every `(address, expected)` pair concurrently.
///
/// All checks are dispatched before any result is inspected and all of them
/// run to completion; the first failure in dispatch order is returned.
pub async fn check_balances(
    source: Arc<dyn BalanceSource>,
    expectations: Vec<(String, u128)>,
) -> Result<(), BalanceError> {
    let total = expectations.len();
    let lane = source.lane();
    let handles: Vec<_> = expectations
        .into_iter()
        .map(|(address, expected)| {
            let source = Arc::clone(&source);
            let task_address = address.clone();
            let handle = tokio::spawn(async move {
                check_balance(&*source, &task_address, expected).await
            });
            (address, handle)
        })
        .collect();

    let (addresses, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    let results = join_all(handles).await;

    let mut first_error = None;
    for (address, result) in addresses.into_iter().zip(results) {
        let outcome = result.map_err(|source| BalanceError::Task { address, source });
        if let Err(err) | Ok(Err(err)) = outcome {
            first_error.get_or_insert(err);
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => {
            info!(%lane, addresses = total, "balances verified");
            Ok(())
        }
    }
}
