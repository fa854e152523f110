use std::sync::Arc;

use testnet_config::chain::{Lane, address_on_lane};
use testnet_core::nodes::{NodeApi, SendOutput, TxId, UserPass};
use tokio::time::Instant;
use tracing::info;

use crate::{
    acceptance::{LaneAcceptance, await_acceptance, await_acceptance_or_wait},
    balance::{BalanceSource, LaneBalance, check_balance, check_balances},
    error::WorkflowError,
    settings::WorkflowSettings,
};

/// The node holding the pre-funded account, used to seed every other node.
#[derive(Clone)]
pub struct Genesis {
    id: String,
    client: Arc<dyn NodeApi>,
    user: UserPass,
    private_key: String,
    address: String,
    settings: Arc<WorkflowSettings>,
}

impl std::fmt::Debug for Genesis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Genesis")
            .field("id", &self.id)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Genesis {
    /// Create `user` on the node and import the funded key into it.
    pub(crate) async fn import_funds(
        id: String,
        client: Arc<dyn NodeApi>,
        user: UserPass,
        private_key: String,
        settings: Arc<WorkflowSettings>,
    ) -> Result<Self, WorkflowError> {
        client
            .keystore()
            .create_user(&user)
            .await
            .map_err(WorkflowError::api("keystore.createUser"))?;
        let address = client
            .x_chain()
            .import_key(&user, &private_key)
            .await
            .map_err(WorkflowError::api("avm.importKey"))?;
        info!(node = %id, address = %address, "genesis funds imported");

        Ok(Self {
            id,
            client,
            user,
            private_key,
            address,
            settings,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// X address of the funded account.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    fn x_acceptance(&self) -> LaneAcceptance {
        LaneAcceptance::new(Arc::clone(&self.client), Lane::X)
    }

    fn x_balances(&self) -> LaneBalance {
        LaneBalance::new(Arc::clone(&self.client), Lane::X, self.settings.asset())
    }

    async fn await_x(&self, tx: &TxId) -> Result<(), WorkflowError> {
        await_acceptance(&self.x_acceptance(), tx, self.settings.acceptance).await?;
        Ok(())
    }

    /// Send `amount` to each address in turn, checking each balance.
    pub async fn fund_x_addresses(
        &self,
        addresses: &[&str],
        amount: u64,
    ) -> Result<(), WorkflowError> {
        let balances = self.x_balances();
        for address in addresses {
            let tx = self
                .client
                .x_chain()
                .send(&self.user, amount, self.settings.asset(), address)
                .await
                .map_err(WorkflowError::api("avm.send"))?;
            self.await_x(&tx).await?;
            check_balance(&balances, address, u128::from(amount)).await?;
            info!(address, amount, "funded X address");
        }
        Ok(())
    }

    /// Send `times` outputs of `amount` to every address (one transaction
    /// per address), then verify all balances concurrently.
    pub async fn multiple_fund_x_addresses(
        &self,
        addresses: &[&str],
        amount: u64,
        times: usize,
    ) -> Result<(), WorkflowError> {
        for address in addresses {
            let outputs = vec![
                SendOutput {
                    asset_id: self.settings.asset().to_owned(),
                    amount,
                    to: (*address).to_owned(),
                };
                times
            ];
            let tx = self
                .client
                .x_chain()
                .send_multiple(&self.user, &outputs)
                .await
                .map_err(WorkflowError::api("avm.sendMultiple"))?;
            info!(%tx, address, outputs = times, "sent multi-output transaction");
            self.await_x(&tx).await?;
        }

        let expected = u128::from(amount) * times as u128;
        let started = Instant::now();
        let source: Arc<dyn BalanceSource> = Arc::new(self.x_balances());
        check_balances(
            source,
            addresses
                .iter()
                .map(|address| ((*address).to_owned(), expected))
                .collect(),
        )
        .await?;
        info!(
            addresses = addresses.len(),
            expected,
            elapsed = ?started.elapsed(),
            "funded X addresses"
        );
        Ok(())
    }

    /// Move `amount` to each hex address on the C lane through an X export
    /// and a C import.
    pub async fn fund_c_addresses(
        &self,
        addresses: &[&str],
        amount: u64,
    ) -> Result<(), WorkflowError> {
        self.client
            .c_chain()
            .import_key(&self.user, &self.private_key)
            .await
            .map_err(WorkflowError::api("avax.importKey"))?;

        let c_address = address_on_lane(&self.address, Lane::C);
        let c_acceptance = LaneAcceptance::new(Arc::clone(&self.client), Lane::C);
        for address in addresses {
            let export = self
                .client
                .x_chain()
                .export(&self.user, amount, &c_address)
                .await
                .map_err(WorkflowError::api("avm.exportAVAX"))?;
            self.await_x(&export).await?;

            let import = self
                .client
                .c_chain()
                .import(&self.user, address, Lane::X.alias())
                .await
                .map_err(WorkflowError::api("avax.import"))?;
            await_acceptance_or_wait(&c_acceptance, &import, self.settings.acceptance).await?;
            info!(address, amount, "funded C address");
        }
        Ok(())
    }

    /// Move half of what the funded account can spend to `address` on C.
    pub async fn move_balance_to_c(&self, address: &str, fee: u64) -> Result<(), WorkflowError> {
        let balance = self
            .client
            .x_chain()
            .balance(&self.address, &self.settings.chain_ids.native_asset_id)
            .await
            .map_err(WorkflowError::api("avm.getBalance"))?;
        let sendable = balance.saturating_sub(fee) / 2;
        info!(balance, fee, sendable, "moving genesis balance to C lane");
        self.fund_c_addresses(&[address], sendable).await
    }
}
