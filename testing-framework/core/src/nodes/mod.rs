pub mod api;
pub mod api_client;
pub mod streaming;
#[cfg(test)]
pub(crate) mod test_support;

pub use api::{
    CChainApi, InfoApi, KeystoreApi, NodeApi, PChainApi, PTxStatus, PTxStatusReply, Peer,
    SendOutput, StakeRequest, TxId, UserPass, Validator, XChainApi, XTxStatus,
};
pub use api_client::{ApiClientError, HttpNodeClient, RpcEndpoint};
pub use streaming::{ConcurrentEthClient, EthRpcTransport, EthTransport};
