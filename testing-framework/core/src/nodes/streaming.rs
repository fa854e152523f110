use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::trace;

use super::api_client::{ApiClientError, RpcEndpoint};

/// Transport of the C lane streaming API. Methods take `&mut self` because a
/// transport cannot multiplex concurrent requests.
#[async_trait::async_trait]
pub trait EthTransport: Send {
    /// Balance in wei.
    async fn balance_at(&mut self, address: &str) -> Result<u128, ApiClientError>;

    async fn block_number(&mut self) -> Result<u64, ApiClientError>;

    /// Submit a signed transaction, returning its hash.
    async fn send_raw_transaction(&mut self, raw: &[u8]) -> Result<String, ApiClientError>;

    /// `None` until the transaction has been included.
    async fn transaction_receipt(&mut self, hash: &str) -> Result<Option<Value>, ApiClientError>;
}

/// Streaming client whose every call holds the lock for exactly that call,
/// serialising all users of one node's transport.
pub struct ConcurrentEthClient<T> {
    transport: Mutex<T>,
}

impl<T: EthTransport> ConcurrentEthClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
        }
    }

    pub async fn balance_at(&self, address: &str) -> Result<u128, ApiClientError> {
        self.transport.lock().await.balance_at(address).await
    }

    pub async fn block_number(&self) -> Result<u64, ApiClientError> {
        self.transport.lock().await.block_number().await
    }

    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String, ApiClientError> {
        self.transport.lock().await.send_raw_transaction(raw).await
    }

    pub async fn transaction_receipt(&self, hash: &str) -> Result<Option<Value>, ApiClientError> {
        self.transport.lock().await.transaction_receipt(hash).await
    }

    pub fn into_inner(self) -> T {
        self.transport.into_inner()
    }
}

/// `eth_*` JSON-RPC over HTTP.
pub struct EthRpcTransport {
    endpoint: RpcEndpoint,
}

impl EthRpcTransport {
    #[must_use]
    pub const fn new(endpoint: RpcEndpoint) -> Self {
        Self { endpoint }
    }

    async fn quantity(&self, method: &'static str, params: Value) -> Result<u128, ApiClientError> {
        let raw: String = self.endpoint.call(method, params).await?;
        trace!(method, raw = %raw, "eth quantity");
        parse_quantity(&raw).ok_or_else(|| ApiClientError::Malformed {
            method: method.to_owned(),
            field: "quantity",
            value: raw,
        })
    }
}

#[async_trait::async_trait]
impl EthTransport for EthRpcTransport {
    async fn balance_at(&mut self, address: &str) -> Result<u128, ApiClientError> {
        self.quantity("eth_getBalance", json!([address, "latest"]))
            .await
    }

    async fn block_number(&mut self) -> Result<u64, ApiClientError> {
        const METHOD: &str = "eth_blockNumber";
        let number = self.quantity(METHOD, json!([])).await?;
        u64::try_from(number).map_err(|_| ApiClientError::Malformed {
            method: METHOD.to_owned(),
            field: "blockNumber",
            value: number.to_string(),
        })
    }

    async fn send_raw_transaction(&mut self, raw: &[u8]) -> Result<String, ApiClientError> {
        let encoded = format!("0x{}", hex::encode(raw));
        self.endpoint
            .call("eth_sendRawTransaction", json!([encoded]))
            .await
    }

    async fn transaction_receipt(&mut self, hash: &str) -> Result<Option<Value>, ApiClientError> {
        self.endpoint
            .call::<_, Option<Value>>("eth_getTransactionReceipt", json!([hash]))
            .await
            .or_else(|err| match err {
                ApiClientError::EmptyReply { .. } => Ok(None),
                other => Err(other),
            })
    }
}

fn parse_quantity(raw: &str) -> Option<u128> {
    let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    u128::from_str_radix(digits, 16).ok()
}
