use std::time::Duration;

use testnet_env as tf_env;

/// HTTP API port every node listens on.
pub const DEFAULT_HTTP_PORT: u16 = 9650;

/// Staking (peer-to-peer) port every node listens on.
pub const DEFAULT_STAKING_PORT: u16 = 9651;

/// Numeric id of the local ledger network.
pub const LOCAL_NETWORK_ID: u32 = 12345;

/// Name passed to `--network-id` when launching nodes.
pub const LOCAL_NETWORK_NAME: &str = "local";

/// Image used when neither the node nor the environment picks one.
pub const DEFAULT_NODE_IMAGE: &str = "avaplatform/avalanchego:dev";

/// Log level nodes are launched with.
pub const DEFAULT_NODE_LOG_LEVEL: &str = "debug";

/// Number of bootstrap attempts a node makes before giving up.
pub const DEFAULT_BOOTSTRAP_ATTEMPTS: u32 = 10;

pub const DEFAULT_SNOW_SAMPLE_SIZE: u32 = 1;
pub const DEFAULT_SNOW_QUORUM_SIZE: u32 = 1;
/// Consensus sample and quorum size of the five-staker bootstrapping network.
pub const STAKING_PRESET_SNOW_SIZE: u32 = 3;

/// Request timeout of the node RPC client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Password used for every keystore user created by the workflows.
pub const DEFAULT_USER_PASSWORD: &str = "MyNameIs!Jeff";

/// Mount point of generated files inside node containers.
pub const TEST_VOLUME_MOUNTPOINT: &str = "/test-volume";

/// Node binary inside the node image.
pub const NODE_BINARY_PATH: &str = "/avalanchego/build/avalanchego";

pub const STAKING_TLS_CERT_FILE_ID: &str = "staking-tls-cert";
pub const STAKING_TLS_KEY_FILE_ID: &str = "staking-tls-key";
pub const C_CHAIN_CONFIG_FILE_ID: &str = "c-chain-config";

/// Fixed C-lane configuration written next to every node.
pub const C_CHAIN_CONFIG_CONTENTS: &str = r#"{"coreth-config":{"snowman-api-enabled": false,"coreth-admin-api-enabled": false,"net-api-enabled": true,"rpc-gas-cap": 2500000000,"rpc-tx-fee-cap": 100,"eth-api-enabled": true,"personal-api-enabled": true,"tx-pool-api-enabled": true,"debug-api-enabled": false,"web3-api-enabled": true,"local-txs-enabled": true}}"#;

/// Resolve the node image from `TESTNET_NODE_IMAGE`, falling back to the
/// default.
#[must_use]
pub fn node_image() -> String {
    tf_env::testnet_node_image().unwrap_or_else(|| DEFAULT_NODE_IMAGE.to_owned())
}

/// Resolve the node log level from `TESTNET_LOG_LEVEL`, falling back to the
/// default.
#[must_use]
pub fn node_log_level() -> String {
    tf_env::testnet_log_level().unwrap_or_else(|| DEFAULT_NODE_LOG_LEVEL.to_owned())
}
