use std::{fs, io, path::{Path, PathBuf}};

use testnet_env as tf_env;
use thiserror::Error;
use tracing::{info, warn};

use crate::network::StakingCredentials;

/// Stakers preloaded into the local network genesis. Their identities are
/// derived from TLS pairs published with the node software, so a node
/// launched with the same pair validates under that identity.
const LOCAL_STAKER_NODE_IDS: [&str; 5] = [
    "NodeID-7Xhw2mDxuDS44j42TCB6U5579esbSt3Lg",
    "NodeID-MFrZFVCXPv5iCn6M9K6XduxGTYp891xXZ",
    "NodeID-NFBbbJ4qCmNaCzeW7sxErhvWqvEQMnYcN",
    "NodeID-GWPcbFJZFfZreETSoWjPimr846mXEKCtu",
    "NodeID-P7oB2McjBGgW2NXXWVYjV8JEDFoW9xDE5",
];

/// Account funded by the local network genesis. The key is public and only
/// meaningful on local networks.
const LOCAL_FUNDED_ADDRESS: &str = "X-local18jma8ppw3nhx5r4ap8clazz0dps7rv5u00z96u";
const LOCAL_FUNDED_PRIVATE_KEY: &str =
    "PrivateKey-ewoqjP7PxY4yr3iLTpLisriqt94hdyDFNgchSxGGztUrTXtNN";

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("failed to read staker credential {}", path.display())]
    ReadCredential {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakerIdentity {
    pub node_id: String,
    /// Absent until the TLS pair has been loaded.
    pub credentials: Option<StakingCredentials>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundedAccount {
    pub address: String,
    pub private_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenesisConfig {
    pub stakers: Vec<StakerIdentity>,
    pub funded: FundedAccount,
}

impl GenesisConfig {
    /// Local network genesis without TLS material.
    #[must_use]
    pub fn local() -> Self {
        Self {
            stakers: LOCAL_STAKER_NODE_IDS
                .iter()
                .map(|node_id| StakerIdentity {
                    node_id: (*node_id).to_owned(),
                    credentials: None,
                })
                .collect(),
            funded: FundedAccount {
                address: LOCAL_FUNDED_ADDRESS.to_owned(),
                private_key: LOCAL_FUNDED_PRIVATE_KEY.to_owned(),
            },
        }
    }

    /// Local genesis with TLS pairs read from `staker<N>.crt` and
    /// `staker<N>.key` in `dir`.
    pub fn local_with_credentials(dir: &Path) -> Result<Self, GenesisError> {
        let mut genesis = Self::local();
        for (index, staker) in genesis.stakers.iter_mut().enumerate() {
            let ordinal = index + 1;
            let tls_cert = read_credential(&dir.join(format!("staker{ordinal}.crt")))?;
            let tls_key = read_credential(&dir.join(format!("staker{ordinal}.key")))?;
            staker.credentials = Some(StakingCredentials {
                node_id: staker.node_id.clone(),
                tls_cert,
                tls_key,
            });
        }
        info!(dir = %dir.display(), stakers = genesis.stakers.len(), "loaded staker credentials");
        Ok(genesis)
    }

    /// Use `TESTNET_STAKER_CERTS_DIR` when set.
    pub fn from_env() -> Result<Self, GenesisError> {
        match tf_env::testnet_staker_certs_dir() {
            Some(dir) => Self::local_with_credentials(&dir),
            None => {
                warn!(
                    "TESTNET_STAKER_CERTS_DIR not set; \
                     bootstrap nodes will not be pinned to staker identities"
                );
                Ok(Self::local())
            }
        }
    }
}

fn read_credential(path: &Path) -> Result<String, GenesisError> {
    fs::read_to_string(path).map_err(|source| GenesisError::ReadCredential {
        path: path.to_path_buf(),
        source,
    })
}
