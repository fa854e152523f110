use std::{
    collections::{BTreeMap, HashMap},
    net::IpAddr,
    path::PathBuf,
};

use testnet_config::{
    constants::{
        C_CHAIN_CONFIG_CONTENTS, C_CHAIN_CONFIG_FILE_ID, DEFAULT_HTTP_PORT, DEFAULT_STAKING_PORT,
        LOCAL_NETWORK_NAME, NODE_BINARY_PATH, STAKING_TLS_CERT_FILE_ID, STAKING_TLS_KEY_FILE_ID,
    },
    network::{NetworkDefinition, NodeConfig},
};

use super::lifecycle::LaunchCommand;

/// Start command of one node, resolved against the network it joins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeLaunch {
    log_level: String,
    snow_sample_size: u32,
    snow_quorum_size: u32,
    staking: bool,
    tx_fee: u64,
    has_credentials: bool,
    bootstrap_ids: String,
    bootstrap_ips: Vec<IpAddr>,
}

impl NodeLaunch {
    /// `bootstrap_ips` are the addresses of `node.depends_on()`, in order.
    #[must_use]
    pub fn new(
        definition: &NetworkDefinition,
        node: &NodeConfig,
        bootstrap_ips: Vec<IpAddr>,
    ) -> Self {
        Self {
            log_level: node.log_level().to_owned(),
            snow_sample_size: definition.snow_sample_size(),
            snow_quorum_size: definition.snow_quorum_size(),
            staking: node.is_staking(),
            tx_fee: definition.tx_fee(),
            has_credentials: node.credentials().is_some(),
            bootstrap_ids: node.bootstrap_ids(),
            bootstrap_ips,
        }
    }

    fn bootstrap_ip_list(&self) -> String {
        self.bootstrap_ips
            .iter()
            .map(|ip| format!("{ip}:{DEFAULT_STAKING_PORT}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl LaunchCommand for NodeLaunch {
    fn render(&self, ip: IpAddr, mounted: &HashMap<String, PathBuf>) -> Vec<String> {
        let mut args = vec![
            NODE_BINARY_PATH.to_owned(),
            format!("--public-ip={ip}"),
            format!("--network-id={LOCAL_NETWORK_NAME}"),
            format!("--http-port={DEFAULT_HTTP_PORT}"),
            "--http-host=".to_owned(),
            format!("--staking-port={DEFAULT_STAKING_PORT}"),
            format!("--log-level={}", self.log_level),
            format!("--snow-sample-size={}", self.snow_sample_size),
            format!("--snow-quorum-size={}", self.snow_quorum_size),
            format!("--staking-enabled={}", self.staking),
            format!("--tx-fee={}", self.tx_fee),
        ];

        if self.has_credentials {
            if let (Some(cert), Some(key)) = (
                mounted.get(STAKING_TLS_CERT_FILE_ID),
                mounted.get(STAKING_TLS_KEY_FILE_ID),
            ) {
                args.push(format!("--staking-tls-cert-file=\"{}\"", cert.display()));
                args.push(format!("--staking-tls-key-file=\"{}\"", key.display()));
            }
        }

        args.push(format!("--bootstrap-ids={}", self.bootstrap_ids));
        args.push(format!("--bootstrap-ips={}", self.bootstrap_ip_list()));

        // The node only reads the config file with a `.json` extension.
        match mounted.get(C_CHAIN_CONFIG_FILE_ID) {
            Some(config) => {
                let config = config.display();
                args.push(format!("--config-file=\"{config}.json\""));
                vec![
                    "/bin/sh".to_owned(),
                    "-c".to_owned(),
                    format!("mv \"{config}\" \"{config}.json\" && {}", args.join(" ")),
                ]
            }
            None => args,
        }
    }
}

/// Files a node needs: the C lane config, plus its TLS pair when pinned.
#[must_use]
pub fn node_files(node: &NodeConfig) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    files.insert(
        C_CHAIN_CONFIG_FILE_ID.to_owned(),
        C_CHAIN_CONFIG_CONTENTS.as_bytes().to_vec(),
    );
    if let Some(credentials) = node.credentials() {
        files.insert(
            STAKING_TLS_CERT_FILE_ID.to_owned(),
            credentials.tls_cert.as_bytes().to_vec(),
        );
        files.insert(
            STAKING_TLS_KEY_FILE_ID.to_owned(),
            credentials.tls_key.as_bytes().to_vec(),
        );
    }
    files
}
