use std::{env, path::PathBuf};

#[must_use]
pub fn slow_test_env() -> bool {
    env::var("SLOW_TEST_ENV").is_ok_and(|s| s == "true")
}

#[must_use]
pub fn debug_tracing() -> bool {
    env::var("TESTNET_TESTS_TRACING").is_ok_and(|val| val.eq_ignore_ascii_case("true"))
}

#[must_use]
pub fn rust_log() -> Option<String> {
    env::var("RUST_LOG").ok()
}

/// Log level handed to every launched node and used as the default tracing
/// filter of the runner binaries.
#[must_use]
pub fn testnet_log_level() -> Option<String> {
    env::var("TESTNET_LOG_LEVEL").ok()
}

#[must_use]
pub fn testnet_node_image() -> Option<String> {
    env::var("TESTNET_NODE_IMAGE").ok()
}

/// Directory holding `staker<N>.crt` / `staker<N>.key` for the genesis stakers.
#[must_use]
pub fn testnet_staker_certs_dir() -> Option<PathBuf> {
    env::var("TESTNET_STAKER_CERTS_DIR").ok().map(PathBuf::from)
}

#[must_use]
pub fn testnet_docker_network() -> Option<String> {
    env::var("TESTNET_DOCKER_NETWORK").ok()
}

#[must_use]
pub fn testnet_docker_subnet() -> Option<String> {
    env::var("TESTNET_DOCKER_SUBNET").ok()
}

#[must_use]
pub fn testnet_runner_preserve() -> bool {
    env::var("TESTNET_RUNNER_PRESERVE").is_ok()
}

#[must_use]
pub fn testnet_network_manifest() -> Option<PathBuf> {
    env::var("TESTNET_NETWORK_MANIFEST").ok().map(PathBuf::from)
}

#[must_use]
pub fn secs_override(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse::<u64>().ok())
}
