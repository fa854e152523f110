use std::time::Duration;

use testnet_env as tf_env;

pub const ACCEPTANCE_TIMEOUT_SECS: u64 = 30;
pub const EXPORT_ACCEPTANCE_TIMEOUT_SECS: u64 = 120;
pub const ACCEPTANCE_POLL_INTERVAL_SECS: u64 = 1;
pub const STARTUP_POLL_INTERVAL_SECS: u64 = 20;
pub const STARTUP_MAX_POLLS: u32 = 10;
pub const BOOTSTRAP_WAVE_POLL_INTERVAL_SECS: u64 = 15;
pub const BOOTSTRAP_WAVE_MAX_POLLS: u32 = 10;
pub const TERMINATION_GRACE_SECS: u64 = 30;
pub const STAKING_START_DELAY_SECS: u64 = 20;
pub const STAKING_START_GRACE_SECS: u64 = 3;

fn env_duration(key: &str, default: u64) -> Duration {
    Duration::from_secs(tf_env::secs_override(key).unwrap_or(default))
}

fn env_count(key: &str, default: u32) -> u32 {
    tf_env::secs_override(key)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(default)
}

pub fn acceptance_timeout() -> Duration {
    env_duration("TESTNET_ACCEPTANCE_TIMEOUT_SECS", ACCEPTANCE_TIMEOUT_SECS)
}

pub fn export_acceptance_timeout() -> Duration {
    env_duration(
        "TESTNET_EXPORT_ACCEPTANCE_TIMEOUT_SECS",
        EXPORT_ACCEPTANCE_TIMEOUT_SECS,
    )
}

pub fn acceptance_poll_interval() -> Duration {
    env_duration(
        "TESTNET_ACCEPTANCE_POLL_INTERVAL_SECS",
        ACCEPTANCE_POLL_INTERVAL_SECS,
    )
}

pub fn startup_poll_interval() -> Duration {
    env_duration("TESTNET_STARTUP_POLL_INTERVAL_SECS", STARTUP_POLL_INTERVAL_SECS)
}

pub fn startup_max_polls() -> u32 {
    env_count("TESTNET_STARTUP_MAX_POLLS", STARTUP_MAX_POLLS)
}

pub fn bootstrap_wave_poll_interval() -> Duration {
    env_duration(
        "TESTNET_BOOTSTRAP_WAVE_POLL_INTERVAL_SECS",
        BOOTSTRAP_WAVE_POLL_INTERVAL_SECS,
    )
}

pub fn bootstrap_wave_max_polls() -> u32 {
    env_count("TESTNET_BOOTSTRAP_WAVE_MAX_POLLS", BOOTSTRAP_WAVE_MAX_POLLS)
}

pub fn termination_grace() -> Duration {
    env_duration("TESTNET_TERMINATION_GRACE_SECS", TERMINATION_GRACE_SECS)
}

pub fn staking_start_delay() -> Duration {
    env_duration("TESTNET_STAKING_START_DELAY_SECS", STAKING_START_DELAY_SECS)
}

pub fn staking_start_grace() -> Duration {
    env_duration("TESTNET_STAKING_START_GRACE_SECS", STAKING_START_GRACE_SECS)
}
