use testnet_env as tf_env;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_LOG_LEVEL: &str = "info";

/// `RUST_LOG` wins; otherwise the node log level doubles as the filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(tf_env::testnet_log_level().unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()))
    });
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
