pub mod nodes;
pub mod topology;

pub use testnet_config::{IS_DEBUG_TRACING, adjust_timeout};
