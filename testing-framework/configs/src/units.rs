//! Denominations of the native asset. Every amount in the workspace is
//! expressed in the smallest unit.

pub const NANO: u64 = 1;
pub const MICRO: u64 = 1_000 * NANO;
pub const MILLI: u64 = 1_000 * MICRO;
pub const UNIT: u64 = 1_000 * MILLI;
pub const KILO_UNIT: u64 = 1_000 * UNIT;
pub const MEGA_UNIT: u64 = 1_000 * KILO_UNIT;

/// Fee charged by the local network for every transaction.
pub const DEFAULT_TX_FEE: u64 = UNIT;
