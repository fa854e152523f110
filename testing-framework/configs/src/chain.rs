use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::LOCAL_NETWORK_ID;

/// One of the three independent ledger subsystems of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lane {
    /// Platform lane: staking, validators, delegation.
    P,
    /// Exchange lane: native asset transfers.
    X,
    /// Contract lane: EVM compatible, streaming RPC.
    C,
}

impl Lane {
    pub const ALL: [Self; 3] = [Self::P, Self::X, Self::C];

    /// Alias the node uses for this lane in API paths and status queries.
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::P => "P",
            Self::X => "X",
            Self::C => "C",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// Identifiers of the lanes and the native asset of one network.
///
/// Built once when a run starts and handed to whoever needs to address a lane
/// by id instead of alias.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainIds {
    pub network_id: u32,
    pub x_chain_id: String,
    pub p_chain_id: String,
    pub c_chain_id: String,
    pub native_asset_id: String,
    pub native_asset_alias: String,
}

impl ChainIds {
    /// Identifiers of the local network preset.
    #[must_use]
    pub fn local() -> Self {
        Self {
            network_id: LOCAL_NETWORK_ID,
            x_chain_id: "2eNy1mUFdmaxXNj1eQHUe7Np4gju9sJsEtWQ4MX3ToiNKuADed".to_owned(),
            p_chain_id: "11111111111111111111111111111111LpoYY".to_owned(),
            c_chain_id: "WKNkfmNxgqpKPe9Q12UCoTuGYXX5JbQn2tf2WTpNTJeQrezqa".to_owned(),
            native_asset_id: "2fombhL7aGPwj3KH4bfrmJwW6PVnMobf9Y2fn9GwxiAAJyFDbe".to_owned(),
            native_asset_alias: "AVAX".to_owned(),
        }
    }

    #[must_use]
    pub fn chain_id(&self, lane: Lane) -> &str {
        match lane {
            Lane::P => &self.p_chain_id,
            Lane::X => &self.x_chain_id,
            Lane::C => &self.c_chain_id,
        }
    }
}

impl Default for ChainIds {
    fn default() -> Self {
        Self::local()
    }
}

/// Re-target a bech32 address at another lane by swapping its lane prefix
/// (`X-local1...` -> `C-local1...`).
#[must_use]
pub fn address_on_lane(address: &str, lane: Lane) -> String {
    match address.split_once('-') {
        Some((_, rest)) => format!("{lane}-{rest}"),
        None => format!("{lane}-{address}"),
    }
}
