use std::{net::Ipv4Addr, str::FromStr};

use thiserror::Error;

pub const DEFAULT_DOCKER_SUBNET: &str = "172.28.0.0/16";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubnetError {
    #[error("invalid subnet `{value}`: expected <ipv4>/<prefix>")]
    Invalid { value: String },
    #[error("prefix /{prefix} leaves no room for containers")]
    TooSmall { prefix: u8 },
    #[error("subnet {subnet} exhausted")]
    Exhausted { subnet: Subnet },
}

/// IPv4 subnet of the private docker network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subnet {
    base: Ipv4Addr,
    prefix: u8,
}

impl Subnet {
    #[must_use]
    pub fn from_env() -> Self {
        testnet_env::testnet_docker_subnet()
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(Self::default_subnet)
    }

    #[must_use]
    pub const fn default_subnet() -> Self {
        Self {
            base: Ipv4Addr::new(172, 28, 0, 0),
            prefix: 16,
        }
    }

    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    fn host_count(&self) -> u32 {
        (1u32 << (32 - u32::from(self.prefix))) - 2
    }

    /// Docker reserves `.1` for the bridge gateway.
    #[must_use]
    pub fn gateway(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.base) + 1)
    }
}

impl FromStr for Subnet {
    type Err = SubnetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || SubnetError::Invalid {
            value: value.to_owned(),
        };
        let (addr, prefix) = value.trim().split_once('/').ok_or_else(invalid)?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        if prefix > 30 {
            return Err(SubnetError::TooSmall { prefix });
        }
        let mask = u32::MAX << (32 - u32::from(prefix));
        Ok(Self {
            base: Ipv4Addr::from(u32::from(addr) & mask),
            prefix,
        })
    }
}

impl std::fmt::Display for Subnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

/// Hands out container addresses sequentially, starting after the gateway.
#[derive(Debug)]
pub struct IpAllocator {
    subnet: Subnet,
    next_offset: u32,
}

impl IpAllocator {
    #[must_use]
    pub const fn new(subnet: Subnet) -> Self {
        Self {
            subnet,
            next_offset: 2,
        }
    }

    #[must_use]
    pub const fn subnet(&self) -> Subnet {
        self.subnet
    }

    pub fn allocate(&mut self) -> Result<Ipv4Addr, SubnetError> {
        if self.next_offset > self.subnet.host_count() {
            return Err(SubnetError::Exhausted {
                subnet: self.subnet,
            });
        }
        let ip = Ipv4Addr::from(u32::from(self.subnet.base) + self.next_offset);
        self.next_offset += 1;
        Ok(ip)
    }
}
