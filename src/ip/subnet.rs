//! Subnet value type.
//!
//! A subnet wraps an [`ipnet::Ipv4Net`] that is always truncated to its
//! network address and limited to prefix lengths with usable hosts.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Smallest prefix length a subnet may carry
pub const MIN_PREFIX: u8 = 1;
/// Largest prefix length a subnet may carry (a /30 is the smallest block with two usable hosts)
pub const MAX_PREFIX: u8 = 30;

/// Prefix length used for every point-to-point link
pub const LINK_PREFIX: u8 = 30;

/// Errors raised when building a subnet
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubnetError {
    #[error("Invalid prefix length /{0} (expected 1..=30)")]
    InvalidPrefixLength(u8),

    #[error("Invalid subnet notation '{0}'")]
    InvalidNotation(String),
}

/// An IPv4 network in CIDR form.
///
/// Unlike a bare [`Ipv4Net`], the address never carries host bits and the
/// prefix length always leaves at least two usable hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subnet(Ipv4Net);

impl Subnet {
    /// Build a subnet from any address inside it; host bits are cleared.
    pub fn new(address: Ipv4Addr, prefix: u8) -> Result<Self, SubnetError> {
        if !(MIN_PREFIX..=MAX_PREFIX).contains(&prefix) {
            return Err(SubnetError::InvalidPrefixLength(prefix));
        }
        let net = Ipv4Net::new(address, prefix).map_err(|_| SubnetError::InvalidPrefixLength(prefix))?;
        Ok(Self(net.trunc()))
    }

    /// The administrative /24 of a router: 192.168.<router>.0/24.
    /// Only ids that fit in one octet have one.
    pub fn admin_for_router(router: u32) -> Option<Self> {
        let octet = u8::try_from(router).ok()?;
        Self::new(Ipv4Addr::new(192, 168, octet, 0), 24).ok()
    }

    pub fn network(&self) -> Ipv4Addr {
        self.0.network()
    }

    pub fn prefix(&self) -> u8 {
        self.0.prefix_len()
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        self.0.broadcast()
    }

    pub fn netmask(&self) -> Ipv4Addr {
        self.0.netmask()
    }

    pub fn wildcard(&self) -> Ipv4Addr {
        self.0.hostmask()
    }

    /// Number of addresses in the block, network and broadcast included
    pub fn size(&self) -> u64 {
        u64::from(u32::from(self.0.hostmask())) + 1
    }

    /// Inclusive integer range covered by the block
    pub fn range(&self) -> (u32, u32) {
        (u32::from(self.0.network()), u32::from(self.0.broadcast()))
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        self.0.contains(&address)
    }

    /// Aligned blocks overlap only when one holds the other
    pub fn overlaps(&self, other: &Subnet) -> bool {
        self.0.contains(&other.0) || other.0.contains(&self.0)
    }

    /// Lowest usable host address
    pub fn first_host(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.0.network()) + 1)
    }

    /// Highest usable host address
    pub fn last_host(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.0.broadcast()) - 1)
    }

    /// Usable host addresses in ascending order
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        self.0.hosts()
    }

    pub fn as_net(&self) -> Ipv4Net {
        self.0
    }
}

impl From<Subnet> for Ipv4Net {
    fn from(subnet: Subnet) -> Self {
        subnet.0
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Subnet {
    type Err = SubnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let net: Ipv4Net = s
            .trim()
            .parse()
            .map_err(|_| SubnetError::InvalidNotation(s.to_string()))?;
        Subnet::new(net.addr(), net.prefix_len())
    }
}

impl Serialize for Subnet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Subnet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
