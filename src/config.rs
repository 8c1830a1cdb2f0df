use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::Ipv4Addr;

use crate::ip::registry::{MAX_VLAN_ID, MIN_VLAN_ID};
use crate::ip::subnet::{MAX_PREFIX, MIN_PREFIX};
use crate::topology::MAX_ROUTERS;
use crate::utils::ip_utils::parse_ipv4;

/// Planning input: address space, routers, VLANs and links
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Base of the address space every block is carved from
    pub base_address: String,
    /// Number of routers, numbered 1..=routers
    pub routers: u32,
    /// Seed for randomized allocation; fresh entropy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Spread link /30s instead of packing them (VLANs are always spread)
    #[serde(default)]
    pub randomize_links: bool,
    /// Size of the /30 pool; defaults to routers * 2 + switches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_subnets: Option<usize>,
    #[serde(default)]
    pub vlans: Vec<VlanSpec>,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    /// Router pairs, in registration order
    #[serde(default)]
    pub links: Vec<[u32; 2]>,
}

/// Subnets reserved up front for one VLAN id
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VlanSpec {
    pub id: u16,
    pub prefix: u8,
    pub count: usize,
}

/// Per-router settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NodeConfig {
    pub router: u32,
    /// VLAN ids this router claims a subnet for
    #[serde(default)]
    pub vlans: Vec<u16>,
    /// Terminate this router's VLANs on an attached Layer-3 switch
    #[serde(default)]
    pub l3_switch: bool,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.base_address()?;

        if self.routers == 0 || self.routers > MAX_ROUTERS {
            return Err(ValidationError::InvalidRouters(format!(
                "router count must be between 1 and {}, got {}",
                MAX_ROUTERS, self.routers
            )));
        }

        let mut catalog_ids = HashSet::new();
        for vlan in &self.vlans {
            if !(MIN_VLAN_ID..=MAX_VLAN_ID).contains(&vlan.id) {
                return Err(ValidationError::InvalidVlan(format!(
                    "VLAN id {} is outside {}..={}",
                    vlan.id, MIN_VLAN_ID, MAX_VLAN_ID
                )));
            }
            if !(MIN_PREFIX..=MAX_PREFIX).contains(&vlan.prefix) {
                return Err(ValidationError::InvalidVlan(format!(
                    "VLAN {} prefix /{} is outside /{}../{}",
                    vlan.id, vlan.prefix, MIN_PREFIX, MAX_PREFIX
                )));
            }
            if vlan.count == 0 {
                return Err(ValidationError::InvalidVlan(format!(
                    "VLAN {} must reserve at least one subnet",
                    vlan.id
                )));
            }
            if !catalog_ids.insert(vlan.id) {
                return Err(ValidationError::InvalidVlan(format!("VLAN {} is listed twice", vlan.id)));
            }
        }

        let mut seen_routers = HashSet::new();
        for node in &self.nodes {
            self.check_router(node.router, "node entry")?;
            if !seen_routers.insert(node.router) {
                return Err(ValidationError::InvalidRouters(format!(
                    "router {} has more than one node entry",
                    node.router
                )));
            }
            for vlan in &node.vlans {
                if !catalog_ids.contains(vlan) {
                    return Err(ValidationError::InvalidVlan(format!(
                        "router {} claims VLAN {} which has no reserved subnets",
                        node.router, vlan
                    )));
                }
            }
        }

        for [a, b] in &self.links {
            self.check_router(*a, "link")?;
            self.check_router(*b, "link")?;
        }

        Ok(())
    }

    fn check_router(&self, router: u32, context: &str) -> Result<(), ValidationError> {
        if router == 0 || router > self.routers {
            return Err(ValidationError::InvalidLink(format!(
                "{} names router {} but only routers 1..={} exist",
                context, router, self.routers
            )));
        }
        Ok(())
    }

    /// Parsed base address
    pub fn base_address(&self) -> Result<Ipv4Addr, ValidationError> {
        parse_ipv4(&self.base_address).map_err(ValidationError::InvalidAddressing)
    }

    /// Settings of a router, if it has a node entry
    pub fn node(&self, router: u32) -> Option<&NodeConfig> {
        self.nodes.iter().find(|node| node.router == router)
    }

    pub fn has_switch(&self, router: u32) -> bool {
        self.node(router).map_or(false, |node| node.l3_switch)
    }

    pub fn switch_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.l3_switch).count()
    }

    /// Number of /30 blocks reserved for links and switch uplinks
    pub fn link_pool_size(&self) -> usize {
        self.link_subnets
            .unwrap_or(self.routers as usize * 2 + self.switch_count())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid addressing configuration: {0}")]
    InvalidAddressing(String),
    #[error("Invalid router configuration: {0}")]
    InvalidRouters(String),
    #[error("Invalid VLAN configuration: {0}")]
    InvalidVlan(String),
    #[error("Invalid link configuration: {0}")]
    InvalidLink(String),
}
