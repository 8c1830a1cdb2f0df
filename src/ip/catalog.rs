//! VLAN subnet catalog.
//!
//! Before routers are configured, every VLAN id gets a batch of candidate
//! subnets carved from the pool. Routers then claim a VLAN id and receive
//! the first subnet of that batch nobody holds yet.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::Serialize;

use super::allocator::{AddressPool, JumpSource, PoolError};
use super::registry::VlanRegistry;
use super::subnet::Subnet;

/// Pre-allocated subnets per VLAN id
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct VlanCatalog {
    entries: BTreeMap<u16, Vec<Subnet>>,
}

impl VlanCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `count` randomized subnets of `prefix` for `vlan`.
    ///
    /// Stops at the first exhausted request and keeps what was allocated so far;
    /// the error is returned so the caller can report the shortfall.
    pub fn reserve<J: JumpSource + ?Sized>(
        &mut self,
        pool: &mut AddressPool,
        vlan: u16,
        prefix: u8,
        count: usize,
        jumps: &mut J,
    ) -> Result<usize, PoolError> {
        let batch = self.entries.entry(vlan).or_default();
        for allocated in 0..count {
            match pool.allocate_randomized(prefix, jumps) {
                Ok(subnet) => {
                    debug!("VLAN {} candidate {}: {}", vlan, allocated + 1, subnet);
                    batch.push(subnet);
                }
                Err(e) => {
                    warn!("Only {} of {} subnets reserved for VLAN {}: {}", allocated, count, vlan, e);
                    return Err(e);
                }
            }
        }
        Ok(count)
    }

    /// Candidate subnets of a VLAN, in allocation order
    pub fn candidates(&self, vlan: u16) -> &[Subnet] {
        self.entries.get(&vlan).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_vlan(&self, vlan: u16) -> bool {
        self.entries.contains_key(&vlan)
    }

    pub fn vlan_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.keys().copied()
    }

    /// First candidate of `vlan` not yet assigned in `registry`
    pub fn next_free(&self, vlan: u16, registry: &VlanRegistry) -> Option<Subnet> {
        self.candidates(vlan)
            .iter()
            .find(|subnet| !registry.is_assigned(subnet))
            .copied()
    }
}
