//! VLAN subnet registry.
//!
//! Tracks which VLAN subnet is assigned to which router so a subnet is
//! never handed to two routers. When a router has a Layer-3 switch the
//! switch terminates these VLANs, but the assignment stays keyed by the
//! owning router.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::subnet::Subnet;

/// Lowest usable VLAN id (VLAN 1 is the administrative VLAN)
pub const MIN_VLAN_ID: u16 = 2;
/// Highest usable 802.1Q VLAN id
pub const MAX_VLAN_ID: u16 = 4094;

/// Errors that can occur while assigning VLAN subnets
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("Invalid VLAN id {0} (expected 2..=4094)")]
    InvalidVlanId(u16),

    #[error("VLAN {vlan} is already assigned on router {router}")]
    DuplicateVlan { router: u32, vlan: u16 },

    #[error("Subnet {subnet} is already assigned to router {owner}")]
    SubnetAlreadyAssigned { subnet: Subnet, owner: u32 },
}

/// One VLAN subnet assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VlanAssignment {
    pub router: u32,
    pub vlan: u16,
    pub subnet: Subnet,
}

/// Registry of VLAN subnets per router
#[derive(Debug, Clone, Default)]
pub struct VlanRegistry {
    by_router: BTreeMap<u32, BTreeMap<u16, Subnet>>,
    /// Subnet -> owning router, for uniqueness checks
    owners: HashMap<Subnet, u32>,
}

impl VlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `subnet` to `vlan` on `router`.
    ///
    /// Fails without changing the registry if the VLAN id is out of range,
    /// the router already carries that VLAN, or the subnet belongs to any router.
    pub fn assign(&mut self, router: u32, vlan: u16, subnet: Subnet) -> Result<(), AssignmentError> {
        if !(MIN_VLAN_ID..=MAX_VLAN_ID).contains(&vlan) {
            return Err(AssignmentError::InvalidVlanId(vlan));
        }
        if let Some(&owner) = self.owners.get(&subnet) {
            return Err(AssignmentError::SubnetAlreadyAssigned { subnet, owner });
        }
        if self.vlan_subnet(router, vlan).is_some() {
            return Err(AssignmentError::DuplicateVlan { router, vlan });
        }

        self.by_router.entry(router).or_default().insert(vlan, subnet);
        self.owners.insert(subnet, router);
        Ok(())
    }

    /// Check if a subnet is already assigned anywhere
    pub fn is_assigned(&self, subnet: &Subnet) -> bool {
        self.owners.contains_key(subnet)
    }

    /// Get the router that owns a given subnet
    pub fn owner_of(&self, subnet: &Subnet) -> Option<u32> {
        self.owners.get(subnet).copied()
    }

    pub fn vlan_subnet(&self, router: u32, vlan: u16) -> Option<Subnet> {
        self.by_router.get(&router).and_then(|vlans| vlans.get(&vlan)).copied()
    }

    /// VLANs of a router in ascending VLAN id order
    pub fn vlans_of(&self, router: u32) -> impl Iterator<Item = (u16, Subnet)> + '_ {
        self.by_router
            .get(&router)
            .into_iter()
            .flat_map(|vlans| vlans.iter().map(|(vlan, subnet)| (*vlan, *subnet)))
    }

    /// Every assignment, ordered by router then VLAN id
    pub fn assignments(&self) -> Vec<VlanAssignment> {
        self.by_router
            .iter()
            .flat_map(|(router, vlans)| {
                vlans.iter().map(move |(vlan, subnet)| VlanAssignment {
                    router: *router,
                    vlan: *vlan,
                    subnet: *subnet,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(s: &str) -> Subnet {
        s.parse().unwrap()
    }

    #[test]
    fn test_assign_and_lookup() {
        let mut registry = VlanRegistry::new();
        registry.assign(1, 20, subnet("10.0.2.0/24")).unwrap();
        registry.assign(1, 10, subnet("10.0.1.0/24")).unwrap();
        registry.assign(2, 10, subnet("10.0.3.0/24")).unwrap();

        let vlans: Vec<_> = registry.vlans_of(1).collect();
        assert_eq!(vlans, vec![(10, subnet("10.0.1.0/24")), (20, subnet("10.0.2.0/24"))]);
        assert_eq!(registry.owner_of(&subnet("10.0.3.0/24")), Some(2));
        assert_eq!(registry.vlans_of(9).count(), 0);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_subnet_assigned_once() {
        let mut registry = VlanRegistry::new();
        registry.assign(1, 10, subnet("10.0.1.0/24")).unwrap();
        assert_eq!(
            registry.assign(2, 10, subnet("10.0.1.0/24")),
            Err(AssignmentError::SubnetAlreadyAssigned { subnet: subnet("10.0.1.0/24"), owner: 1 })
        );
        assert!(registry.vlans_of(2).next().is_none());
    }

    #[test]
    fn test_vlan_id_rules() {
        let mut registry = VlanRegistry::new();
        assert_eq!(registry.assign(1, 1, subnet("10.0.1.0/24")), Err(AssignmentError::InvalidVlanId(1)));
        assert_eq!(registry.assign(1, 4095, subnet("10.0.1.0/24")), Err(AssignmentError::InvalidVlanId(4095)));
        registry.assign(1, 2, subnet("10.0.1.0/24")).unwrap();
        assert_eq!(
            registry.assign(1, 2, subnet("10.0.2.0/24")),
            Err(AssignmentError::DuplicateVlan { router: 1, vlan: 2 })
        );
        assert!(!registry.is_assigned(&subnet("10.0.2.0/24")));
    }

    #[test]
    fn test_assignments_listing() {
        let mut registry = VlanRegistry::new();
        registry.assign(3, 5, subnet("10.0.5.0/24")).unwrap();
        registry.assign(1, 7, subnet("10.0.7.0/25")).unwrap();
        let all = registry.assignments();
        assert_eq!(all[0].router, 1);
        assert_eq!(all[1].router, 3);
        assert_eq!(all[1].subnet.to_string(), "10.0.5.0/24");
    }
}
