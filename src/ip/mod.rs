//! IP address planning module.
//!
//! This module holds the subnet value type, the non-overlapping address
//! pool, the VLAN subnet catalog and the registry recording which router
//! owns which VLAN subnet.

pub mod subnet;
pub mod allocator;
pub mod registry;
pub mod catalog;

// Re-export commonly used types
pub use subnet::{Subnet, SubnetError, LINK_PREFIX};
pub use allocator::{AddressPool, FixedJumps, JumpSource, OccupiedRange, PoolError};
pub use registry::{AssignmentError, VlanAssignment, VlanRegistry};
pub use catalog::VlanCatalog;
