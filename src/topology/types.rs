//! Topology type definitions.
//!
//! Node identifiers, links and the role a node plays when its route
//! table is generated.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Serialize, Serializer};

use crate::ip::Subnet;

/// A vertex of the topology graph.
///
/// Routers are numbered 1..=N. A Layer-3 switch carries the id of the one
/// router it hangs off. Every router orders before every switch, which makes
/// the router the primary endpoint of its switch uplink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Router(u32),
    Switch(u32),
}

impl NodeId {
    /// Router id for routers, owning router id for switches
    pub fn router_id(&self) -> u32 {
        match self {
            Self::Router(id) | Self::Switch(id) => *id,
        }
    }

    pub fn is_router(&self) -> bool {
        matches!(self, Self::Router(_))
    }

    pub fn is_switch(&self) -> bool {
        matches!(self, Self::Switch(_))
    }

    /// Management address in the owning router's 192.168.<id>.0/24:
    /// .1 for the router, .3 for its switch
    pub fn admin_address(&self) -> Option<Ipv4Addr> {
        let network = Subnet::admin_for_router(self.router_id())?.network();
        let [a, b, c, _] = network.octets();
        let host = match self {
            Self::Router(_) => 1,
            Self::Switch(_) => 3,
        };
        Some(Ipv4Addr::new(a, b, c, host))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Router(id) => write!(f, "Router{}", id),
            Self::Switch(id) => write!(f, "Switch{}", id),
        }
    }
}

// Serialized as its display name so it can key maps in JSON output
impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How a node's route table is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeRole {
    /// Router whose VLANs terminate on the router itself
    PlainRouter,
    /// Router whose VLANs terminate on an attached Layer-3 switch
    RouterWithSwitch,
    /// Layer-3 switch with a single uplink to its router
    AttachedSwitch,
}

/// What a link connects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkKind {
    RouterToRouter,
    SwitchUplink,
}

/// A point-to-point link and its /30.
///
/// The lower node id is the primary endpoint and holds the first usable
/// host address; the other endpoint holds the last usable host address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Link {
    primary: NodeId,
    secondary: NodeId,
    subnet: Subnet,
}

impl Link {
    pub fn new(a: NodeId, b: NodeId, subnet: Subnet) -> Self {
        let (primary, secondary) = if a < b { (a, b) } else { (b, a) };
        Link {
            primary,
            secondary,
            subnet,
        }
    }

    pub fn primary(&self) -> NodeId {
        self.primary
    }

    pub fn secondary(&self) -> NodeId {
        self.secondary
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.primary, self.secondary)
    }

    pub fn subnet(&self) -> Subnet {
        self.subnet
    }

    pub fn kind(&self) -> LinkKind {
        if self.secondary.is_switch() {
            LinkKind::SwitchUplink
        } else {
            LinkKind::RouterToRouter
        }
    }

    pub fn involves(&self, node: NodeId) -> bool {
        self.primary == node || self.secondary == node
    }

    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.primary == a && self.secondary == b) || (self.primary == b && self.secondary == a)
    }

    /// The other endpoint, if `node` is on this link
    pub fn peer_of(&self, node: NodeId) -> Option<NodeId> {
        if node == self.primary {
            Some(self.secondary)
        } else if node == self.secondary {
            Some(self.primary)
        } else {
            None
        }
    }

    /// Host address `node` holds on this link
    pub fn address_of(&self, node: NodeId) -> Option<Ipv4Addr> {
        if node == self.primary {
            Some(self.subnet.first_host())
        } else if node == self.secondary {
            Some(self.subnet.last_host())
        } else {
            None
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.primary, self.secondary, self.subnet)
    }
}

/// One addressed interface of a node, as seen by the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub peer: NodeId,
    pub address: Ipv4Addr,
    pub subnet: Subnet,
}
