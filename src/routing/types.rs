//! Route and plan types produced by the planner.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::ip::Subnet;
use crate::topology::NodeId;

/// One static route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub destination: Subnet,
    pub next_hop: Ipv4Addr,
    pub description: String,
}

impl RouteEntry {
    pub fn new(destination: Subnet, next_hop: Ipv4Addr, description: impl Into<String>) -> Self {
        RouteEntry {
            destination,
            next_hop,
            description: description.into(),
        }
    }
}

/// Renders as `destination-network destination-mask next-hop`
impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.destination.network(),
            self.destination.netmask(),
            self.next_hop
        )
    }
}

/// A destination a node had no path to; its routes were left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreachableDestination {
    pub from: NodeId,
    pub toward: NodeId,
    /// What was left out, e.g. "networks of Router4"
    pub omitted: String,
}

/// Per-node static route tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingPlan {
    pub routes: BTreeMap<NodeId, Vec<RouteEntry>>,
    pub unreachable: Vec<UnreachableDestination>,
}

impl RoutingPlan {
    /// Routes of a node in generation order (empty for unknown nodes)
    pub fn routes_for(&self, node: NodeId) -> &[RouteEntry] {
        self.routes.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First route of `node` towards `destination`
    pub fn route_to(&self, node: NodeId, destination: &Subnet) -> Option<&RouteEntry> {
        self.routes_for(node).iter().find(|route| route.destination == *destination)
    }

    /// Distinct next hops used by a node
    pub fn next_hops(&self, node: NodeId) -> BTreeSet<Ipv4Addr> {
        self.routes_for(node).iter().map(|route| route.next_hop).collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.routes.keys().copied()
    }

    pub fn route_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// True when no destination had to be skipped
    pub fn is_complete(&self) -> bool {
        self.unreachable.is_empty()
    }
}
