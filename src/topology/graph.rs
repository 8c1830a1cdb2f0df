//! Topology graph.
//!
//! Undirected graph of routers and Layer-3 switches. Each edge carries the
//! /30 its two endpoints are addressed from. Adjacency lists keep link
//! insertion order because path search breaks ties on that order.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use log::debug;

use super::types::{Interface, Link, LinkKind, NodeId, NodeRole};
use crate::ip::{Subnet, LINK_PREFIX};

/// Links a single node may terminate (one 4-port Ethernet module)
pub const MAX_LINKS_PER_NODE: usize = 4;

/// Router ids must fit the third octet of the administrative /24
pub const MAX_ROUTERS: u32 = 255;

/// Errors that can occur while editing the topology
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("{0} cannot be linked to itself")]
    SelfLink(NodeId),

    #[error("{0} and {1} are already linked")]
    DuplicateLink(NodeId, NodeId),

    #[error("{node} already has {limit} links")]
    LinkCapacityExceeded { node: NodeId, limit: usize },

    #[error("No link between {0} and {1}")]
    NoSuchLink(NodeId, NodeId),

    #[error("{0} is not part of this topology")]
    UnknownNode(NodeId),

    #[error("A Layer-3 switch can only be linked once, to its own router ({0} - {1})")]
    InvalidSwitchLink(NodeId, NodeId),

    #[error("Links must be addressed from a /30, got {0}")]
    InvalidLinkSubnet(Subnet),

    #[error("Invalid router count {0} (expected 1..=255)")]
    InvalidRouterCount(u32),
}

/// Routers, switches and the links between them
#[derive(Debug, Clone)]
pub struct TopologyGraph {
    router_count: u32,
    /// Neighbors per node, in link insertion order
    adjacency: BTreeMap<NodeId, Vec<NodeId>>,
    /// Links in insertion order
    links: Vec<Link>,
}

impl TopologyGraph {
    /// Create a graph holding routers 1..=router_count and no links
    pub fn new(router_count: u32) -> Result<Self, TopologyError> {
        if router_count == 0 || router_count > MAX_ROUTERS {
            return Err(TopologyError::InvalidRouterCount(router_count));
        }
        let adjacency = (1..=router_count)
            .map(|id| (NodeId::Router(id), Vec::new()))
            .collect();
        Ok(TopologyGraph {
            router_count,
            adjacency,
            links: Vec::new(),
        })
    }

    pub fn router_count(&self) -> u32 {
        self.router_count
    }

    /// Router nodes in id order
    pub fn routers(&self) -> impl Iterator<Item = NodeId> {
        (1..=self.router_count).map(NodeId::Router)
    }

    /// Attached switches in owning-router order
    pub fn switches(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied().filter(NodeId::is_switch)
    }

    /// Every node: routers first, then switches
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn has_switch(&self, router: u32) -> bool {
        self.contains(NodeId::Switch(router))
    }

    pub fn role(&self, node: NodeId) -> Option<NodeRole> {
        if !self.contains(node) {
            return None;
        }
        Some(match node {
            NodeId::Switch(_) => NodeRole::AttachedSwitch,
            NodeId::Router(id) if self.has_switch(id) => NodeRole::RouterWithSwitch,
            NodeId::Router(_) => NodeRole::PlainRouter,
        })
    }

    /// Link two nodes over `subnet`.
    ///
    /// Rejected edits leave the graph untouched.
    pub fn add_link(&mut self, a: NodeId, b: NodeId, subnet: Subnet) -> Result<(), TopologyError> {
        if a == b {
            return Err(TopologyError::SelfLink(a));
        }
        self.check_endpoint(a, b)?;
        self.check_endpoint(b, a)?;
        if self.link_between(a, b).is_some() {
            return Err(TopologyError::DuplicateLink(a, b));
        }
        for node in [a, b] {
            if self.degree(node) >= MAX_LINKS_PER_NODE {
                return Err(TopologyError::LinkCapacityExceeded {
                    node,
                    limit: MAX_LINKS_PER_NODE,
                });
            }
        }
        if subnet.prefix() != LINK_PREFIX {
            return Err(TopologyError::InvalidLinkSubnet(subnet));
        }

        self.adjacency.entry(a).or_default().push(b);
        self.adjacency.entry(b).or_default().push(a);
        let link = Link::new(a, b, subnet);
        debug!("Added link {}", link);
        self.links.push(link);
        Ok(())
    }

    /// Attach a Layer-3 switch to `router` over `subnet` and return the switch node
    pub fn attach_switch(&mut self, router: u32, subnet: Subnet) -> Result<NodeId, TopologyError> {
        let switch = NodeId::Switch(router);
        self.add_link(NodeId::Router(router), switch, subnet)?;
        Ok(switch)
    }

    /// Remove the link between `a` and `b` and hand back its subnet.
    ///
    /// The subnet is not returned to any address pool; that is up to the caller.
    /// A switch that loses its uplink leaves the graph.
    pub fn remove_link(&mut self, a: NodeId, b: NodeId) -> Result<Subnet, TopologyError> {
        let idx = self
            .links
            .iter()
            .position(|link| link.connects(a, b))
            .ok_or(TopologyError::NoSuchLink(a, b))?;
        let link = self.links.remove(idx);

        for (node, peer) in [(a, b), (b, a)] {
            if let Some(neighbors) = self.adjacency.get_mut(&node) {
                neighbors.retain(|n| *n != peer);
            }
            if node.is_switch() {
                self.adjacency.remove(&node);
            }
        }
        debug!("Removed link {}", link);
        Ok(link.subnet())
    }

    /// Neighbors of `node` in link insertion order
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    pub fn link_between(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        self.links.iter().find(|link| link.connects(a, b))
    }

    /// All links in insertion order
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Router-to-router links in insertion order
    pub fn router_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|link| link.kind() == LinkKind::RouterToRouter)
    }

    /// Switch uplinks in insertion order
    pub fn switch_uplinks(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|link| link.kind() == LinkKind::SwitchUplink)
    }

    /// Address `node` holds on its link to `peer`
    pub fn address_of(&self, node: NodeId, peer: NodeId) -> Option<Ipv4Addr> {
        self.link_between(node, peer).and_then(|link| link.address_of(node))
    }

    /// Addressed interfaces of `node`, in adjacency order
    pub fn interfaces(&self, node: NodeId) -> Vec<Interface> {
        self.neighbors(node)
            .iter()
            .filter_map(|peer| {
                let link = self.link_between(node, *peer)?;
                Some(Interface {
                    peer: *peer,
                    address: link.address_of(node)?,
                    subnet: link.subnet(),
                })
            })
            .collect()
    }

    fn is_known_router(&self, id: u32) -> bool {
        (1..=self.router_count).contains(&id)
    }

    /// Validate `node` as an endpoint of a new link towards `peer`
    fn check_endpoint(&self, node: NodeId, peer: NodeId) -> Result<(), TopologyError> {
        match node {
            NodeId::Router(id) if !self.is_known_router(id) => Err(TopologyError::UnknownNode(node)),
            NodeId::Router(_) => Ok(()),
            NodeId::Switch(owner) => {
                if !self.is_known_router(owner) {
                    return Err(TopologyError::UnknownNode(node));
                }
                if peer != NodeId::Router(owner) {
                    return Err(TopologyError::InvalidSwitchLink(node, peer));
                }
                Ok(())
            }
        }
    }
}
