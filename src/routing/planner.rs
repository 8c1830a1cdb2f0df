//! Static route synthesis.
//!
//! Every node gets a route table built from breadth-first shortest paths
//! over the finished topology. Routers resolve a next hop per destination;
//! a Layer-3 switch has a single uplink and sends everything to its router.
//! Tables are generated in parallel over the read-only graph and VLAN
//! assignments, then gathered in node order.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use rayon::prelude::*;

use super::path::shortest_path;
use super::types::{RouteEntry, RoutingPlan, UnreachableDestination};
use crate::ip::{Subnet, VlanRegistry};
use crate::topology::{Link, NodeId, NodeRole, TopologyGraph};

/// Route table of one node plus whatever had to be left out of it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRoutes {
    pub routes: Vec<RouteEntry>,
    pub unreachable: Vec<UnreachableDestination>,
}

/// First step towards a target
#[derive(Debug, Clone, Copy)]
struct Hop {
    /// Links on the shortest path
    distance: usize,
    next_hop: Ipv4Addr,
}

/// Builds route tables from a topology and its VLAN assignments
pub struct RoutingPlanner<'a> {
    graph: &'a TopologyGraph,
    vlans: &'a VlanRegistry,
}

impl<'a> RoutingPlanner<'a> {
    pub fn new(graph: &'a TopologyGraph, vlans: &'a VlanRegistry) -> Self {
        RoutingPlanner { graph, vlans }
    }

    /// Compute the route table of every node.
    ///
    /// Unreachable destinations never abort the run; they are logged and
    /// listed in the returned plan.
    pub fn compute(&self) -> RoutingPlan {
        let nodes: Vec<NodeId> = self.graph.nodes().collect();

        let tables: Vec<(NodeId, NodeRoutes)> = nodes
            .par_iter()
            .filter_map(|&node| self.routes_for(node).map(|table| (node, table)))
            .collect();

        let mut plan = RoutingPlan::default();
        for (node, table) in tables {
            log::info!(
                "{}: {} routes, {} destinations skipped",
                node,
                table.routes.len(),
                table.unreachable.len()
            );
            plan.routes.insert(node, table.routes);
            plan.unreachable.extend(table.unreachable);
        }
        plan
    }

    /// Route table of a single node, `None` if the node is not in the graph
    pub fn routes_for(&self, node: NodeId) -> Option<NodeRoutes> {
        let mut table = TableBuilder::new(self, node);
        match self.graph.role(node)? {
            NodeRole::PlainRouter => table.router_routes(),
            NodeRole::RouterWithSwitch => {
                table.router_routes();
                table.own_switch_routes();
            }
            NodeRole::AttachedSwitch => table.switch_routes(),
        }
        Some(table.finish())
    }
}

/// Per-node working state; shortest paths are cached per target
struct TableBuilder<'p, 'a> {
    planner: &'p RoutingPlanner<'a>,
    origin: NodeId,
    hops: HashMap<NodeId, Option<Hop>>,
    out: NodeRoutes,
}

impl<'p, 'a> TableBuilder<'p, 'a> {
    fn new(planner: &'p RoutingPlanner<'a>, origin: NodeId) -> Self {
        TableBuilder {
            planner,
            origin,
            hops: HashMap::new(),
            out: NodeRoutes::default(),
        }
    }

    fn finish(self) -> NodeRoutes {
        self.out
    }

    fn graph(&self) -> &'a TopologyGraph {
        self.planner.graph
    }

    fn hop_toward(&mut self, target: NodeId) -> Option<Hop> {
        if let Some(cached) = self.hops.get(&target) {
            return *cached;
        }
        let graph = self.graph();
        let hop = shortest_path(graph, self.origin, target)
            .filter(|path| path.len() >= 2)
            .and_then(|path| {
                // Address the second node holds on the link back to us
                let next_hop = graph.address_of(path[1], path[0])?;
                Some(Hop {
                    distance: path.len() - 1,
                    next_hop,
                })
            });
        self.hops.insert(target, hop);
        hop
    }

    fn push(&mut self, destination: Subnet, next_hop: Ipv4Addr, description: String) {
        self.out.routes.push(RouteEntry::new(destination, next_hop, description));
    }

    fn skip(&mut self, toward: NodeId, omitted: String) {
        log::warn!("{}: no path to {}, omitting {}", self.origin, toward, omitted);
        self.out.unreachable.push(UnreachableDestination {
            from: self.origin,
            toward,
            omitted,
        });
    }

    /// Admin, VLAN and switch admin networks of router `id`, all via `next_hop`
    fn router_networks(&mut self, id: u32, next_hop: Ipv4Addr) {
        if let Some(admin) = Subnet::admin_for_router(id) {
            self.push(admin, next_hop, format!("Admin network of Router{}", id));
        }
        let vlans: Vec<(u16, Subnet)> = self.planner.vlans.vlans_of(id).collect();
        for (vlan, subnet) in vlans {
            self.push(subnet, next_hop, format!("VLAN {} of Router{}", vlan, id));
        }
        if self.graph().has_switch(id) {
            if let Some(admin) = Subnet::admin_for_router(id) {
                self.push(admin, next_hop, format!("Admin network of Switch{}", id));
            }
        }
    }

    fn router_routes(&mut self) {
        let graph = self.graph();
        let origin = self.origin;
        let own_id = origin.router_id();

        for dest in graph.routers().filter(|d| *d != origin) {
            match self.hop_toward(dest) {
                Some(hop) => self.router_networks(dest.router_id(), hop.next_hop),
                None => self.skip(dest, format!("networks of {}", dest)),
            }
        }

        // Router links we are not on, via whichever end is closer
        for link in graph.router_links().filter(|l| !l.involves(origin)) {
            match self.closer_end(link) {
                Some(hop) => self.push(link.subnet(), hop.next_hop, link_description(link)),
                None => self.skip(link.primary(), format!("link {}", link.subnet())),
            }
        }

        for uplink in graph.switch_uplinks() {
            let owner = uplink.primary();
            if owner.router_id() == own_id {
                continue;
            }
            match self.hop_toward(owner) {
                Some(hop) => self.push(
                    uplink.subnet(),
                    hop.next_hop,
                    format!("Uplink of Switch{}", owner.router_id()),
                ),
                None => self.skip(owner, format!("uplink {}", uplink.subnet())),
            }
        }
    }

    /// Primary end is examined first and wins ties
    fn closer_end(&mut self, link: &Link) -> Option<Hop> {
        let primary = self.hop_toward(link.primary());
        let secondary = self.hop_toward(link.secondary());
        match (primary, secondary) {
            (Some(p), Some(s)) if s.distance < p.distance => Some(s),
            (Some(p), _) => Some(p),
            (None, s) => s,
        }
    }

    /// VLANs of a router that terminate on its own switch
    fn own_switch_routes(&mut self) {
        let id = self.origin.router_id();
        let switch = NodeId::Switch(id);
        let Some(next_hop) = self.graph().address_of(switch, self.origin) else {
            self.skip(switch, "own VLANs".to_string());
            return;
        };
        let vlans: Vec<(u16, Subnet)> = self.planner.vlans.vlans_of(id).collect();
        for (vlan, subnet) in vlans {
            self.push(subnet, next_hop, format!("Own VLAN {} via Switch{}", vlan, id));
        }
    }

    /// Everything a switch does not terminate goes to its router
    fn switch_routes(&mut self) {
        let graph = self.graph();
        let origin = self.origin;
        let owner = NodeId::Router(origin.router_id());
        let Some(next_hop) = graph.address_of(owner, origin) else {
            self.skip(owner, "all routes".to_string());
            return;
        };

        for dest in graph.routers().filter(|d| *d != owner) {
            self.router_networks(dest.router_id(), next_hop);
        }
        for link in graph.router_links() {
            self.push(link.subnet(), next_hop, link_description(link));
        }
        for uplink in graph.switch_uplinks().filter(|l| !l.involves(origin)) {
            let other = uplink.primary().router_id();
            self.push(uplink.subnet(), next_hop, format!("Uplink of Switch{}", other));
        }
    }
}

fn link_description(link: &Link) -> String {
    format!("Link {} - {}", link.primary(), link.secondary())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(id: u32) -> NodeId {
        NodeId::Router(id)
    }

    fn subnet(s: &str) -> Subnet {
        s.parse().unwrap()
    }

    fn addr(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    /// 10.1.0.(4n)/30
    fn link_net(n: u32) -> Subnet {
        Subnet::new(Ipv4Addr::from(0x0A01_0000 + n * 4), 30).unwrap()
    }

    fn graph_with(routers: u32, links: &[(u32, u32)]) -> TopologyGraph {
        let mut graph = TopologyGraph::new(routers).unwrap();
        for (i, (a, b)) in links.iter().enumerate() {
            graph.add_link(r(*a), r(*b), link_net(i as u32 + 1)).unwrap();
        }
        graph
    }

    #[test]
    fn test_full_mesh_routes_direct() {
        let graph = graph_with(3, &[(1, 2), (2, 3), (1, 3)]);
        let mut vlans = VlanRegistry::new();
        vlans.assign(1, 10, subnet("10.0.1.0/24")).unwrap();

        let plan = RoutingPlanner::new(&graph, &vlans).compute();
        let r1_on_13 = addr("10.1.0.13");
        assert_eq!(plan.route_to(r(3), &subnet("10.0.1.0/24")).unwrap().next_hop, r1_on_13);
        assert_eq!(plan.route_to(r(3), &subnet("192.168.1.0/24")).unwrap().next_hop, r1_on_13);
        // Link 1-2 is one hop away from both ends; the primary end wins
        assert_eq!(plan.route_to(r(3), &link_net(1)).unwrap().next_hop, r1_on_13);
        assert_eq!(plan.routes_for(r(3)).len(), 4);
        assert!(plan.is_complete());
    }

    #[test]
    fn test_chain_hops_through_middle() {
        let graph = graph_with(3, &[(1, 2), (2, 3)]);
        let mut vlans = VlanRegistry::new();
        vlans.assign(1, 10, subnet("10.0.0.0/24")).unwrap();

        let plan = RoutingPlanner::new(&graph, &vlans).compute();
        let r2_on_23 = addr("10.1.0.9");
        assert_eq!(plan.route_to(r(3), &subnet("10.0.0.0/24")).unwrap().next_hop, r2_on_23);
        assert_eq!(plan.next_hops(r(3)).into_iter().collect::<Vec<_>>(), vec![r2_on_23]);
        assert_eq!(plan.route_to(r(1), &link_net(2)).unwrap().next_hop, addr("10.1.0.6"));
    }

    #[test]
    fn test_link_tie_goes_to_primary_end() {
        // 1-3 is registered before 1-2, yet link 2-3 is still reached via router 2
        let graph = graph_with(3, &[(1, 3), (1, 2), (2, 3)]);
        let vlans = VlanRegistry::new();
        let plan = RoutingPlanner::new(&graph, &vlans).compute();
        assert_eq!(plan.route_to(r(1), &link_net(3)).unwrap().next_hop, addr("10.1.0.10"));
    }

    #[test]
    fn test_secondary_end_wins_when_closer() {
        // Ring 1-2-3-4-1: link 3-4 is two hops away through router 3 but one through router 4
        let graph = graph_with(4, &[(1, 2), (2, 3), (3, 4), (4, 1)]);
        let vlans = VlanRegistry::new();
        let plan = RoutingPlanner::new(&graph, &vlans).compute();

        let route = plan.route_to(r(1), &link_net(3)).unwrap();
        assert_eq!(route.next_hop, addr("10.1.0.18"));
        assert_eq!(Some(route.next_hop), graph.address_of(r(4), r(1)));
    }

    #[test]
    fn test_switch_and_owner_tables() {
        let mut graph = TopologyGraph::new(2).unwrap();
        let switch = graph.attach_switch(1, link_net(1)).unwrap();
        graph.add_link(r(1), r(2), link_net(2)).unwrap();
        let mut vlans = VlanRegistry::new();
        vlans.assign(1, 10, subnet("10.0.1.0/24")).unwrap();
        vlans.assign(2, 20, subnet("10.0.2.0/24")).unwrap();

        let plan = RoutingPlanner::new(&graph, &vlans).compute();

        let switch_routes = plan.routes_for(switch);
        assert_eq!(switch_routes.len(), 3);
        assert_eq!(plan.next_hops(switch).into_iter().collect::<Vec<_>>(), vec![addr("10.1.0.5")]);

        let own_vlan = plan.route_to(r(1), &subnet("10.0.1.0/24")).unwrap();
        assert_eq!(own_vlan.next_hop, addr("10.1.0.6"));
        assert_eq!(own_vlan.description, "Own VLAN 10 via Switch1");
        assert_eq!(plan.routes_for(r(1)).len(), 3);

        let r2 = plan.routes_for(r(2));
        assert_eq!(r2.len(), 4);
        assert!(r2.iter().all(|route| route.next_hop == addr("10.1.0.9")));
        assert_eq!(r2[2].description, "Admin network of Switch1");
        assert_eq!(r2[3].destination, link_net(1));
    }

    #[test]
    fn test_unreachable_is_reported_not_fatal() {
        let graph = graph_with(4, &[(1, 2), (3, 4)]);
        let vlans = VlanRegistry::new();
        let plan = RoutingPlanner::new(&graph, &vlans).compute();

        assert_eq!(plan.routes_for(r(1)).len(), 1);
        let skipped: Vec<_> = plan.unreachable.iter().filter(|u| u.from == r(1)).collect();
        assert_eq!(skipped.len(), 3);
        assert_eq!(skipped[0].toward, r(3));
        assert_eq!(skipped[2].omitted, "link 10.1.0.8/30");
        assert_eq!(plan.unreachable.len(), 12);
        assert!(!plan.is_complete());
    }

    #[test]
    fn test_isolated_router_gets_empty_table() {
        let graph = TopologyGraph::new(1).unwrap();
        let vlans = VlanRegistry::new();
        let plan = RoutingPlanner::new(&graph, &vlans).compute();
        assert!(plan.routes_for(r(1)).is_empty());
        assert!(plan.is_complete());
        assert!(RoutingPlanner::new(&graph, &vlans).routes_for(r(2)).is_none());
    }

    #[test]
    fn test_compute_is_idempotent_and_matches_single_node() {
        let mut graph = graph_with(4, &[(1, 2), (2, 3), (3, 4), (4, 1)]);
        graph.attach_switch(3, link_net(9)).unwrap();
        let mut vlans = VlanRegistry::new();
        vlans.assign(3, 30, subnet("10.0.3.0/24")).unwrap();
        vlans.assign(4, 40, subnet("10.0.4.0/24")).unwrap();

        let planner = RoutingPlanner::new(&graph, &vlans);
        let first = planner.compute();
        assert_eq!(first, planner.compute());
        for node in graph.nodes() {
            assert_eq!(first.routes_for(node), planner.routes_for(node).unwrap().routes.as_slice());
        }
    }
}
