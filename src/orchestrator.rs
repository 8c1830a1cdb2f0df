//! Planning orchestrator.
//!
//! This module runs one planning pass from a validated configuration:
//! VLAN subnets are reserved, a spare queue of link /30s is allocated,
//! switches and links are registered in the topology, VLANs are claimed
//! and finally the routing plan and its report are produced.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::Config;
use crate::ip::{
    AddressPool, JumpSource, OccupiedRange, Subnet, VlanAssignment, VlanCatalog, VlanRegistry,
    LINK_PREFIX,
};
use crate::routing::{RoutingPlan, RoutingPlanner};
use crate::topology::{Interface, Link, NodeId, NodeRole, TopologyError, TopologyGraph};

/// Errors while registering a link during a planning run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("No spare /30 left for link {0} - {1}")]
    NoSpareLinkSubnet(NodeId, NodeId),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Output serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Address pool, topology and VLAN assignments of one planning run
#[derive(Debug, Clone)]
pub struct NetworkPlan {
    pool: AddressPool,
    graph: TopologyGraph,
    vlans: VlanRegistry,
    catalog: VlanCatalog,
    /// Link /30s not in use; taken from the front, returned to the back
    spare_links: VecDeque<Subnet>,
    /// Configuration entries that were skipped
    warnings: Vec<String>,
}

impl NetworkPlan {
    /// Build a plan, seeding randomized allocation from the config
    pub fn build(config: &Config) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::build_with(config, &mut rng)
    }

    /// Build a plan drawing allocation jumps from `jumps`
    pub fn build_with<J: JumpSource + ?Sized>(config: &Config, jumps: &mut J) -> Result<Self> {
        config.validate()?;
        let base = config.base_address()?;

        let mut plan = NetworkPlan {
            pool: AddressPool::new(base),
            graph: TopologyGraph::new(config.routers)?,
            vlans: VlanRegistry::new(),
            catalog: VlanCatalog::new(),
            spare_links: VecDeque::new(),
            warnings: Vec::new(),
        };

        plan.reserve_vlan_subnets(config, jumps);
        plan.reserve_link_subnets(config, jumps);
        plan.check_admin_overlap(config);
        plan.attach_switches(config)?;
        plan.claim_vlans(config);
        plan.register_links(config)?;

        info!(
            "Planned {} routers, {} switches, {} links, {} VLAN subnets",
            plan.graph.router_count(),
            plan.graph.switches().count(),
            plan.graph.links().len(),
            plan.vlans.len()
        );
        Ok(plan)
    }

    fn warn_skip(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    fn reserve_vlan_subnets<J: JumpSource + ?Sized>(&mut self, config: &Config, jumps: &mut J) {
        for spec in &config.vlans {
            if let Err(e) = self.catalog.reserve(&mut self.pool, spec.id, spec.prefix, spec.count, jumps) {
                let reserved = self.catalog.candidates(spec.id).len();
                self.warn_skip(format!(
                    "VLAN {}: reserved {} of {} subnets ({})",
                    spec.id, reserved, spec.count, e
                ));
            }
        }
    }

    fn reserve_link_subnets<J: JumpSource + ?Sized>(&mut self, config: &Config, jumps: &mut J) {
        let wanted = config.link_pool_size();
        for _ in 0..wanted {
            let allocated = if config.randomize_links {
                self.pool.allocate_randomized(LINK_PREFIX, jumps)
            } else {
                self.pool.allocate(LINK_PREFIX)
            };
            match allocated {
                Ok(subnet) => self.spare_links.push_back(subnet),
                Err(e) => {
                    let have = self.spare_links.len();
                    self.warn_skip(format!("Link pool holds {} of {} /30s ({})", have, wanted, e));
                    break;
                }
            }
        }
        debug!("Link pool: {:?}", self.spare_links);
    }

    /// Allocated blocks must stay clear of the routers' 192.168.R.0/24 admin networks
    fn check_admin_overlap(&mut self, config: &Config) {
        let admin: Vec<(u32, Subnet)> = (1..=config.routers)
            .filter_map(|router| Subnet::admin_for_router(router).map(|net| (router, net)))
            .collect();
        let clashes: Vec<String> = self
            .pool
            .occupied()
            .iter()
            .flat_map(|block| {
                admin
                    .iter()
                    .filter(move |(_, net)| net.overlaps(block))
                    .map(move |(router, net)| {
                        format!("{} overlaps the admin network {} of Router{}", block, net, router)
                    })
            })
            .collect();
        for message in clashes {
            self.warn_skip(message);
        }
    }

    fn attach_switches(&mut self, config: &Config) -> Result<()> {
        for router in 1..=config.routers {
            if !config.has_switch(router) {
                continue;
            }
            self.register(NodeId::Router(router), NodeId::Switch(router))?;
        }
        Ok(())
    }

    fn claim_vlans(&mut self, config: &Config) {
        for router in 1..=config.routers {
            let Some(node) = config.node(router) else {
                continue;
            };
            for &vlan in &node.vlans {
                let Some(subnet) = self.catalog.next_free(vlan, &self.vlans) else {
                    self.warn_skip(format!("Router{}: no free subnet left for VLAN {}", router, vlan));
                    continue;
                };
                match self.vlans.assign(router, vlan, subnet) {
                    Ok(()) => debug!("Router{}: VLAN {} on {}", router, vlan, subnet),
                    Err(e) => self.warn_skip(format!("Router{}: {}", router, e)),
                }
            }
        }
    }

    fn register_links(&mut self, config: &Config) -> Result<()> {
        for &[a, b] in &config.links {
            self.register(NodeId::Router(a), NodeId::Router(b))?;
        }
        Ok(())
    }

    /// Add a configured link; running out of /30s is a warning, bad topology is fatal
    fn register(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        match self.add_link(a, b) {
            Ok(_) => Ok(()),
            Err(e @ PlanError::NoSpareLinkSubnet(..)) => {
                self.warn_skip(e.to_string());
                Ok(())
            }
            Err(e) => Err(e).wrap_err_with(|| format!("Cannot link {} and {}", a, b)),
        }
    }

    /// Link two nodes over the next spare /30.
    ///
    /// A rejected link puts the /30 back at the front of the queue.
    pub fn add_link(&mut self, a: NodeId, b: NodeId) -> Result<Subnet, PlanError> {
        let subnet = self
            .spare_links
            .pop_front()
            .ok_or(PlanError::NoSpareLinkSubnet(a, b))?;
        if let Err(e) = self.graph.add_link(a, b, subnet) {
            self.spare_links.push_front(subnet);
            return Err(e.into());
        }
        info!("Linked {} and {} over {}", a, b, subnet);
        Ok(subnet)
    }

    /// Remove a link and queue its /30 for reuse after the other spares
    pub fn remove_link(&mut self, a: NodeId, b: NodeId) -> Result<Subnet, PlanError> {
        let subnet = self.graph.remove_link(a, b)?;
        self.spare_links.push_back(subnet);
        info!("Unlinked {} and {}, {} back in the pool", a, b, subnet);
        Ok(subnet)
    }

    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    pub fn vlans(&self) -> &VlanRegistry {
        &self.vlans
    }

    pub fn pool(&self) -> &AddressPool {
        &self.pool
    }

    pub fn catalog(&self) -> &VlanCatalog {
        &self.catalog
    }

    pub fn spare_links(&self) -> impl Iterator<Item = Subnet> + '_ {
        self.spare_links.iter().copied()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn routing_plan(&self) -> RoutingPlan {
        RoutingPlanner::new(&self.graph, &self.vlans).compute()
    }

    /// Everything the rendering layer needs, routes included
    pub fn report(&self) -> PlanReport {
        let nodes = self
            .graph
            .nodes()
            .filter_map(|node| {
                let summary = NodeSummary {
                    role: self.graph.role(node)?,
                    admin_address: node.admin_address()?,
                    interfaces: self.graph.interfaces(node),
                };
                Some((node, summary))
            })
            .collect();

        PlanReport {
            base_address: self.pool.base(),
            occupancy: self.pool.occupancy_report(),
            vlan_catalog: self.catalog.clone(),
            vlan_assignments: self.vlans.assignments(),
            spare_link_subnets: self.spare_links().collect(),
            links: self.graph.links().to_vec(),
            nodes,
            routing: self.routing_plan(),
            warnings: self.warnings.clone(),
        }
    }
}

/// Addressing of one node
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub role: NodeRole,
    pub admin_address: Ipv4Addr,
    pub interfaces: Vec<Interface>,
}

/// Serializable result of a planning run
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub base_address: Ipv4Addr,
    pub occupancy: Vec<OccupiedRange>,
    pub vlan_catalog: VlanCatalog,
    pub vlan_assignments: Vec<VlanAssignment>,
    pub spare_link_subnets: Vec<Subnet>,
    pub links: Vec<Link>,
    pub nodes: BTreeMap<NodeId, NodeSummary>,
    pub routing: RoutingPlan,
    pub warnings: Vec<String>,
}

/// Serialize a report in the requested format
pub fn render_report(report: &PlanReport, format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::Yaml => serde_yaml::to_string(report)?,
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
    };
    Ok(text)
}

/// Plan from a configuration and write the report to `output`, or stdout
pub fn generate_plan(config: &Config, output: Option<&Path>, format: OutputFormat) -> Result<PlanReport> {
    let plan = NetworkPlan::build(config)?;
    let report = plan.report();
    let text = render_report(&report, format)?;

    match output {
        Some(path) => {
            fs::write(path, &text).wrap_err_with(|| format!("Failed to write plan to {:?}", path))?;
            info!("Wrote plan to {:?}", path);
        }
        None => print!("{}", text),
    }

    if !report.routing.is_complete() {
        warn!(
            "{} destinations could not be routed; see the unreachable list",
            report.routing.unreachable.len()
        );
    }
    Ok(report)
}
