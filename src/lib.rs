//! # Netplan - IP addressing and static routing planner
//!
//! This library plans the addressing and router-to-router static routing of
//! a multi-router network before any device configuration text is produced.
//!
//! ## Overview
//!
//! Given a number of routers, the links between them, per-router VLANs and
//! optional Layer-3 switches, netplan:
//!
//! - carves non-overlapping subnets out of a base address space,
//! - registers links in a topology graph that enforces per-node capacity,
//! - builds a static route table for every router and switch from
//!   breadth-first shortest paths, resolving concrete next-hop addresses.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `ip`: Subnet math, the address pool, VLAN catalog and VLAN registry
//! - `topology`: Node identifiers, links and the capacity-checked graph
//! - `routing`: Shortest path search, route types and the route planner
//! - `config`: Configuration structures and validation
//! - `config_loader`: Configuration file loading
//! - `orchestrator`: One planning run, from configuration to report
//! - `utils`: Address parsing helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use netplan::{config_loader, orchestrator};
//! use netplan::orchestrator::OutputFormat;
//! use std::path::Path;
//!
//! let config = config_loader::load_config(Path::new("topology.yaml"))?;
//! let report = orchestrator::generate_plan(&config, Some(Path::new("plan.yaml")), OutputFormat::Yaml)?;
//!
//! for (node, routes) in &report.routing.routes {
//!     for route in routes {
//!         println!("{}: ip route {}", node, route);
//!     }
//! }
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! base_address: "10.0.0.0"
//! routers: 3
//! seed: 7
//! vlans:
//!   - { id: 10, prefix: 24, count: 2 }
//! nodes:
//!   - { router: 1, vlans: [10], l3_switch: true }
//!   - { router: 3, vlans: [10] }
//! links:
//!   - [1, 2]
//!   - [2, 3]
//! ```

pub mod config;
pub mod config_loader;
pub mod ip;
pub mod orchestrator;
pub mod routing;
pub mod topology;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use ip::{AddressPool, Subnet};
pub use orchestrator::{NetworkPlan, PlanReport};
pub use routing::{RouteEntry, RoutingPlan, RoutingPlanner};
pub use topology::{NodeId, TopologyGraph};
