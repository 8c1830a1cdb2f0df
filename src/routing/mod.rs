//! Static routing module.
//!
//! Shortest path search over the topology, the route types handed to the
//! rendering layer and the planner turning paths into next hops.

pub mod path;
pub mod types;
pub mod planner;

// Re-export commonly used types
pub use path::shortest_path;
pub use types::{RouteEntry, RoutingPlan, UnreachableDestination};
pub use planner::{NodeRoutes, RoutingPlanner};
