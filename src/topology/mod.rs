//! Network topology module.
//!
//! This module contains the router/switch graph, the links between nodes
//! and the per-node capacity rules enforced while links are registered.

pub mod types;
pub mod graph;

// Re-export key types for easier access
pub use types::{Interface, Link, LinkKind, NodeId, NodeRole};
pub use graph::{TopologyError, TopologyGraph, MAX_LINKS_PER_NODE, MAX_ROUTERS};
