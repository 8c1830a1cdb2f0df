//! Breadth-first shortest path search over the topology graph.

use std::collections::{HashMap, VecDeque};

use crate::topology::{NodeId, TopologyGraph};

/// Shortest path from `from` to `to`, both ends included.
///
/// Neighbors are expanded in link insertion order, so among equally short
/// paths the first one discovered in that order wins. Returns `None` when
/// `to` cannot be reached.
pub fn shortest_path(graph: &TopologyGraph, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
    if !graph.contains(from) || !graph.contains(to) {
        return None;
    }
    if from == to {
        return Some(vec![from]);
    }

    // node -> node it was discovered from
    let mut parents: HashMap<NodeId, NodeId> = HashMap::new();
    let mut queue = VecDeque::from([from]);

    while let Some(current) = queue.pop_front() {
        for &neighbor in graph.neighbors(current) {
            if neighbor == from || parents.contains_key(&neighbor) {
                continue;
            }
            parents.insert(neighbor, current);
            if neighbor == to {
                return Some(walk_back(&parents, from, to));
            }
            queue.push_back(neighbor);
        }
    }

    None
}

fn walk_back(parents: &HashMap<NodeId, NodeId>, from: NodeId, to: NodeId) -> Vec<NodeId> {
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        match parents.get(&current) {
            Some(&parent) => {
                path.push(parent);
                current = parent;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
