//! Bridge-group discovery and execution ordering.
//!
//! Rules enforced on `validate_flow`:
//! 1. Node IDs must be unique within the flow.
//! 2. Every connection and bridge must reference valid node IDs.
//!
//! Unlike a strict DAG validator, [`compute_execution_order`] tolerates
//! cycles: a topological sort (Kahn's algorithm) is attempted first, and
//! if it cannot place every node, the remaining nodes are appended in an
//! arbitrary but deterministic order so execution can still begin
//! somewhere. Cycles are handled at run time by the queue-driven runner,
//! which re-enters nodes and bounds total visits per node.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{models::Flow, EngineError};

/// Maps each bridged node to every other node in its connected component
/// (the node itself is excluded from its own peer list, matching how
/// callers use this map: "who else shares my output").
pub type BridgeGroups = HashMap<String, Vec<String>>;

/// Build bridge equivalence classes via BFS over the undirected bridge
/// graph. Nodes with no bridge at all are absent from the map.
pub fn build_bridge_groups(flow: &Flow) -> BridgeGroups {
    let mut adjacency: HashMap<&str, Vec<&str>> =
        flow.nodes.iter().map(|n| (n.id.as_str(), Vec::new())).collect();

    for bridge in &flow.bridges {
        if adjacency.contains_key(bridge.from.as_str()) && adjacency.contains_key(bridge.to.as_str())
        {
            adjacency.get_mut(bridge.from.as_str()).unwrap().push(bridge.to.as_str());
            adjacency.get_mut(bridge.to.as_str()).unwrap().push(bridge.from.as_str());
        }
    }

    let mut groups: BridgeGroups = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::new();

    for node in &flow.nodes {
        let id = node.id.as_str();
        if visited.contains(id) {
            continue;
        }
        if adjacency.get(id).map(|v| v.is_empty()).unwrap_or(true) {
            continue;
        }

        let mut component: Vec<&str> = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        visited.insert(id);

        while let Some(curr) = queue.pop_front() {
            component.push(curr);
            for &neighbour in &adjacency[curr] {
                if visited.insert(neighbour) {
                    queue.push_back(neighbour);
                }
            }
        }

        for &member in &component {
            let peers: Vec<String> = component
                .iter()
                .filter(|&&m| m != member)
                .map(|&m| m.to_string())
                .collect();
            groups.insert(member.to_string(), peers);
        }
    }

    groups
}

/// Validate that node IDs are unique and that every connection/bridge
/// references a node that actually exists.
///
/// # Errors
/// - [`EngineError::DuplicateNodeId`] if two nodes share an ID.
/// - [`EngineError::UnknownNodeReference`] if a connection or bridge
///   references a missing node.
pub fn validate_flow(flow: &Flow) -> Result<(), EngineError> {
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for node in &flow.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            return Err(EngineError::DuplicateNodeId(node.id.clone()));
        }
    }

    let node_set: HashSet<&str> = flow.nodes.iter().map(|n| n.id.as_str()).collect();

    for conn in &flow.connections {
        if !node_set.contains(conn.from.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: conn.from.clone(),
                side: "from",
            });
        }
        if !node_set.contains(conn.to.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: conn.to.clone(),
                side: "to",
            });
        }
    }

    for bridge in &flow.bridges {
        if !node_set.contains(bridge.from.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: bridge.from.clone(),
                side: "from",
            });
        }
        if !node_set.contains(bridge.to.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: bridge.to.clone(),
                side: "to",
            });
        }
    }

    Ok(())
}

/// Compute an execution order. A connection into a bridged node is
/// treated as feeding every node in its bridge group, since they share
/// downstream visibility. Cycles are broken by repeatedly picking the
/// first not-yet-placed node once the topological frontier is empty —
/// the exact result order for a cyclic flow is not meaningful on its
/// own, only as a seed for the queue-driven runner.
pub fn compute_execution_order(flow: &Flow, bridge_groups: &BridgeGroups) -> Vec<String> {
    let mut adjacency: HashMap<&str, Vec<&str>> =
        flow.nodes.iter().map(|n| (n.id.as_str(), Vec::new())).collect();
    let mut in_degree: HashMap<&str, usize> =
        flow.nodes.iter().map(|n| (n.id.as_str(), 0usize)).collect();

    for conn in &flow.connections {
        let source = conn.from.as_str();
        let mut targets: Vec<&str> = vec![conn.to.as_str()];
        if let Some(peers) = bridge_groups.get(conn.to.as_str()) {
            targets = std::iter::once(conn.to.as_str())
                .chain(peers.iter().map(String::as_str))
                .collect();
        }

        for target in targets {
            if target == source {
                continue;
            }
            let list = adjacency.get_mut(source).unwrap();
            if !list.contains(&target) {
                list.push(target);
                *in_degree.get_mut(target).unwrap() += 1;
            }
        }
    }

    let mut queue: VecDeque<&str> = flow
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| in_degree[id] == 0)
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(flow.nodes.len());
    let mut placed: HashSet<&str> = HashSet::new();

    drain_queue(&mut queue, &adjacency, &mut in_degree, &mut sorted, &mut placed);

    if sorted.len() != flow.nodes.len() {
        for node in &flow.nodes {
            if placed.contains(node.id.as_str()) {
                continue;
            }
            sorted.push(node.id.clone());
            placed.insert(node.id.as_str());

            let mut requeue: VecDeque<&str> = VecDeque::new();
            for &neighbour in &adjacency[node.id.as_str()] {
                if placed.contains(neighbour) {
                    continue;
                }
                let deg = in_degree.get_mut(neighbour).unwrap();
                if *deg > 0 {
                    *deg -= 1;
                }
                if *deg == 0 {
                    requeue.push_back(neighbour);
                }
            }
            drain_queue(&mut requeue, &adjacency, &mut in_degree, &mut sorted, &mut placed);
        }
    }

    sorted
}

fn drain_queue<'a>(
    queue: &mut VecDeque<&'a str>,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    in_degree: &mut HashMap<&'a str, usize>,
    sorted: &mut Vec<String>,
    placed: &mut HashSet<&'a str>,
) {
    while let Some(id) = queue.pop_front() {
        if !placed.insert(id) {
            continue;
        }
        sorted.push(id.to_owned());

        for &neighbour in &adjacency[id] {
            if placed.contains(neighbour) {
                continue;
            }
            let deg = in_degree.get_mut(neighbour).unwrap();
            if *deg > 0 {
                *deg -= 1;
            }
            if *deg == 0 {
                queue.push_back(neighbour);
            }
        }
    }
}
