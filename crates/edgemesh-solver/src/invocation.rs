//! Invocation-Path Solver.
//!
//! One whole-application search per call: a backtracking DFS over candidate
//! nodes per microservice, pruning as soon as the accumulated latency along
//! already-fixed dependency edges exceeds the e2e budget, checking the
//! availability product only once every microservice has a node. Candidate
//! lists are tried in descending-availability order, so the first complete
//! assignment found tends to also satisfy the availability goal, but
//! correctness does not depend on that — a failing leaf simply backtracks.
//!
//! If any microservice in the application has an empty Placement, the
//! search is not run at all: both read as the same final state as a path
//! search that finds no model, so the cheaper short-circuit is taken.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use edgemesh_state::{Application, InvocationPath, LatencyTable, MicroserviceId, NodeId, Placement, Topology};

use crate::error::{SolverError, SolverResult};

pub fn solve_invocation_path(
    app: &Application,
    placement: &Placement,
    topology: &Topology,
    latency: &LatencyTable,
) -> SolverResult<InvocationPath> {
    let order: Vec<&MicroserviceId> = app.ordered_ids().collect();
    let index_of: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut candidates: Vec<Vec<NodeId>> = Vec::with_capacity(order.len());
    for id in &order {
        let set = placement.get(*id).cloned().unwrap_or_default();
        if set.is_empty() {
            warn!(microservice = %id, "empty placement; path solver not run");
            return Err(SolverError::PathInfeasible);
        }
        let mut nodes: Vec<NodeId> = set.into_iter().collect();
        nodes.sort_by(|a, b| {
            let fa = topology.node(*a).map(|n| n.failure_prob).unwrap_or(1.0);
            let fb = topology.node(*b).map(|n| n.failure_prob).unwrap_or(1.0);
            fa.partial_cmp(&fb).unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.push(nodes);
    }

    // Dependency edges between two microservices whose placements are both
    // present (guaranteed above) expressed as index pairs; direction does
    // not matter for a symmetric latency sum.
    let edges: Vec<(usize, usize)> = app
        .dependency_edges()
        .filter_map(|(u, v)| Some((*index_of.get(u.as_str())?, *index_of.get(v.as_str())?)))
        .collect();

    let mut chosen: Vec<NodeId> = Vec::with_capacity(order.len());
    let result = search(
        0,
        &candidates,
        &edges,
        topology,
        latency,
        app.sla.e2e,
        app.sla.availability,
        0,
        &mut chosen,
    );

    match result {
        Some(assignment) => {
            let mut path = InvocationPath::new();
            for (id, node) in order.into_iter().zip(assignment) {
                path.insert(id.clone(), node);
            }
            info!(hops = path.len(), "invocation path found");
            Ok(path)
        }
        None => Err(SolverError::PathInfeasible),
    }
}

#[allow(clippy::too_many_arguments)]
fn search(
    idx: usize,
    candidates: &[Vec<NodeId>],
    edges: &[(usize, usize)],
    topology: &Topology,
    latency: &LatencyTable,
    e2e_budget: i64,
    availability_sla: f64,
    latency_acc: i64,
    chosen: &mut Vec<NodeId>,
) -> Option<Vec<NodeId>> {
    if idx == candidates.len() {
        let joint_failure: f64 = chosen
            .iter()
            .map(|n| topology.node(*n).map(|t| t.failure_prob).unwrap_or(1.0))
            .product();
        let joint_availability = 1.0 - joint_failure;
        debug!(latency_acc, joint_availability, "candidate path complete");
        return if joint_availability >= availability_sla {
            Some(chosen.clone())
        } else {
            None
        };
    }

    for &node in &candidates[idx] {
        let mut new_acc = latency_acc;
        for &(a, b) in edges {
            let other_idx = if a == idx {
                b
            } else if b == idx {
                a
            } else {
                continue;
            };
            if other_idx >= chosen.len() {
                continue; // other endpoint not yet assigned
            }
            let ms = latency.get(chosen[other_idx], node).unwrap_or(u32::MAX);
            new_acc += ms as i64;
        }
        if new_acc > e2e_budget {
            continue;
        }

        chosen.push(node);
        if let Some(result) = search(
            idx + 1,
            candidates,
            edges,
            topology,
            latency,
            e2e_budget,
            availability_sla,
            new_acc,
            chosen,
        ) {
            chosen.pop();
            return Some(result);
        }
        chosen.pop();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgemesh_state::{Microservice, Sla};
    use std::collections::BTreeSet;

    fn node(id: NodeId, failure: f64) -> edgemesh_state::Node {
        edgemesh_state::Node::new(id, format!("http://n{id}:5000"), failure)
    }

    fn microservice(id: &str, dest: Vec<&str>) -> Microservice {
        Microservice {
            id: id.to_string(),
            ram_req_mb: 100,
            hdd_req_mb: 100,
            container_port: "5000".into(),
            external_port: "6000".into(),
            dest: dest.into_iter().map(String::from).collect(),
        }
    }

    fn chain_app(availability: f64, e2e: i64) -> Application {
        Application {
            sla: Sla { availability, e2e },
            microservices: vec![
                microservice("a/m1", vec!["a/m2", "a/m3"]),
                microservice("a/m2", vec!["a/m4"]),
                microservice("a/m3", vec!["a/m4"]),
                microservice("a/m4", vec![]),
            ],
        }
    }

    fn both_nodes_placement() -> Placement {
        ["a/m1", "a/m2", "a/m3", "a/m4"]
            .into_iter()
            .map(|id| (id.to_string(), BTreeSet::from([1, 2])))
            .collect()
    }

    /// d(1,2)=5, 3 edges max on the path => total <= 15 <= 100.
    #[test]
    fn path_exists_within_latency_budget() {
        let topology = Topology { nodes: vec![node(1, 0.1), node(2, 0.1)] };
        let mut latency = LatencyTable::new();
        latency.set(1, 2, 5);
        let path = solve_invocation_path(&chain_app(0.9, 100), &both_nodes_placement(), &topology, &latency).unwrap();
        assert_eq!(path.len(), 4);
    }

    /// e2e=0 forces co-location; with both nodes viable for every
    /// microservice a same-node assignment exists, so the path succeeds.
    #[test]
    fn zero_e2e_succeeds_when_colocation_possible() {
        let topology = Topology { nodes: vec![node(1, 0.1), node(2, 0.1)] };
        let mut latency = LatencyTable::new();
        latency.set(1, 2, 5);
        let path = solve_invocation_path(&chain_app(0.9, 0), &both_nodes_placement(), &topology, &latency).unwrap();
        let first = *path.values().next().unwrap();
        assert!(path.values().all(|&n| n == first));
    }

    /// e2e=0 but the two dependent microservices have disjoint
    /// single-node candidate sets, so no co-location is possible => UNSAT.
    #[test]
    fn zero_e2e_fails_when_colocation_impossible() {
        let topology = Topology { nodes: vec![node(1, 0.0), node(2, 0.0)] };
        let mut latency = LatencyTable::new();
        latency.set(1, 2, 5);
        let mut placement = Placement::new();
        placement.insert("a/m1".into(), BTreeSet::from([1]));
        placement.insert("a/m2".into(), BTreeSet::from([2]));
        placement.insert("a/m3".into(), BTreeSet::from([1]));
        placement.insert("a/m4".into(), BTreeSet::from([1]));
        let app = Application {
            sla: Sla { availability: 0.0, e2e: 0 },
            microservices: vec![
                microservice("a/m1", vec!["a/m2"]),
                microservice("a/m2", vec![]),
                microservice("a/m3", vec![]),
                microservice("a/m4", vec![]),
            ],
        };
        let err = solve_invocation_path(&app, &placement, &topology, &latency).unwrap_err();
        assert_eq!(err, SolverError::PathInfeasible);
    }

    /// An empty Placement for any microservice is reported as infeasible
    /// without running the search.
    #[test]
    fn empty_placement_is_infeasible() {
        let topology = Topology { nodes: vec![node(1, 0.1)] };
        let mut placement = both_nodes_placement();
        placement.insert("a/m2".into(), BTreeSet::new());
        let err = solve_invocation_path(&chain_app(0.9, 100), &placement, &topology, &LatencyTable::new()).unwrap_err();
        assert_eq!(err, SolverError::PathInfeasible);
    }

    #[test]
    fn every_chosen_node_is_drawn_from_its_microservices_placement() {
        let topology = Topology { nodes: vec![node(1, 0.1), node(2, 0.1)] };
        let mut latency = LatencyTable::new();
        latency.set(1, 2, 5);
        let placement = both_nodes_placement();
        let path = solve_invocation_path(&chain_app(0.9, 100), &placement, &topology, &latency).unwrap();
        for (id, node) in &path {
            assert!(placement[id].contains(node));
        }
    }
}
