//! Placement Solver.
//!
//! Realised as a combinatorial search rather than an SMT call: for a fixed
//! replica count `k`, the set of `k`
//! candidate nodes that maximises joint availability is exactly the `k`
//! nodes with the lowest `failure_prob` among those whose residual capacity
//! still fits the microservice — picking the smallest `k` failure
//! probabilities from a larger set always minimises their product, so a
//! single sort-and-take-top-`k` per iteration is a complete, not just
//! heuristic, substitute for `ExactlyOne` + product-of-availabilities SMT
//! encoding at that `k`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info, warn};

use edgemesh_state::{Application, MicroserviceId, Node, NodeId, Placement, Topology};

/// Residual RAM/HDD capacity per node, consumed as microservices are placed.
struct Residual {
    ram_bytes: u64,
    hdd_bytes: u64,
}

/// Outcome of one placement cycle.
#[derive(Debug, Clone, Default)]
pub struct PlacementOutcome {
    pub placement: Placement,
    /// Microservices for which no feasible replica set was found at any
    /// `k` up to the candidate-node count. A first-class degraded state,
    /// not an error.
    pub degraded: Vec<MicroserviceId>,
}

impl PlacementOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Run the Placement Solver once, in the order the application declares its
/// microservices.
pub fn solve_placement(app: &Application, topology: &Topology) -> PlacementOutcome {
    let mut residual: HashMap<NodeId, Residual> = topology
        .nodes
        .iter()
        .filter_map(|n| {
            Some((
                n.id,
                Residual {
                    ram_bytes: n.ram_bytes?,
                    hdd_bytes: n.hdd_bytes?,
                },
            ))
        })
        .collect();

    let node_by_id: HashMap<NodeId, &Node> = topology.nodes.iter().map(|n| (n.id, n)).collect();

    let mut outcome = PlacementOutcome::default();

    for ms in &app.microservices {
        let ram_req = ms.ram_req_bytes();
        let hdd_req = ms.hdd_req_bytes();

        let mut candidates: Vec<NodeId> = residual
            .iter()
            .filter(|(_, r)| r.ram_bytes >= ram_req && r.hdd_bytes >= hdd_req)
            .map(|(id, _)| *id)
            .collect();
        // Highest availability (lowest failure_prob) first: for any fixed
        // replica count this ordering is what minimises the joint failure
        // probability of the chosen subset.
        candidates.sort_by(|a, b| {
            let fa = node_by_id[a].failure_prob;
            let fb = node_by_id[b].failure_prob;
            fa.partial_cmp(&fb).unwrap_or(std::cmp::Ordering::Equal)
        });

        match find_replication(&candidates, &node_by_id, app.sla.availability) {
            Some(chosen) => {
                for &n in &chosen {
                    let r = residual.get_mut(&n).expect("candidate node has residual entry");
                    r.ram_bytes -= ram_req;
                    r.hdd_bytes -= hdd_req;
                }
                info!(microservice = %ms.id, replicas = chosen.len(), "placed");
                outcome
                    .placement
                    .insert(ms.id.clone(), chosen.into_iter().collect::<BTreeSet<_>>());
            }
            None => {
                warn!(microservice = %ms.id, "no feasible replica set at any k; left unplaced");
                outcome.placement.insert(ms.id.clone(), BTreeSet::new());
                outcome.degraded.push(ms.id.clone());
            }
        }
    }

    outcome
}

/// Increase `k` from 1 until the top-`k` highest-availability candidates
/// jointly satisfy the availability SLA, or `k` exceeds the candidate count.
fn find_replication(
    candidates: &[NodeId],
    node_by_id: &HashMap<NodeId, &Node>,
    availability_sla: f64,
) -> Option<Vec<NodeId>> {
    for k in 1..=candidates.len() {
        let chosen = &candidates[..k];
        let joint_failure: f64 = chosen
            .iter()
            .map(|n| node_by_id[n].failure_prob)
            .product();
        let joint_availability = 1.0 - joint_failure;
        debug!(k, joint_availability, "trying replica count");
        if joint_availability >= availability_sla {
            return Some(chosen.to_vec());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgemesh_state::{Microservice, Sla};

    fn node(id: NodeId, failure: f64, ram_mb: u64, hdd_mb: u64) -> Node {
        let mut n = Node::new(id, format!("http://n{id}:5000"), failure);
        n.ram_bytes = Some(ram_mb * 1024 * 1024);
        n.hdd_bytes = Some(hdd_mb * 1024 * 1024);
        n
    }

    fn microservice(id: &str, ram_mb: u64, hdd_mb: u64, dest: Vec<&str>) -> Microservice {
        Microservice {
            id: id.to_string(),
            ram_req_mb: ram_mb,
            hdd_req_mb: hdd_mb,
            container_port: "5000".into(),
            external_port: "6000".into(),
            dest: dest.into_iter().map(String::from).collect(),
        }
    }

    fn app(sla: Sla, microservices: Vec<Microservice>) -> Application {
        Application { sla, microservices }
    }

    /// Two 10% failure nodes, 2048MB each; four 100MB microservices,
    /// SLA availability 0.9. Expect k=1 feasible for every microservice.
    fn two_ten_percent_nodes() -> Topology {
        Topology {
            nodes: vec![node(1, 0.1, 2048, 2048), node(2, 0.1, 2048, 2048)],
        }
    }

    fn four_service_chain(availability: f64) -> Application {
        app(
            Sla { availability, e2e: 100 },
            vec![
                microservice("cosminava/m1", 100, 100, vec!["cosminava/m2", "cosminava/m3"]),
                microservice("cosminava/m2", 100, 100, vec!["cosminava/m4"]),
                microservice("cosminava/m3", 100, 100, vec!["cosminava/m4"]),
                microservice("cosminava/m4", 100, 100, vec![]),
            ],
        )
    }

    #[test]
    fn single_replica_feasible_at_loose_sla() {
        let outcome = solve_placement(&four_service_chain(0.9), &two_ten_percent_nodes());
        assert!(!outcome.is_degraded());
        for (_, nodes) in &outcome.placement {
            assert_eq!(nodes.len(), 1);
        }
    }

    #[test]
    fn two_replicas_required_for_tighter_sla() {
        // 1 - 0.1 = 0.9 < 0.99, so k=1 fails; 1 - 0.1^2 = 0.99 >= 0.99 passes.
        let outcome = solve_placement(&four_service_chain(0.99), &two_ten_percent_nodes());
        assert!(!outcome.is_degraded());
        for (_, nodes) in &outcome.placement {
            assert_eq!(nodes.len(), 2);
        }
    }

    #[test]
    fn residual_capacity_is_respected_in_declared_order() {
        // One node with just enough room for two microservices, not three.
        let topology = Topology {
            nodes: vec![node(1, 0.0, 250, 250)],
        };
        let application = app(
            Sla { availability: 0.0, e2e: 100 },
            vec![
                microservice("a/one", 100, 100, vec![]),
                microservice("a/two", 100, 100, vec![]),
                microservice("a/three", 100, 100, vec![]),
            ],
        );
        let outcome = solve_placement(&application, &topology);
        assert_eq!(outcome.placement["a/one"], BTreeSet::from([1]));
        assert_eq!(outcome.placement["a/two"], BTreeSet::from([1]));
        assert!(outcome.placement["a/three"].is_empty());
        assert_eq!(outcome.degraded, vec!["a/three".to_string()]);
    }

    #[test]
    fn replicas_within_a_microservice_are_distinct_nodes() {
        let topology = Topology {
            nodes: vec![node(1, 0.5, 1000, 1000), node(2, 0.5, 1000, 1000), node(3, 0.5, 1000, 1000)],
        };
        let application = app(
            Sla { availability: 0.95, e2e: 100 },
            vec![microservice("a/one", 100, 100, vec![])],
        );
        let outcome = solve_placement(&application, &topology);
        let replicas = &outcome.placement["a/one"];
        assert_eq!(replicas.len(), 3);
        assert_eq!(replicas, &BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn oversized_microservice_is_left_unplaced() {
        // RAM requirement exceeds every node's capacity.
        let topology = Topology {
            nodes: vec![node(1, 0.0, 100, 100)],
        };
        let application = app(
            Sla { availability: 0.0, e2e: 100 },
            vec![microservice("a/huge", 1000, 100, vec![])],
        );
        let outcome = solve_placement(&application, &topology);
        assert!(outcome.placement["a/huge"].is_empty());
        assert_eq!(outcome.degraded, vec!["a/huge".to_string()]);
    }

    #[test]
    fn boundary_availability_zero_is_feasible_at_k1() {
        let topology = Topology {
            nodes: vec![node(1, 0.9, 1000, 1000)],
        };
        let application = app(
            Sla { availability: 0.0, e2e: 100 },
            vec![microservice("a/one", 100, 100, vec![])],
        );
        let outcome = solve_placement(&application, &topology);
        assert_eq!(outcome.placement["a/one"].len(), 1);
    }

    #[test]
    fn boundary_all_failure_zero_single_replica_suffices() {
        let topology = Topology {
            nodes: vec![node(1, 0.0, 1000, 1000), node(2, 0.0, 1000, 1000)],
        };
        let application = app(
            Sla { availability: 0.999, e2e: 100 },
            vec![microservice("a/one", 100, 100, vec![])],
        );
        let outcome = solve_placement(&application, &topology);
        assert_eq!(outcome.placement["a/one"].len(), 1);
    }

    #[test]
    fn running_twice_on_unchanged_topology_both_satisfy_invariants() {
        let topology = two_ten_percent_nodes();
        let a = solve_placement(&four_service_chain(0.9), &topology);
        let b = solve_placement(&four_service_chain(0.9), &topology);
        assert!(!a.is_degraded());
        assert!(!b.is_degraded());
        for (id, nodes) in &a.placement {
            assert_eq!(nodes.len(), b.placement[id].len());
        }
    }
}
