//! Adaptation Controller.
//!
//! Owns the one logical sequence of cycles: startup assembles the initial
//! deployment, steady state reacts to `FailureMonitor` reports by degrading
//! the existing placement and re-solving only the invocation path — never
//! re-running placement, since placement is the expensive cycle (many
//! solver calls, container starts) and path selection is cheap (one solver
//! call, no side effects).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use edgemesh_agent::AgentClient;
use edgemesh_monitor::FailureMonitor;
use edgemesh_solver::{build_latency_table, solve_invocation_path, solve_placement, RandomizedLatencyOracle, SolverResult};
use edgemesh_state::{Application, InvocationPath, NodeId, Placement, StateStore, Topology};

use crate::completion::AppCompletionSignal;
use crate::error::{ControllerError, ControllerResult};
use crate::probe::probe_resources;

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Controller {
    app: Application,
    topology: Topology,
    placement: Placement,
    invocation_path: InvocationPath,
    monitor: Arc<FailureMonitor>,
    store: StateStore,
    round: u64,
    agent_timeout: Duration,
    poll_interval: Duration,
    completion: Option<Arc<dyn AppCompletionSignal>>,
}

impl Controller {
    pub fn new(app: Application, topology: Topology, store: StateStore, agent_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            app,
            topology,
            placement: Placement::new(),
            invocation_path: InvocationPath::new(),
            monitor: Arc::new(FailureMonitor::new(DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_TIMEOUT)),
            store,
            round: 0,
            agent_timeout,
            poll_interval,
            completion: None,
        }
    }

    pub fn with_completion_signal(mut self, signal: Arc<dyn AppCompletionSignal>) -> Self {
        self.completion = Some(signal);
        self
    }

    /// A shared handle to the Failure Monitor, for the read-only status
    /// surface — the only piece of live Controller state not mirrored into
    /// `StateStore`, since `MonitorStatus` changes between adaptation
    /// rounds, not just at round boundaries.
    pub fn monitor_handle(&self) -> Arc<FailureMonitor> {
        self.monitor.clone()
    }

    pub fn store(&self) -> StateStore {
        self.store.clone()
    }

    /// Runs startup then the steady-state loop. Returns `Ok(())` on a clean
    /// shutdown signal, `Err(ControllerError::TerminalInfeasibility)` when
    /// adaptation exhausts every alternative.
    pub async fn run(&mut self) -> ControllerResult<()> {
        self.startup().await?;
        self.steady_state().await
    }

    async fn startup(&mut self) -> ControllerResult<()> {
        info!(nodes = self.topology.nodes.len(), "adaptation controller starting");

        for node in self.topology.nodes.clone() {
            self.monitor.start(node.ip.clone()).await;
        }
        info!("failure monitor started for all declared nodes");

        probe_resources(&mut self.topology, self.agent_timeout).await;
        self.store.put_topology(&self.topology)?;

        let outcome = solve_placement(&self.app, &self.topology);
        if outcome.is_degraded() {
            warn!(degraded = ?outcome.degraded, "placement cycle left some microservices unplaced");
        }
        self.placement = outcome.placement;
        self.store.put_placement(&self.placement)?;
        info!("placement solved");

        self.deploy_containers().await;
        info!("containers deployed");

        self.invocation_path = self.solve_path()?;
        self.store.put_invocation_path(&self.invocation_path)?;
        self.store.put_round(self.round)?;
        info!(hops = self.invocation_path.len(), "first invocation path found");

        self.broadcast_knowledge().await;
        self.await_app_completion().await;

        Ok(())
    }

    async fn steady_state(&mut self) -> ControllerResult<()> {
        info!("entering steady-state monitoring loop");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received; exiting cleanly");
                    return Ok(());
                }
            }

            let down = self.monitor.down_nodes().await;
            if down.is_empty() {
                continue;
            }
            warn!(?down, "node failures detected");

            for url in &down {
                if let Some(id) = self.topology.nodes.iter().find(|n| &n.ip == url).map(|n| n.id) {
                    self.retire_node(id);
                    self.degrade_placement(id);
                }
                self.untrack(url).await;
            }
            self.round += 1;

            match self.solve_path() {
                Ok(path) => {
                    self.invocation_path = path;
                    self.store.put_topology(&self.topology)?;
                    self.store.put_placement(&self.placement)?;
                    self.store.put_invocation_path(&self.invocation_path)?;
                    self.store.put_round(self.round)?;
                    self.broadcast_knowledge().await;
                    info!(path = ?self.invocation_path, "recovered with a new invocation path");
                }
                Err(_) => {
                    warn!("the application functionality cannot be restored with the available resources; more edge nodes are required");
                    return Err(ControllerError::TerminalInfeasibility);
                }
            }
        }
    }

    /// Remove a failed node from the topology.
    fn retire_node(&mut self, id: NodeId) {
        self.topology.retire(id);
    }

    /// Drop a failed node from every replica set in the current placement.
    fn degrade_placement(&mut self, id: NodeId) {
        for nodes in self.placement.values_mut() {
            nodes.remove(&id);
        }
    }

    /// Stop watching a node and remove its monitor entry.
    async fn untrack(&self, node_url: &str) {
        self.monitor.retire(node_url).await;
    }

    fn solve_path(&self) -> SolverResult<InvocationPath> {
        let node_ids: Vec<NodeId> = self.topology.nodes.iter().map(|n| n.id).collect();
        let oracle = RandomizedLatencyOracle::new(self.round);
        let latency = build_latency_table(&node_ids, &oracle);
        solve_invocation_path(&self.app, &self.placement, &self.topology, &latency)
    }

    fn agent_client(&self, node_id: NodeId) -> Option<AgentClient> {
        self.topology.node(node_id).map(|n| AgentClient::new(&n.ip, self.agent_timeout))
    }

    /// Idempotent per (microservice, node): starting an already-running
    /// container is a harmless no-op from the agent's side.
    async fn deploy_containers(&self) {
        for (ms_id, nodes) in &self.placement {
            let Some(ms) = self.app.microservice(ms_id) else { continue };
            for &node_id in nodes {
                let Some(client) = self.agent_client(node_id) else { continue };
                if let Err(e) = client
                    .start_docker_container(&ms.id, &ms.container_port, &ms.external_port)
                    .await
                {
                    warn!(microservice = %ms_id, node = node_id, error = %e, "container start failed");
                }
            }
        }
    }

    /// Broadcast microservice destinations, ports, invocation path and node
    /// IPs to every currently reachable node.
    async fn broadcast_knowledge(&self) {
        let dest: HashMap<String, Vec<String>> = self
            .app
            .microservices
            .iter()
            .map(|m| (short_id(&m.id), m.dest.iter().map(|d| short_id(d)).collect()))
            .collect();
        let ports: HashMap<String, (String, String)> = self
            .app
            .microservices
            .iter()
            .map(|m| (m.id.clone(), (m.container_port.clone(), m.external_port.clone())))
            .collect();
        let path: HashMap<String, u64> = self.invocation_path.iter().map(|(id, n)| (id.clone(), *n)).collect();
        let nodes_ips: HashMap<String, String> = self.topology.nodes.iter().map(|n| (n.id.to_string(), n.ip.clone())).collect();

        for node in &self.topology.nodes {
            let client = AgentClient::new(&node.ip, self.agent_timeout);
            if let Err(e) = client.set_microservices_dest(&dest).await {
                warn!(node = node.id, error = %e, "microservices_dest broadcast failed");
            }
            if let Err(e) = client.set_microservices_ports(&ports).await {
                warn!(node = node.id, error = %e, "microservices_ports broadcast failed");
            }
            if let Err(e) = client.set_invocation_path(&path).await {
                warn!(node = node.id, error = %e, "invocation_path broadcast failed");
            }
            if let Err(e) = client.set_nodes_ips(&nodes_ips).await {
                warn!(node = node.id, error = %e, "nodes_ips broadcast failed");
            }
        }
    }

    async fn await_app_completion(&self) {
        let Some(signal) = &self.completion else { return };
        match signal.await_completion().await {
            Some(value) => info!(result = %value, "application run completed"),
            None => warn!("application completion signal timed out"),
        }
    }
}

fn short_id(id: &str) -> String {
    id.rsplit('/').next().unwrap_or(id).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgemesh_state::{Microservice, Node, Sla};
    use std::collections::BTreeSet;

    fn app_with_two_services() -> Application {
        Application {
            sla: Sla { availability: 0.0, e2e: 1000 },
            microservices: vec![
                Microservice {
                    id: "cosminava/m1".into(),
                    ram_req_mb: 1,
                    hdd_req_mb: 1,
                    container_port: "5001".into(),
                    external_port: "6001".into(),
                    dest: vec!["cosminava/m2".into()],
                },
                Microservice {
                    id: "cosminava/m2".into(),
                    ram_req_mb: 1,
                    hdd_req_mb: 1,
                    container_port: "5002".into(),
                    external_port: "6002".into(),
                    dest: vec![],
                },
            ],
        }
    }

    fn controller_with_two_nodes() -> Controller {
        let topology = Topology {
            nodes: vec![Node::new(1, "http://127.0.0.1:1", 0.0), Node::new(2, "http://127.0.0.1:2", 0.0)],
        };
        let store = StateStore::open_in_memory().unwrap();
        Controller::new(app_with_two_services(), topology, store, Duration::from_millis(50), Duration::from_millis(10))
    }

    #[test]
    fn short_id_strips_owner_prefix() {
        assert_eq!(short_id("cosminava/m1"), "m1");
        assert_eq!(short_id("m1"), "m1");
    }

    /// A node fails after placement; path is re-solved on the surviving node.
    #[test]
    fn degrading_placement_drops_only_the_failed_node() {
        let mut controller = controller_with_two_nodes();
        controller.placement.insert("cosminava/m1".into(), BTreeSet::from([1, 2]));
        controller.placement.insert("cosminava/m2".into(), BTreeSet::from([1]));

        controller.retire_node(1);
        controller.degrade_placement(1);

        assert!(controller.topology.node(1).is_none());
        assert_eq!(controller.placement["cosminava/m1"], BTreeSet::from([2]));
        assert!(controller.placement["cosminava/m2"].is_empty());
    }

    /// Both nodes required by a microservice fail; path solve is infeasible.
    #[test]
    fn degrading_every_candidate_node_leaves_an_unsolvable_path() {
        let mut controller = controller_with_two_nodes();
        controller.placement.insert("cosminava/m1".into(), BTreeSet::from([1, 2]));
        controller.placement.insert("cosminava/m2".into(), BTreeSet::from([1, 2]));

        controller.retire_node(1);
        controller.degrade_placement(1);
        controller.retire_node(2);
        controller.degrade_placement(2);

        assert!(controller.solve_path().is_err());
    }
}
