//! Resource Probe.
//!
//! Runs once per adaptation round's startup: for every declared node, ask
//! its agent for a resource report, bounded by a per-node timeout, and feed
//! the result back into the Topology the Placement Solver reads. A probe
//! failure drops the node from this round's candidate set; `failure_prob`
//! itself is never touched, since that always comes from the descriptor.

use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{info, warn};

use edgemesh_agent::AgentClient;
use edgemesh_state::{NodeId, Topology};

/// Probe every node in `topology` in parallel and write back `ram_bytes`/
/// `hdd_bytes` for the ones that answer within `call_timeout`. Nodes that
/// fail to answer are left with `None` resources and are excluded from
/// placement this round (they are not removed from the topology itself;
/// that only happens via `FailureMonitor`-driven retirement).
pub async fn probe_resources(topology: &mut Topology, call_timeout: Duration) {
    let mut set: JoinSet<(NodeId, Option<(u64, u64)>)> = JoinSet::new();

    for node in &topology.nodes {
        let client = AgentClient::new(&node.ip, call_timeout);
        let id = node.id;
        set.spawn(async move {
            match client.get_resources().await {
                Ok(report) => (id, Some((report.ram_bytes, report.hdd_bytes))),
                Err(e) => {
                    warn!(node = id, error = %e, "resource probe failed");
                    (id, None)
                }
            }
        });
    }

    let mut probed = 0usize;
    while let Some(joined) = set.join_next().await {
        let (id, resources) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "resource probe task panicked");
                continue;
            }
        };
        if let Some((ram, hdd)) = resources {
            if let Some(node) = topology.node_mut(id) {
                node.ram_bytes = Some(ram);
                node.hdd_bytes = Some(hdd);
                probed += 1;
            }
        }
    }
    info!(probed, total = topology.nodes.len(), "resource probe complete");
}
