//! Failure Monitor.
//!
//! One independent watcher task per node URL. Liveness state machine is
//! intentionally just `Monitoring -> Down(terminal) | Stopped(terminal)` —
//! no `Recovered` transition, no backoff or threshold: a watcher probes
//! until its first failure, writes `down`, and exits. This is deliberately
//! simpler than `HealthTracker`-style self-healing; in-run recovery is
//! ruled out altogether.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use edgemesh_state::NodeStatus;

use crate::probe::tcp_probe;

/// `MonitorStatus`: node-url -> last observed liveness. Shared between
/// watcher tasks (writers) and the Controller (reader); reads take a
/// snapshot under a scoped read lock rather than holding it across awaits.
pub type MonitorStatus = Arc<RwLock<HashMap<String, NodeStatus>>>;

struct WatcherHandle {
    join: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Owns the watcher pool and the shared `MonitorStatus` map.
pub struct FailureMonitor {
    status: MonitorStatus,
    watchers: Arc<RwLock<HashMap<String, WatcherHandle>>>,
    probe_interval: Duration,
    probe_timeout: Duration,
}

impl FailureMonitor {
    pub fn new(probe_interval: Duration, probe_timeout: Duration) -> Self {
        Self {
            status: Arc::new(RwLock::new(HashMap::new())),
            watchers: Arc::new(RwLock::new(HashMap::new())),
            probe_interval,
            probe_timeout,
        }
    }

    /// Start a watcher for `node_url`. Idempotent: replaces any existing
    /// watcher for the same url, matching the startup contract of starting
    /// the monitor once per declared node.
    pub async fn start(&self, node_url: String) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let status = Arc::clone(&self.status);
        let interval = self.probe_interval;
        let timeout = self.probe_timeout;
        let url = node_url.clone();

        let join = tokio::spawn(run_watcher(url, status, interval, timeout, shutdown_rx));

        let mut watchers = self.watchers.write().await;
        if let Some(old) = watchers.insert(node_url, WatcherHandle { join, shutdown_tx }) {
            old.join.abort();
        }
    }

    /// Retire a node: signal its watcher to stop and remove its entry from
    /// `MonitorStatus`.
    pub async fn retire(&self, node_url: &str) {
        if let Some(handle) = self.watchers.write().await.remove(node_url) {
            let _ = handle.shutdown_tx.send(true);
            info!(%node_url, "watcher retired");
        }
        self.status.write().await.remove(node_url);
    }

    /// A consistent snapshot of `MonitorStatus` at this moment.
    pub async fn snapshot(&self) -> HashMap<String, NodeStatus> {
        self.status.read().await.clone()
    }

    /// Node urls currently flagged `down`.
    pub async fn down_nodes(&self) -> Vec<String> {
        self.status
            .read()
            .await
            .iter()
            .filter(|(_, s)| **s == NodeStatus::Down)
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub async fn is_monitoring(&self, node_url: &str) -> bool {
        self.watchers.read().await.contains_key(node_url)
    }
}

async fn run_watcher(
    node_url: String,
    status: MonitorStatus,
    interval: Duration,
    probe_timeout: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let host_port = node_url.split("://").nth(1).unwrap_or(&node_url);
                if tcp_probe(host_port, probe_timeout).await {
                    status.write().await.insert(node_url.clone(), NodeStatus::Up);
                    debug!(%node_url, "probe ok");
                } else {
                    status.write().await.insert(node_url.clone(), NodeStatus::Down);
                    info!(%node_url, "probe failed; watcher stopping");
                    return;
                }
            }
            _ = shutdown_rx.changed() => {
                debug!(%node_url, "watcher shut down by retirement signal");
                return;
            }
        }
    }
}
