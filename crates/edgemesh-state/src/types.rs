//! Core data model: Node, Microservice, Application, Placement, InvocationPath,
//! LatencyTable, and the JSON descriptor shapes they are parsed from.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Integer node identifier, as declared in the topology descriptor.
pub type NodeId = u64;

/// `"owner/name"` microservice identifier.
pub type MicroserviceId = String;

/// A declared edge node. `failure_prob` comes from the topology descriptor
/// and never changes during a run; `ram_bytes`/`hdd_bytes` are filled in by
/// the Resource Probe and are `None` until a successful probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub ip: String,
    pub failure_prob: f64,
    pub ram_bytes: Option<u64>,
    pub hdd_bytes: Option<u64>,
}

impl Node {
    pub fn new(id: NodeId, ip: impl Into<String>, failure_prob: f64) -> Self {
        Self {
            id,
            ip: ip.into(),
            failure_prob,
            ram_bytes: None,
            hdd_bytes: None,
        }
    }

    /// `host:port` as required by the raw TCP liveness probe. Returns `None`
    /// if `ip` isn't a `proto://host:port` URL.
    pub fn host_port(&self) -> Option<&str> {
        self.ip.split("://").nth(1)
    }
}

/// The declared pool of edge nodes for this run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    pub nodes: Vec<Node>,
}

impl Topology {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Remove a node by id, used when the Controller retires a failed node.
    pub fn retire(&mut self, id: NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        self.nodes.len() != before
    }
}

/// A microservice's resource needs and outbound dependency edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Microservice {
    pub id: MicroserviceId,
    pub ram_req_mb: u64,
    pub hdd_req_mb: u64,
    pub container_port: String,
    pub external_port: String,
    pub dest: Vec<MicroserviceId>,
}

impl Microservice {
    pub fn ram_req_bytes(&self) -> u64 {
        self.ram_req_mb * 1024 * 1024
    }

    pub fn hdd_req_bytes(&self) -> u64 {
        self.hdd_req_mb * 1024 * 1024
    }
}

/// The end-to-end availability and latency budget a deployment must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sla {
    pub availability: f64,
    pub e2e: i64,
}

/// The application descriptor: its microservices, in declared order, and the
/// SLA they must jointly satisfy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub sla: Sla,
    pub microservices: Vec<Microservice>,
}

impl Application {
    /// Microservice ids in the order they were declared. The Placement
    /// Solver's outer loop must iterate in this order.
    pub fn ordered_ids(&self) -> impl Iterator<Item = &MicroserviceId> {
        self.microservices.iter().map(|m| &m.id)
    }

    pub fn microservice(&self, id: &str) -> Option<&Microservice> {
        self.microservices.iter().find(|m| m.id == id)
    }

    /// All declared dependency edges `(u, v)` meaning "u depends on v".
    pub fn dependency_edges(&self) -> impl Iterator<Item = (&MicroserviceId, &MicroserviceId)> {
        self.microservices
            .iter()
            .flat_map(|m| m.dest.iter().map(move |d| (&m.id, d)))
    }
}

/// Mapping *microservice-id → set of node-ids* hosting its replicas. An
/// empty set for a microservice is a first-class degraded state, not an
/// error.
pub type Placement = BTreeMap<MicroserviceId, BTreeSet<NodeId>>;

/// Mapping *microservice-id → single node-id* drawn from `Placement`.
pub type InvocationPath = BTreeMap<MicroserviceId, NodeId>;

/// Symmetric `(node-id, node-id) → milliseconds` table with `d(n,n) = 0`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyTable {
    entries: HashMap<(NodeId, NodeId), u32>,
}

impl LatencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `d(a,b) = d(b,a) = ms` for a pair of distinct nodes.
    pub fn set(&mut self, a: NodeId, b: NodeId, ms: u32) {
        if a == b {
            return;
        }
        self.entries.insert(normalize(a, b), ms);
    }

    /// `d(n1, n2)`. `d(n,n)` is always `0`; any unrecorded distinct pair is
    /// treated as unreachable (`None`) rather than silently `0`.
    pub fn get(&self, n1: NodeId, n2: NodeId) -> Option<u32> {
        if n1 == n2 {
            return Some(0);
        }
        self.entries.get(&normalize(n1, n2)).copied()
    }
}

fn normalize(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Liveness state a watcher has most recently observed for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Up,
    Down,
}

// ---------------------------------------------------------------------
// JSON descriptor shapes. These mirror the on-disk format exactly;
// `From` impls below convert into the domain types above.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TopologyDescriptor {
    #[serde(rename = "IoTtopology")]
    pub io_t_topology: TopologyBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopologyBody {
    pub nodes: Vec<NodeDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeDescriptor {
    pub id: NodeId,
    pub ip: String,
    pub failure: f64,
}

impl From<TopologyDescriptor> for Topology {
    fn from(d: TopologyDescriptor) -> Self {
        Topology {
            nodes: d
                .io_t_topology
                .nodes
                .into_iter()
                .map(|n| Node::new(n.id, n.ip, n.failure))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationDescriptor {
    #[serde(rename = "IoTapplication")]
    pub io_t_application: ApplicationBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationBody {
    #[serde(rename = "SLA")]
    pub sla: Sla,
    pub microservices: Vec<MicroserviceDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MicroserviceDescriptor {
    pub id: MicroserviceId,
    #[serde(rename = "RAM")]
    pub ram: u64,
    #[serde(rename = "HDD")]
    pub hdd: u64,
    pub container_port: String,
    pub external_port: String,
    #[serde(default)]
    pub dest: Vec<DestRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DestRef {
    pub id: MicroserviceId,
}

impl From<ApplicationDescriptor> for Application {
    fn from(d: ApplicationDescriptor) -> Self {
        Application {
            sla: d.io_t_application.sla,
            microservices: d
                .io_t_application
                .microservices
                .into_iter()
                .map(|m| Microservice {
                    id: m.id,
                    ram_req_mb: m.ram,
                    hdd_req_mb: m.hdd,
                    container_port: m.container_port,
                    external_port: m.external_port,
                    dest: m.dest.into_iter().map(|d| d.id).collect(),
                })
                .collect(),
        }
    }
}
