//! Wire shapes for the node-agent RPC surface. These mirror the JSON
//! bodies exactly; nothing here is a domain type in its own right.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Response body of `GET /get_resources`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceReport {
    #[serde(rename = "RAM")]
    pub ram_bytes: u64,
    #[serde(rename = "HDD")]
    pub hdd_bytes: u64,
    #[serde(rename = "CPU")]
    pub cpu_percent: Vec<f64>,
    #[serde(rename = "CPU_cores")]
    pub cpu_cores: u32,
    #[serde(rename = "CPU_logical_cores")]
    pub cpu_logical_cores: u32,
    #[serde(rename = "IP")]
    pub ip: String,
}

/// Body of `POST /start_docker_container`: `[image, exposed_port, external_port]`.
#[derive(Debug, Clone, Serialize)]
pub struct StartContainerRequest(pub String, pub String, pub String);

/// Body of `POST /microservices_dest`: `{short_id -> [dep_short_id, ...]}`.
pub type MicroserviceDestinations = HashMap<String, Vec<String>>;

/// Body of `POST /microservices_ports`: `{full_id -> [container_port, external_port]}`.
pub type MicroservicePorts = HashMap<String, (String, String)>;

/// Body of `POST /invocation_path`: `{full_id -> node_id}`.
pub type InvocationPathBody = HashMap<String, u64>;

/// Body of `POST /nodes_ips`: `{node_id -> url}`, node id as a string key
/// since it is the JSON object key.
pub type NodesIps = HashMap<String, String>;

/// Body of `POST /listening_containers`: `[short_id_or_"last", payload]`.
/// The payload shape is opaque to the core (application-chain concern).
#[derive(Debug, Clone, Serialize)]
pub struct ListeningContainersRequest(pub String, pub serde_json::Value);

/// Body of `POST /forward_msgs`: `[short_id, payload]`.
#[derive(Debug, Clone, Serialize)]
pub struct ForwardMsgsRequest(pub String, pub serde_json::Value);
