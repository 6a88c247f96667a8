//! Node-agent RPC client. We are the HTTP *client* here — the agent itself
//! (container start, resource measurement, message forwarding) is an
//! external collaborator with an interface contract only.
//!
//! Connection handling is a raw hyper connect/handshake/send-request shape:
//! connect, do an http/1.1 handshake, send one request, drop the
//! connection. No connection pooling — agent calls are infrequent
//! control-plane traffic, not a hot path.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{AgentError, AgentResult};
use crate::wire::*;

const CONTROL_USERNAME: &str = "user";
const CONTROL_PASSWORD: &str = "requestaccess";

/// Client for one node agent, addressed by its base URL
/// (`proto://host:port`).
#[derive(Debug, Clone)]
pub struct AgentClient {
    host_port: String,
    timeout: Duration,
}

impl AgentClient {
    /// `node_url` is the full `proto://host:port` address; `call_timeout`
    /// bounds every request (20s is the default for control calls).
    pub fn new(node_url: &str, call_timeout: Duration) -> Self {
        let host_port = node_url.split("://").nth(1).unwrap_or(node_url).to_string();
        Self { host_port, timeout: call_timeout }
    }

    pub async fn get_resources(&self) -> AgentResult<ResourceReport> {
        let body = self.call(Method::GET, "/get_resources", None, true).await?;
        serde_json::from_slice(&body).map_err(|source| AgentError::Malformed {
            addr: self.host_port.clone(),
            source,
        })
    }

    pub async fn start_docker_container(&self, image: &str, exposed_port: &str, external_port: &str) -> AgentResult<()> {
        let req = StartContainerRequest(image.to_string(), exposed_port.to_string(), external_port.to_string());
        self.post_json("/start_docker_container", &req, true).await
    }

    pub async fn set_microservices_dest(&self, dest: &MicroserviceDestinations) -> AgentResult<()> {
        self.post_json("/microservices_dest", dest, true).await
    }

    pub async fn set_microservices_ports(&self, ports: &MicroservicePorts) -> AgentResult<()> {
        self.post_json("/microservices_ports", ports, true).await
    }

    pub async fn set_invocation_path(&self, path: &InvocationPathBody) -> AgentResult<()> {
        self.post_json("/invocation_path", path, true).await
    }

    pub async fn set_nodes_ips(&self, nodes_ips: &NodesIps) -> AgentResult<()> {
        self.post_json("/nodes_ips", nodes_ips, true).await
    }

    /// Anonymous: container-to-controller message, no basic auth required.
    pub async fn listening_containers(&self, short_id_or_last: &str, payload: serde_json::Value) -> AgentResult<()> {
        let req = ListeningContainersRequest(short_id_or_last.to_string(), payload);
        self.post_json("/listening_containers", &req, false).await
    }

    /// Anonymous, same as `listening_containers`.
    pub async fn forward_msgs(&self, short_id: &str, payload: serde_json::Value) -> AgentResult<()> {
        let req = ForwardMsgsRequest(short_id.to_string(), payload);
        self.post_json("/forward_msgs", &req, false).await
    }

    pub async fn get_app_results(&self) -> AgentResult<serde_json::Value> {
        let body = self.call(Method::GET, "/get_app_results", None, true).await?;
        serde_json::from_slice(&body).map_err(|source| AgentError::Malformed {
            addr: self.host_port.clone(),
            source,
        })
    }

    async fn post_json<T: serde::Serialize>(&self, path: &str, body: &T, authed: bool) -> AgentResult<()> {
        let bytes = serde_json::to_vec(body).expect("wire types always serialize");
        self.call(Method::POST, path, Some(bytes), authed).await?;
        Ok(())
    }

    async fn call(&self, method: Method, path: &str, body: Option<Vec<u8>>, authed: bool) -> AgentResult<Bytes> {
        let addr = self.host_port.clone();
        timeout(self.timeout, self.call_inner(method, path, body, authed))
            .await
            .map_err(|_| AgentError::Timeout { addr: addr.clone() })?
    }

    async fn call_inner(&self, method: Method, path: &str, body: Option<Vec<u8>>, authed: bool) -> AgentResult<Bytes> {
        let addr = self.host_port.clone();
        let stream = TcpStream::connect(&self.host_port)
            .await
            .map_err(|source| AgentError::Connect { addr: addr.clone(), source })?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|source| AgentError::Handshake { addr: addr.clone(), source })?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "agent connection driver ended");
            }
        });

        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", &self.host_port)
            .header("user-agent", "edgemesh-agent/0.1");
        if authed {
            let creds = BASE64.encode(format!("{CONTROL_USERNAME}:{CONTROL_PASSWORD}"));
            builder = builder.header(AUTHORIZATION, format!("Basic {creds}"));
        }

        let request = match body {
            Some(bytes) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(bytes)).map_err(|never| match never {}).boxed())
                .expect("well-formed request"),
            None => builder
                .body(Empty::<Bytes>::new().map_err(|never| match never {}).boxed())
                .expect("well-formed request"),
        };

        let response = sender
            .send_request(request)
            .await
            .map_err(|source| AgentError::Request { addr: addr.clone(), source })?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|source| AgentError::Request { addr: addr.clone(), source })?
            .to_bytes();

        if !status.is_success() {
            return Err(AgentError::Status { addr, status: status.as_u16() });
        }

        Ok(body)
    }
}
