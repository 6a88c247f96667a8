//! edgemesh-agent — client for the node-agent RPC surface.
//!
//! The agent's own implementation (container runtime control, resource
//! measurement, message forwarding between containers) is an external
//! collaborator. This crate only speaks the nine-endpoint contract as a
//! client, using the same raw-hyper connect/handshake/send-request shape
//! the rest of this workspace uses for agent-facing HTTP, rather than
//! pulling in a new client library.

pub mod client;
pub mod error;
pub mod wire;

pub use client::AgentClient;
pub use error::{AgentError, AgentResult};
