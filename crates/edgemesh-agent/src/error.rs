use thiserror::Error;

/// Non-2xx or I/O error talking to an agent. Bounded retries live at the
/// call site; this type just distinguishes the failure shapes a caller
/// might want to react to differently.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("http handshake with {addr} failed: {source}")]
    Handshake {
        addr: String,
        #[source]
        source: hyper::Error,
    },
    #[error("request to {addr} failed: {source}")]
    Request {
        addr: String,
        #[source]
        source: hyper::Error,
    },
    #[error("agent at {addr} returned non-2xx status {status}")]
    Status { addr: String, status: u16 },
    #[error("malformed response body from {addr}: {source}")]
    Malformed {
        addr: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("call to {addr} timed out")]
    Timeout { addr: String },
}

pub type AgentResult<T> = Result<T, AgentError>;
