use thiserror::Error;

/// Errors opening or operating the embedded state store.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open store: {0}")]
    Open(String),
    #[error("transaction failed: {0}")]
    Transaction(String),
    #[error("table operation failed: {0}")]
    Table(String),
    #[error("read failed: {0}")]
    Read(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("serialize failed: {0}")]
    Serialize(String),
    #[error("deserialize failed: {0}")]
    Deserialize(String),
}

pub type StateResult<T> = Result<T, StateError>;

/// Errors loading the Topology or Application descriptors from disk.
///
/// A malformed descriptor is fatal at startup — these errors are never
/// retried or downgraded to a degraded state.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to read descriptor file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed descriptor in {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type DescriptorResult<T> = Result<T, DescriptorError>;
