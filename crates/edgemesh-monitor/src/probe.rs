//! Raw TCP liveness probe: connect to `host:port` parsed from the node URL;
//! success within the bound means alive.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

/// `true` if a TCP connection to `host:port` succeeds within `bound`.
pub async fn tcp_probe(host_port: &str, bound: Duration) -> bool {
    matches!(
        timeout(bound, TcpStream::connect(host_port)).await,
        Ok(Ok(_))
    )
}
