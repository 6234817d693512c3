//! Reachability probe: a TCP connect to the DNS port.
//!
//! Stands in for ICMP echo, which needs raw-socket privileges.

use std::time::Duration;
use tokio::net::TcpStream;

use super::ProbeError;
use crate::target::Status;

/// Port used for the liveness connect.
pub const REACHABILITY_PORT: u16 = 53;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Run a reachability probe against the given host.
///
/// `Connected` when the connect succeeds, `Timeout` otherwise.
pub async fn run_reachability_probe(host: &str) -> Status {
    match tcp_connect(host, REACHABILITY_PORT, CONNECT_TIMEOUT).await {
        Ok(()) => Status::Connected,
        Err(e) => {
            tracing::debug!("Reachability probe for {} failed: {}", host, e);
            Status::Timeout
        }
    }
}

/// Open and immediately close a TCP connection to `host:port`.
pub(crate) async fn tcp_connect(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<(), ProbeError> {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(ProbeError::Network(format!("failed to connect: {}", e))),
        Err(_) => Err(ProbeError::Timeout(timeout)),
    }
}
