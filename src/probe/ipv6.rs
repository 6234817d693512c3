//! IPv6 availability probe with an IPv4 fallback.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

use super::dns::resolve;
use super::{Metric, ProbeError};
use crate::target::Status;

const IPV6_PORT: u16 = 80;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Run an IPv6 probe against the given host.
///
/// Resolves the host, then tries its IPv6 addresses and, failing that, its
/// IPv4 addresses. `Connected` with IPv6, `Slow` when only IPv4 works,
/// `Timeout` when resolution fails and `Error` when nothing connects.
pub async fn run_ipv6_probe(host: &str) -> (Status, Metric) {
    check_ipv6(host, IPV6_PORT).await
}

async fn check_ipv6(host: &str, port: u16) -> (Status, Metric) {
    let addrs = match resolve(host, port).await {
        Ok(addrs) => addrs,
        Err(e) => {
            tracing::debug!("IPv6 probe for {} could not resolve: {}", host, e);
            return (Status::Timeout, Metric::Ipv6(false));
        }
    };

    let (v6, v4): (Vec<SocketAddr>, Vec<SocketAddr>) =
        addrs.into_iter().partition(|a| a.is_ipv6());

    match connect_any(&v6).await {
        Ok(addr) => {
            tracing::debug!("IPv6 probe for {} connected via {}", host, addr);
            return (Status::Connected, Metric::Ipv6(true));
        }
        Err(e) => tracing::debug!("IPv6 connect for {} failed: {}", host, e),
    }

    match connect_any(&v4).await {
        Ok(_) => (Status::Slow, Metric::Ipv6(false)),
        Err(e) => {
            tracing::debug!("IPv4 fallback for {} failed: {}", host, e);
            (Status::Error, Metric::Ipv6(false))
        }
    }
}

/// Connect to the first address that accepts, sharing one timeout.
async fn connect_any(addrs: &[SocketAddr]) -> Result<SocketAddr, ProbeError> {
    if addrs.is_empty() {
        return Err(ProbeError::Network("no addresses for this family".to_string()));
    }

    let attempt = async {
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(_stream) => return Ok(*addr),
                Err(e) => last_err = Some(e),
            }
        }
        Err(ProbeError::Network(format!(
            "failed to connect: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    };

    tokio::time::timeout(CONNECT_TIMEOUT, attempt)
        .await
        .unwrap_or(Err(ProbeError::Timeout(CONNECT_TIMEOUT)))
}
