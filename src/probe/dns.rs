//! DNS probe using the system resolver.

use std::net::SocketAddr;

use super::ProbeError;
use crate::target::Status;

/// Run a DNS probe: resolve `host` through the system resolver.
///
/// `Connected` when at least one address comes back, `Timeout` otherwise.
pub async fn run_dns_probe(host: &str) -> Status {
    match resolve(host, 0).await {
        Ok(addrs) => {
            tracing::debug!("DNS probe for {} resolved {} addresses", host, addrs.len());
            Status::Connected
        }
        Err(e) => {
            tracing::debug!("DNS probe for {} failed: {}", host, e);
            Status::Timeout
        }
    }
}

/// Resolve hostname to socket addresses on `port`.
pub(crate) async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, ProbeError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| ProbeError::Network(format!("DNS resolution failed: {}", e)))?
        .collect();

    if addrs.is_empty() {
        return Err(ProbeError::Network(format!("No addresses found for {}", host)));
    }

    Ok(addrs)
}
