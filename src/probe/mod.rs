//! Probe module for network health checks.
//!
//! One strategy per probe kind, selected at a single dispatch point and run
//! under an overall deadline.

mod captive;
mod dns;
mod http;
mod ipv6;
mod reachability;
mod throughput;
mod traceroute;

pub use captive::*;
pub use dns::*;
pub use http::*;
pub use ipv6::*;
pub use reachability::*;
pub use throughput::*;
pub use traceroute::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::target::Status;

/// Probe error types.
///
/// Strategies use these internally and classify them into a [`Status`]
/// before returning.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid request: {0}")]
    Request(String),
    #[error("command failed: {0}")]
    Command(String),
}

impl ProbeError {
    /// Default classification: delays and connection failures are `Timeout`,
    /// everything that never reached the network is `Error`.
    pub fn status(&self) -> Status {
        match self {
            ProbeError::Timeout(_) | ProbeError::Network(_) => Status::Timeout,
            ProbeError::Request(_) | ProbeError::Command(_) => Status::Error,
        }
    }
}

/// The check strategy attached to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    #[serde(alias = "ping")]
    Reachability,
    Dns,
    Http,
    Bandwidth,
    Upload,
    Captive,
    Ipv6,
    Traceroute,
    /// A catalog kind this build does not know. Always probes as `Error`.
    #[serde(other)]
    Unrecognized,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Reachability => "reachability",
            ProbeKind::Dns => "dns",
            ProbeKind::Http => "http",
            ProbeKind::Bandwidth => "bandwidth",
            ProbeKind::Upload => "upload",
            ProbeKind::Captive => "captive",
            ProbeKind::Ipv6 => "ipv6",
            ProbeKind::Traceroute => "traceroute",
            ProbeKind::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeKind {
    type Err = std::convert::Infallible;

    /// Unknown names parse as [`ProbeKind::Unrecognized`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "reachability" | "ping" => ProbeKind::Reachability,
            "dns" => ProbeKind::Dns,
            "http" => ProbeKind::Http,
            "bandwidth" => ProbeKind::Bandwidth,
            "upload" => ProbeKind::Upload,
            "captive" => ProbeKind::Captive,
            "ipv6" => ProbeKind::Ipv6,
            "traceroute" => ProbeKind::Traceroute,
            _ => ProbeKind::Unrecognized,
        })
    }
}

/// Kind-specific measurement produced alongside a status.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Metric {
    #[default]
    None,
    /// Download or upload throughput in Mbps.
    Throughput(f64),
    /// Whether a captive portal intercepted the check.
    CaptivePortal(bool),
    /// Whether the host was reachable over IPv6.
    Ipv6(bool),
    Hops(u32),
}

impl Metric {
    pub fn mbps(&self) -> Option<f64> {
        match self {
            Metric::Throughput(v) => Some(*v),
            _ => None,
        }
    }
}

/// Result of one dispatched probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub status: Status,
    /// Wall-clock time from dispatch to completion (or to the deadline).
    pub latency: Duration,
    pub metric: Metric,
}

/// Dispatch configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Overall deadline for one probe, on top of each strategy's own timeout.
    pub deadline: Duration,
    /// Upper bound of the random delay before a probe starts.
    pub max_stagger: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(5),
            max_stagger: Duration::from_millis(100),
        }
    }
}

/// A source of probe results.
///
/// [`NetworkProber`] performs real network I/O; the seam exists so the round
/// orchestrator can run against anything that yields a status.
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    /// Run the strategy for `kind` against `host`, without the outer deadline.
    async fn check(&self, kind: ProbeKind, host: &str) -> (Status, Metric);
}

/// Runs the real strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkProber;

#[async_trait]
impl Prober for NetworkProber {
    async fn check(&self, kind: ProbeKind, host: &str) -> (Status, Metric) {
        match kind {
            ProbeKind::Reachability => (run_reachability_probe(host).await, Metric::None),
            ProbeKind::Dns => (run_dns_probe(host).await, Metric::None),
            ProbeKind::Http => (run_http_probe(host).await, Metric::None),
            ProbeKind::Bandwidth => run_bandwidth_probe(host).await,
            ProbeKind::Upload => run_upload_probe(host).await,
            ProbeKind::Captive => run_captive_probe(host).await,
            ProbeKind::Ipv6 => run_ipv6_probe(host).await,
            ProbeKind::Traceroute => run_traceroute_probe(host).await,
            ProbeKind::Unrecognized => (Status::Error, Metric::None),
        }
    }
}

/// Run one probe under the configured deadline.
///
/// Never fails: a strategy that overruns the deadline yields `Timeout` with no
/// metric, an unrecognized kind yields `Error` without touching the network.
pub async fn run_probe<P: Prober + ?Sized>(
    prober: &P,
    kind: ProbeKind,
    host: &str,
    config: &ProbeConfig,
) -> ProbeOutcome {
    if kind == ProbeKind::Unrecognized {
        tracing::warn!("Unrecognized probe kind for {}", host);
        return ProbeOutcome {
            status: Status::Error,
            latency: Duration::ZERO,
            metric: Metric::None,
        };
    }

    // Spread out concurrent probes
    let max_stagger = config.max_stagger.as_millis() as u64;
    if max_stagger > 0 {
        let stagger = rand::random::<u64>() % max_stagger;
        tokio::time::sleep(Duration::from_millis(stagger)).await;
    }

    let start = Instant::now();
    let result = tokio::time::timeout(config.deadline, prober.check(kind, host)).await;
    let latency = start.elapsed();

    match result {
        Ok((status, metric)) => {
            tracing::debug!("{} probe for {}: {} in {:?}", kind, host, status, latency);
            ProbeOutcome {
                status,
                latency,
                metric,
            }
        }
        Err(_) => {
            tracing::debug!("{} probe for {} exceeded {:?}", kind, host, config.deadline);
            ProbeOutcome {
                status: Status::Timeout,
                latency,
                metric: Metric::None,
            }
        }
    }
}

/// Build an HTTP client for a probe.
///
/// Proxies are bypassed so the measurement reflects the direct path.
pub(crate) fn build_client(
    timeout: Duration,
    follow_redirects: bool,
) -> Result<reqwest::Client, ProbeError> {
    let redirect = if follow_redirects {
        reqwest::redirect::Policy::default()
    } else {
        reqwest::redirect::Policy::none()
    };

    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(redirect)
        .user_agent(concat!("linkwatch/", env!("CARGO_PKG_VERSION")))
        .no_proxy()
        .build()
        .map_err(|e| ProbeError::Request(e.to_string()))
}

/// Classify a reqwest failure.
pub(crate) fn request_error(e: reqwest::Error, timeout: Duration) -> ProbeError {
    if e.is_builder() {
        ProbeError::Request(e.to_string())
    } else if e.is_timeout() {
        ProbeError::Timeout(timeout)
    } else {
        ProbeError::Network(e.to_string())
    }
}
