//! Per-target state and round snapshots.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use super::History;
use crate::catalog::TargetSpec;
use crate::probe::{Metric, ProbeKind, ProbeOutcome};
use crate::stats;

/// Capacity of the per-target status history.
pub const STATUS_HISTORY_LEN: usize = 30;
/// Capacity of the per-target latency window used for jitter.
pub const LATENCY_HISTORY_LEN: usize = 10;

/// Classification of a single probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unknown,
    Connected,
    Slow,
    Timeout,
    Error,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Connected => "GOOD",
            Status::Slow => "SLOW",
            Status::Timeout => "TIMEOUT",
            Status::Error => "ERROR",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// A monitored endpoint: catalog identity plus accumulated probe state.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    pub name: String,
    pub kind: ProbeKind,
    pub host: String,
    pub section: String,

    status: Status,
    last_check: Option<DateTime<Utc>>,
    status_history: History<Status>,

    #[serde(serialize_with = "serialize_millis")]
    latency: Duration,
    #[serde(serialize_with = "serialize_millis_history")]
    latency_history: History<Duration>,
    #[serde(serialize_with = "serialize_millis")]
    jitter: Duration,
    quality_score: f64,

    bandwidth_mbps: f64,
    upload_mbps: f64,
    is_captive_portal: bool,
    supports_ipv6: bool,
    hop_count: u32,
}

impl Target {
    pub fn new(name: &str, kind: ProbeKind, host: &str, section: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            host: host.to_string(),
            section: section.to_string(),
            status: Status::Unknown,
            last_check: None,
            status_history: History::with_capacity(STATUS_HISTORY_LEN),
            latency: Duration::ZERO,
            latency_history: History::with_capacity(LATENCY_HISTORY_LEN),
            jitter: Duration::ZERO,
            quality_score: 0.0,
            bandwidth_mbps: 0.0,
            upload_mbps: 0.0,
            is_captive_portal: false,
            supports_ipv6: false,
            hop_count: 0,
        }
    }

    /// Fold one probe outcome into this target.
    ///
    /// Updates status and latency, appends to both histories, then recomputes
    /// jitter and the quality score. Kind-specific fields take the outcome's
    /// metric, or reset to zero when the probe produced none.
    pub fn record(&mut self, outcome: ProbeOutcome, checked_at: DateTime<Utc>) {
        self.status = outcome.status;
        self.last_check = Some(checked_at);
        self.latency = outcome.latency;

        self.latency_history.push(outcome.latency);
        self.jitter = stats::jitter(self.latency_history.iter().copied());

        match self.kind {
            ProbeKind::Bandwidth => self.bandwidth_mbps = outcome.metric.mbps().unwrap_or(0.0),
            ProbeKind::Upload => self.upload_mbps = outcome.metric.mbps().unwrap_or(0.0),
            ProbeKind::Captive => {
                self.is_captive_portal = matches!(outcome.metric, Metric::CaptivePortal(true))
            }
            ProbeKind::Ipv6 => self.supports_ipv6 = matches!(outcome.metric, Metric::Ipv6(true)),
            ProbeKind::Traceroute => {
                self.hop_count = match outcome.metric {
                    Metric::Hops(n) => n,
                    _ => 0,
                }
            }
            _ => {}
        }

        let bandwidth = (self.kind == ProbeKind::Bandwidth).then_some(self.bandwidth_mbps);
        self.quality_score =
            stats::quality_score(self.latency, self.jitter, bandwidth, self.status);

        self.status_history.push(outcome.status);
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.last_check
    }

    pub fn status_history(&self) -> &History<Status> {
        &self.status_history
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    #[cfg(test)]
    pub fn latency_history(&self) -> &History<Duration> {
        &self.latency_history
    }

    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    pub fn quality_score(&self) -> f64 {
        self.quality_score
    }

    pub fn bandwidth_mbps(&self) -> f64 {
        self.bandwidth_mbps
    }

    pub fn upload_mbps(&self) -> f64 {
        self.upload_mbps
    }

    pub fn is_captive_portal(&self) -> bool {
        self.is_captive_portal
    }

    pub fn supports_ipv6(&self) -> bool {
        self.supports_ipv6
    }

    pub fn hop_count(&self) -> u32 {
        self.hop_count
    }
}

impl From<&TargetSpec> for Target {
    fn from(spec: &TargetSpec) -> Self {
        Target::new(&spec.name, spec.kind, &spec.host, &spec.section)
    }
}

/// The complete state of every target after one round.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Number of completed rounds; 0 for the initial, unprobed snapshot.
    pub round: u64,
    pub completed_at: DateTime<Utc>,
    pub targets: Vec<Target>,
}

impl Snapshot {
    pub fn initial(targets: Vec<Target>) -> Self {
        Self {
            round: 0,
            completed_at: Utc::now(),
            targets,
        }
    }
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

fn serialize_millis_history<S: Serializer>(h: &History<Duration>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(h.iter().map(|d| d.as_secs_f64() * 1000.0))
}
