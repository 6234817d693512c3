//! Configuration module for linkwatch.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::probe::ProbeConfig;

/// How completed snapshots are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One tracing line per target plus a health summary.
    Log,
    /// The whole snapshot as a single JSON line on stdout.
    Json,
}

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between rounds (default: 2s)
    pub interval: Duration,
    /// Overall deadline for each probe (default: 5s)
    pub probe_timeout: Duration,
    /// Upper bound of the random delay before each probe (default: 100ms)
    pub max_stagger: Duration,
    /// Optional JSON catalog replacing the built-in targets
    pub catalog_path: Option<PathBuf>,
    pub output: OutputFormat,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(5),
            max_stagger: Duration::from_millis(100),
            catalog_path: None,
            output: OutputFormat::Log,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `LINKWATCH_INTERVAL_SECS`: seconds between rounds (default: 2)
    /// - `LINKWATCH_PROBE_TIMEOUT_SECS`: per-probe deadline in seconds (default: 5)
    /// - `LINKWATCH_MAX_STAGGER_MS`: max random pre-probe delay in ms (default: 100)
    /// - `LINKWATCH_CATALOG`: path to a JSON target catalog
    /// - `LINKWATCH_OUTPUT`: `log` or `json` (default: log)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let mut cfg = Self::default();

        if let Some(secs) =
            lookup("LINKWATCH_INTERVAL_SECS").and_then(|s| parse_positive_secs(&s))
        {
            cfg.interval = secs;
        }

        if let Some(secs) =
            lookup("LINKWATCH_PROBE_TIMEOUT_SECS").and_then(|s| parse_positive_secs(&s))
        {
            cfg.probe_timeout = secs;
        }

        if let Some(ms) =
            lookup("LINKWATCH_MAX_STAGGER_MS").and_then(|s| s.trim().parse::<u64>().ok())
        {
            cfg.max_stagger = Duration::from_millis(ms);
        }

        if let Some(path) = lookup("LINKWATCH_CATALOG").filter(|p| !p.trim().is_empty()) {
            cfg.catalog_path = Some(PathBuf::from(path));
        }

        if let Some(output) = lookup("LINKWATCH_OUTPUT") {
            match output.trim().to_ascii_lowercase().as_str() {
                "json" => cfg.output = OutputFormat::Json,
                "log" => cfg.output = OutputFormat::Log,
                other => tracing::warn!("Ignoring unknown LINKWATCH_OUTPUT value {:?}", other),
            }
        }

        cfg
    }

    /// Dispatch settings for the round runner.
    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            deadline: self.probe_timeout,
            max_stagger: self.max_stagger,
        }
    }
}

fn parse_positive_secs(s: &str) -> Option<Duration> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| *v > 0.0)
        .and_then(|v| Duration::try_from_secs_f64(v).ok())
}
