//! Route-hop estimation via the system `traceroute` utility.

use regex::Regex;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;

use super::reachability::{tcp_connect, REACHABILITY_PORT};
use super::{Metric, ProbeError};
use crate::target::Status;

const MAX_HOPS: u32 = 15;

/// Hop count reported when `traceroute` is unavailable but the host answers.
pub const FALLBACK_HOP_ESTIMATE: u32 = 12;

const FALLBACK_TIMEOUT: Duration = Duration::from_secs(3);

/// Classify a measured hop count.
pub fn classify_hops(hops: u32) -> Status {
    match hops {
        0..=10 => Status::Connected,
        11..=20 => Status::Slow,
        _ => Status::Timeout,
    }
}

/// Count the hop lines in `traceroute` output.
///
/// A hop line starts with its hop number and carries either a timing or a
/// `*` for an unanswered probe.
pub fn count_hops(output: &str) -> u32 {
    static HOP_LINE: OnceLock<Regex> = OnceLock::new();
    let re = HOP_LINE.get_or_init(|| {
        Regex::new(r"^\s*\d+\s+.*(\d\s*ms|\*)").expect("hop line pattern is valid")
    });

    output.lines().filter(|line| re.is_match(line)).count() as u32
}

/// Run a traceroute probe against the given host.
///
/// Falls back to a reachability connect when the utility cannot run; a
/// successful fallback reports [`FALLBACK_HOP_ESTIMATE`] hops as `Connected`.
pub async fn run_traceroute_probe(host: &str) -> (Status, Metric) {
    match run_traceroute_command(host).await {
        Ok(output) => {
            let hops = count_hops(&output);
            (classify_hops(hops), Metric::Hops(hops))
        }
        Err(e) => {
            tracing::warn!("traceroute unavailable for {}, estimating: {}", host, e);
            estimate_hops(host).await
        }
    }
}

async fn run_traceroute_command(host: &str) -> Result<String, ProbeError> {
    let output = Command::new("traceroute")
        .args(["-m", &MAX_HOPS.to_string(), "-w", "1", host])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ProbeError::Command(format!("failed to execute traceroute: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbeError::Command(format!("traceroute failed: {}", stderr.trim())));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

async fn estimate_hops(host: &str) -> (Status, Metric) {
    estimate_hops_on(host, REACHABILITY_PORT).await
}

async fn estimate_hops_on(host: &str, port: u16) -> (Status, Metric) {
    match tcp_connect(host, port, FALLBACK_TIMEOUT).await {
        Ok(()) => (Status::Connected, Metric::Hops(FALLBACK_HOP_ESTIMATE)),
        Err(e) => {
            tracing::debug!("Hop estimate for {} failed: {}", host, e);
            (Status::Error, Metric::Hops(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX_OUTPUT: &str = r#"traceroute to 8.8.8.8 (8.8.8.8), 15 hops max, 60 byte packets
 1  _gateway (192.168.1.1)  1.123 ms  1.045 ms  0.998 ms
 2  10.0.0.1 (10.0.0.1)  8.532 ms  8.611 ms  8.590 ms
 3  * * *
 4  72.14.215.85 (72.14.215.85)  12.345 ms  12.001 ms  11.870 ms
 5  dns.google (8.8.8.8)  13.104 ms  13.222 ms  13.010 ms"#;

    #[test]
    fn test_count_hops_linux() {
        assert_eq!(count_hops(LINUX_OUTPUT), 5);
    }

    #[test]
    fn test_count_hops_ignores_noise() {
        assert_eq!(count_hops(""), 0);
        assert_eq!(count_hops("traceroute: unknown host example.invalid"), 0);
    }

    #[test]
    fn test_classify_hops() {
        assert_eq!(classify_hops(5), Status::Connected);
        assert_eq!(classify_hops(10), Status::Connected);
        assert_eq!(classify_hops(11), Status::Slow);
        assert_eq!(classify_hops(20), Status::Slow);
        assert_eq!(classify_hops(21), Status::Timeout);
    }

    #[tokio::test]
    async fn test_fallback_success_reports_estimate() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert_eq!(
            estimate_hops_on("127.0.0.1", port).await,
            (Status::Connected, Metric::Hops(FALLBACK_HOP_ESTIMATE))
        );
        assert_eq!(FALLBACK_HOP_ESTIMATE, 12);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_error() {
        assert_eq!(estimate_hops("256.256.256.256").await, (Status::Error, Metric::Hops(0)));
    }
}
