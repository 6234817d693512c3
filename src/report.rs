//! Plain summaries of a snapshot for logging.

use std::fmt;

use crate::probe::ProbeKind;
use crate::target::{Snapshot, Status, Target};

/// Sections listed first, in this order. Others follow in catalog order.
pub const SECTION_ORDER: [&str; 4] = ["DNS", "Web", "Speed", "Connectivity"];

/// Overall grade derived from the share of connected targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthGrade {
    Excellent,
    Good,
    Poor,
    Critical,
}

impl fmt::Display for HealthGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            HealthGrade::Excellent => "EXCELLENT",
            HealthGrade::Good => "GOOD",
            HealthGrade::Poor => "POOR",
            HealthGrade::Critical => "CRITICAL",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkHealth {
    pub connected: usize,
    pub total: usize,
    pub grade: HealthGrade,
}

impl NetworkHealth {
    pub fn from_targets(targets: &[Target]) -> Self {
        let total = targets.len();
        let connected = targets
            .iter()
            .filter(|t| t.status() == Status::Connected)
            .count();

        let percent = if total == 0 {
            0.0
        } else {
            connected as f64 / total as f64 * 100.0
        };

        let grade = match percent {
            p if p >= 80.0 => HealthGrade::Excellent,
            p if p >= 60.0 => HealthGrade::Good,
            p if p >= 40.0 => HealthGrade::Poor,
            _ => HealthGrade::Critical,
        };

        Self {
            connected,
            total,
            grade,
        }
    }
}

impl fmt::Display for NetworkHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Network Health: {} ({}/{} targets)",
            self.grade, self.connected, self.total
        )
    }
}

/// Group targets by section, known sections first.
pub fn group_by_section(targets: &[Target]) -> Vec<(&str, Vec<&Target>)> {
    let mut groups: Vec<(&str, Vec<&Target>)> = Vec::new();
    for target in targets {
        match groups.iter_mut().find(|(name, _)| *name == target.section) {
            Some((_, members)) => members.push(target),
            None => groups.push((target.section.as_str(), vec![target])),
        }
    }

    // Stable sort keeps first-seen order among unlisted sections
    groups.sort_by_key(|(name, _)| {
        SECTION_ORDER
            .iter()
            .position(|s| s == name)
            .unwrap_or(SECTION_ORDER.len())
    });
    groups
}

/// The kind-specific part of a target summary, if any.
pub fn metric_summary(target: &Target) -> Option<String> {
    match target.kind {
        ProbeKind::Bandwidth if target.bandwidth_mbps() > 0.0 => {
            Some(format!("down {:.1} Mbps", target.bandwidth_mbps()))
        }
        ProbeKind::Upload if target.upload_mbps() > 0.0 => {
            Some(format!("up {:.1} Mbps", target.upload_mbps()))
        }
        ProbeKind::Captive if target.status() != Status::Unknown => Some(
            if target.is_captive_portal() {
                "portal detected"
            } else {
                "no portal"
            }
            .to_string(),
        ),
        ProbeKind::Ipv6 if matches!(target.status(), Status::Connected | Status::Slow) => Some(
            if target.supports_ipv6() {
                "IPv6 available"
            } else {
                "IPv4 only"
            }
            .to_string(),
        ),
        ProbeKind::Traceroute if target.hop_count() > 0 => {
            Some(format!("{} hops", target.hop_count()))
        }
        _ => None,
    }
}

/// Share of recorded rounds that came back connected, as a percentage.
pub fn uptime_percent(target: &Target) -> Option<f64> {
    let history = target.status_history();
    if history.is_empty() {
        return None;
    }
    let connected = history.iter().filter(|s| **s == Status::Connected).count();
    Some(connected as f64 / history.len() as f64 * 100.0)
}

/// One-line summary of a target.
pub fn target_line(target: &Target) -> String {
    let mut line = format!("{:<16} {:<7}", target.name, target.status());

    if !target.latency().is_zero() {
        line.push_str(&format!(" {}ms", target.latency().as_millis()));
        if !target.jitter().is_zero() {
            line.push_str(&format!(" ±{}ms", target.jitter().as_millis()));
        }
    }
    if let Some(metric) = metric_summary(target) {
        line.push_str(&format!(" {}", metric));
    }
    if target.quality_score() > 0.0 {
        line.push_str(&format!(" Q:{:.0}", target.quality_score()));
    }
    if let Some(uptime) = uptime_percent(target) {
        let history = target.status_history();
        line.push_str(&format!(
            " up {:.0}% ({}/{})",
            uptime,
            history.len(),
            history.capacity()
        ));
    }
    if let Some(checked_at) = target.last_check() {
        line.push_str(&format!(" @{}", checked_at.format("%H:%M:%S")));
    }

    line
}

/// Log a completed snapshot, section by section.
pub fn log_snapshot(snapshot: &Snapshot) {
    tracing::info!(
        "Round {} at {}",
        snapshot.round,
        snapshot.completed_at.format("%H:%M:%S")
    );
    for (section, targets) in group_by_section(&snapshot.targets) {
        for target in targets {
            tracing::info!("[{}] {}", section, target_line(target));
        }
    }
    tracing::info!("{}", NetworkHealth::from_targets(&snapshot.targets));
}
