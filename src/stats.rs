//! Rolling statistics: jitter and the composite quality score.

use std::time::Duration;

use crate::target::Status;

/// Population standard deviation of the given latency samples.
///
/// Returns zero when fewer than two samples are available.
pub fn jitter(samples: impl IntoIterator<Item = Duration>) -> Duration {
    let nanos: Vec<f64> = samples
        .into_iter()
        .map(|d| d.as_nanos() as f64)
        .collect();

    if nanos.len() < 2 {
        return Duration::ZERO;
    }

    let n = nanos.len() as f64;
    let mean = nanos.iter().sum::<f64>() / n;
    let variance = nanos.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    Duration::from_nanos(variance.sqrt() as u64)
}

/// Compute a 0-100 quality score for one target.
///
/// `bandwidth_mbps` is `Some` only for bandwidth-kind targets. Latency and
/// jitter tiers are exclusive (only the highest matching tier applies). The
/// status caps the result last and never raises it.
pub fn quality_score(
    latency: Duration,
    jitter: Duration,
    bandwidth_mbps: Option<f64>,
    status: Status,
) -> f64 {
    let mut score = 100.0;

    score -= match latency.as_millis() {
        ms if ms > 1000 => 60.0,
        ms if ms > 500 => 40.0,
        ms if ms > 200 => 20.0,
        ms if ms > 100 => 10.0,
        _ => 0.0,
    };

    score -= match jitter.as_millis() {
        ms if ms > 100 => 30.0,
        ms if ms > 50 => 20.0,
        ms if ms > 20 => 10.0,
        _ => 0.0,
    };

    if let Some(mbps) = bandwidth_mbps {
        if mbps >= 10.0 {
            score += 10.0;
        } else if mbps >= 5.0 {
            score += 5.0;
        } else if mbps < 1.0 {
            score -= 20.0;
        }
    }

    match status {
        Status::Error => score = 0.0,
        Status::Timeout => score = f64::min(score, 20.0),
        Status::Slow => score = f64::min(score, 60.0),
        Status::Connected | Status::Unknown => {}
    }

    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_jitter_needs_two_samples() {
        assert_eq!(jitter(Vec::<Duration>::new()), Duration::ZERO);
        assert_eq!(jitter([ms(250)]), Duration::ZERO);
    }

    #[test]
    fn test_jitter_constant_samples() {
        assert_eq!(jitter([ms(100), ms(100), ms(100), ms(100)]), Duration::ZERO);
    }

    #[test]
    fn test_jitter_population_stddev() {
        assert_eq!(jitter([ms(100), ms(200)]), ms(50));
        // mean 5, population variance 4
        let samples = [2, 4, 4, 4, 5, 5, 7, 9].map(ms);
        assert_eq!(jitter(samples), ms(2));
    }

    #[test]
    fn test_score_perfect_connection() {
        assert_eq!(quality_score(ms(20), ms(2), None, Status::Connected), 100.0);
    }

    #[test]
    fn test_score_latency_tiers() {
        let score = |l| quality_score(ms(l), Duration::ZERO, None, Status::Connected);
        assert_eq!(score(100), 100.0);
        assert_eq!(score(101), 90.0);
        assert_eq!(score(201), 80.0);
        assert_eq!(score(501), 60.0);
        assert_eq!(score(1001), 40.0);
    }

    #[test]
    fn test_score_jitter_tiers() {
        let score = |j| quality_score(ms(10), ms(j), None, Status::Connected);
        assert_eq!(score(20), 100.0);
        assert_eq!(score(21), 90.0);
        assert_eq!(score(51), 80.0);
        assert_eq!(score(101), 70.0);
    }

    #[test]
    fn test_score_bandwidth_adjustments() {
        let score = |bw| quality_score(ms(150), Duration::ZERO, Some(bw), Status::Connected);
        assert_eq!(score(12.0), 100.0);
        assert_eq!(score(5.0), 95.0);
        assert_eq!(score(3.0), 90.0);
        assert_eq!(score(0.5), 70.0);
        // only bandwidth targets are adjusted
        assert_eq!(quality_score(ms(150), Duration::ZERO, None, Status::Connected), 90.0);
    }

    #[test]
    fn test_score_status_ceilings() {
        assert_eq!(quality_score(ms(10), ms(1), None, Status::Slow), 60.0);
        assert_eq!(quality_score(ms(10), ms(1), None, Status::Timeout), 20.0);
        // a ceiling never raises an already lower score
        assert_eq!(quality_score(ms(1500), ms(150), None, Status::Slow), 10.0);
        assert_eq!(quality_score(ms(1500), ms(150), None, Status::Timeout), 10.0);
    }

    #[test]
    fn test_score_error_is_always_zero() {
        assert_eq!(quality_score(ms(1), Duration::ZERO, Some(50.0), Status::Error), 0.0);
        assert_eq!(quality_score(ms(10_000), ms(500), None, Status::Error), 0.0);
    }

    #[test]
    fn test_score_clamped() {
        let latencies = [0, 50, 150, 300, 700, 5_000, 60_000];
        let jitters = [0, 30, 80, 400];
        let bandwidths = [None, Some(0.0), Some(2.0), Some(7.0), Some(100.0)];
        let statuses = [
            Status::Unknown,
            Status::Connected,
            Status::Slow,
            Status::Timeout,
            Status::Error,
        ];
        for l in latencies {
            for j in jitters {
                for bw in bandwidths {
                    for s in statuses {
                        let score = quality_score(ms(l), ms(j), bw, s);
                        assert!((0.0..=100.0).contains(&score), "{l} {j} {bw:?} {s:?}");
                    }
                }
            }
        }
    }
}
