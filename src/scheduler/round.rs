//! Round orchestration: probe every target once, concurrently.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::probe::{run_probe, Metric, ProbeConfig, ProbeOutcome, Prober};
use crate::target::{Status, Target};

/// Runs rounds of probes over a set of targets.
pub struct RoundRunner<P: Prober> {
    prober: Arc<P>,
    config: ProbeConfig,
}

impl<P: Prober> RoundRunner<P> {
    pub fn new(prober: P, config: ProbeConfig) -> Self {
        Self {
            prober: Arc::new(prober),
            config,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe every target once and return the updated copies, in input order.
    ///
    /// Each target is cloned into its own task, which probes it and folds the
    /// outcome into its histories and scores. The input slice is never
    /// modified. A task that dies marks only its own target `Error`.
    pub async fn run_round(&self, targets: &[Target]) -> Vec<Target> {
        let handles: Vec<_> = targets
            .iter()
            .cloned()
            .map(|mut target| {
                let prober = self.prober.clone();
                let config = self.config.clone();
                tokio::spawn(async move {
                    let outcome =
                        run_probe(prober.as_ref(), target.kind, &target.host, &config).await;
                    target.record(outcome, Utc::now());
                    target
                })
            })
            .collect();

        let mut updated = Vec::with_capacity(targets.len());
        for (handle, previous) in handles.into_iter().zip(targets) {
            match handle.await {
                Ok(target) => updated.push(target),
                Err(e) => {
                    tracing::error!("Probe task for {} failed: {}", previous.name, e);
                    let mut target = previous.clone();
                    target.record(
                        ProbeOutcome {
                            status: Status::Error,
                            latency: Duration::ZERO,
                            metric: Metric::None,
                        },
                        Utc::now(),
                    );
                    updated.push(target);
                }
            }
        }

        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeKind;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::time::Instant;

    /// Answers per host after a per-host delay.
    struct ScriptedProber {
        script: HashMap<String, (Duration, Status)>,
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn check(&self, _kind: ProbeKind, host: &str) -> (Status, Metric) {
            match self.script.get(host) {
                Some((delay, status)) => {
                    tokio::time::sleep(*delay).await;
                    (*status, Metric::None)
                }
                None => panic!("no script for {}", host),
            }
        }
    }

    fn runner(script: &[(&str, u64, Status)]) -> RoundRunner<ScriptedProber> {
        let script = script
            .iter()
            .map(|(host, ms, status)| (host.to_string(), (Duration::from_millis(*ms), *status)))
            .collect();
        let config = ProbeConfig {
            deadline: Duration::from_secs(5),
            max_stagger: Duration::ZERO,
        };
        RoundRunner::new(ScriptedProber { script }, config)
    }

    fn targets(hosts: &[&str]) -> Vec<Target> {
        hosts
            .iter()
            .map(|h| Target::new(h, ProbeKind::Reachability, h, "DNS"))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_updates_every_target_in_order() {
        let runner = runner(&[
            ("a", 30, Status::Connected),
            ("b", 10, Status::Slow),
            ("c", 20, Status::Error),
        ]);
        let before = targets(&["a", "b", "c"]);

        let after = runner.run_round(&before).await;

        let names: Vec<_> = after.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(after[0].status(), Status::Connected);
        assert_eq!(after[1].status(), Status::Slow);
        assert_eq!(after[2].status(), Status::Error);
        assert_eq!(after[2].quality_score(), 0.0);
        assert!(after.iter().all(|t| t.status_history().len() == 1));

        // the working copy never aliases the input
        assert!(before.iter().all(|t| t.status() == Status::Unknown));
        assert!(before.iter().all(|t| t.status_history().is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_target_times_out_alone() {
        let runner = runner(&[
            ("a", 50, Status::Connected),
            ("stuck", 60_000, Status::Connected),
            ("c", 50, Status::Slow),
            ("d", 50, Status::Connected),
        ]);
        let before = targets(&["a", "stuck", "c", "d"]);

        let start = Instant::now();
        let after = runner.run_round(&before).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(6));
        assert_eq!(after[1].status(), Status::Timeout);
        assert!(after[1].quality_score() <= 20.0);
        assert_eq!(after[0].status(), Status::Connected);
        assert_eq!(after[2].status(), Status::Slow);
        assert_eq!(after[3].status(), Status::Connected);
        // fast targets record their own latency, not the round's
        assert!(after[0].latency() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_panicking_task_marks_only_its_target() {
        let runner = runner(&[("a", 0, Status::Connected)]);
        let before = targets(&["a", "unscripted"]);

        let after = runner.run_round(&before).await;

        assert_eq!(after[0].status(), Status::Connected);
        assert_eq!(after[1].status(), Status::Error);
        assert_eq!(after[1].name, "unscripted");
        assert_eq!(after[1].status_history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_histories_bounded_across_rounds() {
        let runner = runner(&[("a", 15, Status::Connected)]);
        let mut current = targets(&["a"]);
        for _ in 0..40 {
            current = runner.run_round(&current).await;
        }
        assert_eq!(current[0].status_history().len(), 30);
        assert_eq!(current[0].latency_history().len(), 10);
    }
}
