//! Time-based trigger loop.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::cancel::CancelSignal;
use crate::monitor::{MonitorRunner, RunOutcome};
use crate::trigger::{Schedule, Trigger};

/// Fires the runner at every scheduled time until shut down.
///
/// Each invocation is independent: a fresh run id and report, nothing carried
/// over from the previous run. Shutdown also cancels an in-flight run.
pub struct Scheduler {
    schedule: Schedule,
}

impl Scheduler {
    pub fn new(schedule: Schedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Run until `shutdown` fires or `max_runs` invocations have completed.
    /// `on_outcome` sees every outcome as soon as its run finishes. Returns
    /// the number of runs executed.
    pub async fn run_loop<F>(
        &self,
        runner: &MonitorRunner,
        mut shutdown: CancelSignal,
        max_runs: Option<usize>,
        mut on_outcome: F,
    ) -> usize
    where
        F: FnMut(&RunOutcome),
    {
        let mut runs = 0usize;
        let mut last_fire: Option<DateTime<Utc>> = None;

        while max_runs.map_or(true, |max| runs < max) {
            let now = Utc::now();
            let from = last_fire.map_or(now, |last| last.max(now));
            let fire_time = self.schedule.next_after(from);
            let wait = (fire_time - now).to_std().unwrap_or_default();

            info!(next_run = %fire_time, wait_secs = wait.as_secs(), "Waiting for next scheduled run");

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Scheduler shutting down");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            let outcome = runner
                .run_with_cancel(Trigger::Scheduled { fire_time }, shutdown.clone())
                .await;
            on_outcome(&outcome);

            runs += 1;
            last_fire = Some(fire_time);

            if shutdown.is_cancelled() {
                break;
            }
        }

        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use crate::fakes::{ScriptedExecutor, ScriptedSetup};
    use crate::suite::CheckSuite;
    use std::sync::Arc;

    fn runner() -> MonitorRunner {
        MonitorRunner::new(
            Arc::new(ScriptedSetup::ok()),
            Arc::new(ScriptedExecutor::new()),
            vec![CheckSuite::command("a", "http://a", vec!["true".to_string()], 5)],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_runs_use_successive_slots() {
        let scheduler = Scheduler::new(Schedule::twice_daily());
        let mut fire_times = Vec::new();

        let runs = scheduler
            .run_loop(&runner(), CancelSignal::never(), Some(2), |outcome| {
                if let Some(report) = outcome.report() {
                    if let Trigger::Scheduled { fire_time } = report.trigger {
                        fire_times.push(fire_time);
                    }
                }
            })
            .await;

        assert_eq!(runs, 2);
        assert_eq!(fire_times.len(), 2);
        assert_eq!((fire_times[1] - fire_times[0]).num_hours(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_slot() {
        let scheduler = Scheduler::new(Schedule::twice_daily());
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let runs = scheduler.run_loop(&runner(), signal, None, |_| {}).await;
        assert_eq!(runs, 0);
    }
}
