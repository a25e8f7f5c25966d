use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Periodic work driven by the scheduler.
///
/// A job owns its state; the scheduler never runs two cycles of the same job
/// at once, so `run` may take `&mut self`.
#[async_trait]
pub trait Job: Send + 'static {
    fn name(&self) -> &str;

    async fn run(&mut self) -> anyhow::Result<()>;
}

/// A running timer with its cancellation token
struct RunningTimer {
    period: Duration,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns named periodic timers.
///
/// Ticks that arrive while a cycle is still running are skipped rather than
/// queued. Stopping a timer waits for the in-flight cycle, if any, to finish.
#[derive(Default)]
pub struct Scheduler {
    running: HashMap<String, RunningTimer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `job` every `period`, replacing any timer already registered
    /// under `name`. The first cycle runs immediately.
    pub async fn start<J: Job>(&mut self, name: &str, period: Duration, job: J) -> anyhow::Result<()> {
        self.start_delayed(name, period, Duration::ZERO, job).await
    }

    /// Like [`Scheduler::start`], but the first cycle runs after `first_run_after`
    pub async fn start_delayed<J: Job>(
        &mut self,
        name: &str,
        period: Duration,
        first_run_after: Duration,
        job: J,
    ) -> anyhow::Result<()> {
        if period.is_zero() {
            anyhow::bail!("timer {} needs a non-zero period", name);
        }
        if self.running.contains_key(name) {
            warn!(timer = %name, "Timer already running, restarting");
            self.stop(name).await;
        }

        info!(timer = %name, period_secs = period.as_secs_f64(), "Starting timer");

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let timer_name = name.to_string();
        let handle = tokio::spawn(async move {
            run_timer(timer_name, period, first_run_after, job, cancel_clone).await;
        });

        self.running.insert(
            name.to_string(),
            RunningTimer {
                period,
                cancel,
                handle,
            },
        );
        Ok(())
    }

    /// Stop a timer by name and wait for its current cycle to finish.
    /// Returns false if no such timer was running.
    pub async fn stop(&mut self, name: &str) -> bool {
        let Some(running) = self.running.remove(name) else {
            return false;
        };

        info!(timer = %name, "Stopping timer");
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            error!(timer = %name, "Timer task ended abnormally: {}", e);
        }
        true
    }

    /// Stop every timer. Each in-flight cycle completes first.
    pub async fn stop_all(&mut self) {
        let names: Vec<String> = self.running.keys().cloned().collect();
        for name in names {
            self.stop(&name).await;
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains_key(name)
    }

    /// Names and periods of the registered timers
    pub fn timers(&self) -> Vec<(String, Duration)> {
        let mut timers: Vec<(String, Duration)> = self
            .running
            .iter()
            .map(|(name, t)| (name.clone(), t.period))
            .collect();
        timers.sort();
        timers
    }
}

async fn run_timer<J: Job>(
    name: String,
    period: Duration,
    first_run_after: Duration,
    mut job: J,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + first_run_after, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(timer = %name, "Timer cancelled");
                break;
            }
            _ = interval.tick() => {}
        }

        // Not raced against cancellation: stop waits for the cycle to complete
        let started = Instant::now();
        match job.run().await {
            Ok(()) => {
                metrics::counter!("scheduler.cycles_total", "timer" => name.clone()).increment(1);
            }
            Err(e) => {
                error!(timer = %name, job = %job.name(), "Cycle failed: {:#}", e);
                metrics::counter!("scheduler.cycle_errors_total", "timer" => name.clone())
                    .increment(1);
            }
        }
        metrics::histogram!("scheduler.cycle_duration_seconds", "timer" => name.clone())
            .record(started.elapsed().as_secs_f64());
    }
}
