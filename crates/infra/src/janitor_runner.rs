use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use gatekeeper_auth::{Janitor, PurgeReport};

/// Config for the background janitor.
#[derive(Debug, Clone)]
pub struct JanitorRunner {
    pub interval: Duration,
    pub run_on_start: bool,
}

impl Default for JanitorRunner {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            run_on_start: true,
        }
    }
}

/// Progress published after every pass, successful or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStatus {
    pub passes: u64,
    pub failures: u64,
    pub last_report: Option<PurgeReport>,
}

/// Handle for the running janitor (shutdown + trigger hook).
#[derive(Debug)]
pub struct JanitorRunnerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    trigger: mpsc::Sender<()>,
    status: watch::Receiver<RunnerStatus>,
    join: Option<JoinHandle<()>>,
}

impl JanitorRunnerHandle {
    /// Request an out-of-schedule pass.
    ///
    /// Triggers are coalesced: while one is pending further calls are no-ops.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    pub fn status(&self) -> watch::Receiver<RunnerStatus> {
        self.status.clone()
    }

    /// Stop the runner and wait for an in-flight pass to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!(error = %e, "janitor runner task ended abnormally");
            }
        }
    }
}

impl JanitorRunner {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Spawn the runner on the current tokio runtime.
    ///
    /// - Schedule: every `interval`, plus once at start when `run_on_start`
    /// - On demand: `handle.trigger()`
    /// - Failures: logged, never propagated; the next pass runs on schedule
    pub fn spawn(&self, name: &'static str, janitor: Arc<Janitor>) -> JanitorRunnerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::channel::<()>(1);
        let (status_tx, status_rx) = watch::channel(RunnerStatus::default());

        let join = tokio::spawn(runner_loop(
            name,
            self.clone(),
            janitor,
            shutdown_rx,
            trigger_rx,
            status_tx,
        ));

        JanitorRunnerHandle {
            shutdown: Some(shutdown_tx),
            trigger: trigger_tx,
            status: status_rx,
            join: Some(join),
        }
    }
}

async fn runner_loop(
    name: &'static str,
    cfg: JanitorRunner,
    janitor: Arc<Janitor>,
    mut shutdown_rx: oneshot::Receiver<()>,
    mut trigger_rx: mpsc::Receiver<()>,
    status_tx: watch::Sender<RunnerStatus>,
) {
    info!(runner = name, interval_secs = cfg.interval.as_secs(), "janitor runner started");

    let mut ticker = tokio::time::interval_at(Instant::now() + cfg.interval, cfg.interval);
    // Keep a stable cadence even if a pass overran.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut pending = cfg.run_on_start;

    loop {
        if !pending {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {}
                Some(()) = trigger_rx.recv() => {}
            }
        }
        pending = false;

        match janitor.purge_all().await {
            Ok(report) => status_tx.send_modify(|s| {
                s.passes += 1;
                s.last_report = Some(report);
            }),
            Err(e) => {
                warn!(runner = name, error = %e, "janitor pass failed");
                status_tx.send_modify(|s| {
                    s.passes += 1;
                    s.failures += 1;
                });
            }
        }
    }

    info!(runner = name, "janitor runner stopped");
}
