//! Background fetcher: an interval loop around [`Ingestor::tick`] with an
//! explicit start/stop/status handle. Cloning the handle shares the state.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use super::ingestion::{Ingestor, TickSummary};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

struct RunningLoop {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RunningLoop {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

#[derive(Default)]
struct FetcherStats {
    ticks_completed: u64,
    last_tick: Option<TickSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetcherStatus {
    pub running: bool,
    pub status: &'static str,
    pub interval_seconds: u64,
    pub ticks_completed: u64,
    pub last_tick: Option<TickSummary>,
}

#[derive(Clone)]
pub struct Fetcher {
    ingestor: Arc<Ingestor>,
    period: Duration,
    control: Arc<Mutex<Option<RunningLoop>>>,
    stats: Arc<RwLock<FetcherStats>>,
}

impl Fetcher {
    pub fn new(ingestor: Arc<Ingestor>, period: Duration) -> Self {
        Self {
            ingestor,
            period,
            control: Arc::new(Mutex::new(None)),
            stats: Arc::new(RwLock::new(FetcherStats::default())),
        }
    }

    /// Spawn the loop. Returns `false` if it is already running. A loop that is
    /// still draining after `stop()` finishes its current post alongside the
    /// new one; inserts are idempotent.
    pub async fn start(&self) -> bool {
        let mut control = self.control.lock().await;
        if control.as_ref().is_some_and(RunningLoop::is_running) {
            warn!("Fetcher is already running");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.ingestor.clone(),
            self.stats.clone(),
            self.period,
            shutdown_rx,
        ));

        *control = Some(RunningLoop { shutdown_tx, handle });
        info!(interval_secs = self.period.as_secs(), "Background fetcher started");
        true
    }

    /// Signal the loop and wait for its in-flight post to finish. Returns
    /// `false` if it was not running.
    ///
    /// The control lock is released before waiting, so `status()` reports
    /// stopped straight away. Aborting after [`STOP_TIMEOUT`] is the last
    /// resort; it cannot split a post from its comments because the ingestor
    /// runs each post's writes in a detached task.
    pub async fn stop(&self) -> bool {
        let mut running = {
            let mut control = self.control.lock().await;
            match control.take() {
                Some(running) if running.is_running() => running,
                _ => {
                    warn!("Fetcher is not running");
                    return false;
                }
            }
        };

        let _ = running.shutdown_tx.send(true);
        match tokio::time::timeout(STOP_TIMEOUT, &mut running.handle).await {
            Ok(Ok(())) => info!("Background fetcher stopped"),
            Ok(Err(e)) => warn!(error = %e, "Background fetcher task ended abnormally"),
            Err(_) => {
                warn!("Background fetcher did not stop within timeout, aborting");
                running.handle.abort();
            }
        }
        true
    }

    pub async fn is_running(&self) -> bool {
        self.control
            .lock()
            .await
            .as_ref()
            .is_some_and(RunningLoop::is_running)
    }

    pub async fn status(&self) -> FetcherStatus {
        let running = self.is_running().await;
        let stats = self.stats.read().await;

        FetcherStatus {
            running,
            status: if running { "running" } else { "stopped" },
            interval_seconds: self.period.as_secs(),
            ticks_completed: stats.ticks_completed,
            last_tick: stats.last_tick.clone(),
        }
    }

    /// Run a single tick in the caller's task, outside the interval loop.
    pub async fn run_once(&self) -> TickSummary {
        let (_tx, rx) = watch::channel(false);
        let summary = self.ingestor.tick(&rx).await;
        record(&self.stats, &summary).await;
        summary
    }
}

async fn record(stats: &RwLock<FetcherStats>, summary: &TickSummary) {
    let mut stats = stats.write().await;
    stats.ticks_completed += 1;
    stats.last_tick = Some(summary.clone());
}

async fn run_loop(
    ingestor: Arc<Ingestor>,
    stats: Arc<RwLock<FetcherStats>>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Fetcher loop received shutdown signal");
                    break;
                }
            }
            _ = timer.tick() => {
                let summary = ingestor.tick(&shutdown_rx).await;
                record(&stats, &summary).await;
            }
        }
    }
}
