use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::TrackerConfig;
use crate::tracker::{Clock, SessionTracker, SystemClock, TrackerSnapshot, UsageUpdated};

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<SessionTracker>,
}

/// Owns the sampling loop and hands the tracker to it while running
///
/// The tracker is moved into the loop task on `start` and returned when the
/// task finishes, so only one task ever touches session state.
pub struct TrackingEngine {
    idle: Option<SessionTracker>,
    running: Option<RunningLoop>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    usage_updated: broadcast::Sender<UsageUpdated>,
    snapshots: watch::Receiver<TrackerSnapshot>,
}

impl TrackingEngine {
    #[must_use]
    pub fn new(tracker: SessionTracker, config: &TrackerConfig) -> Self {
        Self::with_clock(tracker, config, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        tracker: SessionTracker,
        config: &TrackerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            usage_updated: tracker.usage_updated(),
            snapshots: tracker.snapshots(),
            idle: Some(tracker),
            running: None,
            clock,
            tick_interval: config.tick_interval(),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Receive a signal each time a session has been persisted
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<UsageUpdated> {
        self.usage_updated.subscribe()
    }

    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshots.clone()
    }

    /// Start sampling; a no-op if already running
    ///
    /// # Errors
    ///
    /// Returns an error if a previous loop crashed and took the tracker with it
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            log::debug!("Tracking engine already running");
            return Ok(());
        }

        let mut tracker = self
            .idle
            .take()
            .ok_or_else(|| anyhow!("Tracking engine was lost after a crashed sampling loop"))?;
        tracker.reset_sample_clock();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(
            tracker,
            Arc::clone(&self.clock),
            self.tick_interval,
            cancel.clone(),
        ));

        self.running = Some(RunningLoop { cancel, handle });
        log::info!("Tracking engine started ({:?} cadence)", self.tick_interval);
        Ok(())
    }

    /// Stop sampling and close the open session at the current time.
    /// Returns once the loop has exited; a no-op if not running.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.cancel.cancel();
        match running.handle.await {
            Ok(mut tracker) => {
                tracker.close_current_session(self.clock.now()).await;
                tracker.reset_sample_clock();
                self.idle = Some(tracker);
                log::info!("Tracking engine stopped");
            }
            Err(e) => log::error!("Sampling loop ended abnormally: {e}"),
        }
    }
}

impl Drop for TrackingEngine {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

async fn sampling_loop(
    mut tracker: SessionTracker,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    cancel: CancellationToken,
) -> SessionTracker {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                log::debug!("Sampling loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                tracker.tick(clock.as_ref()).await;
            }
        }
    }

    tracker
}
