//! Foreground session state machine.
//!
//! `SessionTracker` is owned by exactly one sampling loop. Each tick it probes
//! the foreground window; when focus moves it closes the open session, hands it
//! to the sink, and opens a session for the new window. Sink writes and focus
//! advisories run inside the tick but are bounded by a timeout and isolated, so
//! their failures never stop sampling.


use anyhow::Result;
use chrono::{DateTime, Utc};
use focusbuddy_storage::UsageSession;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

use crate::classifier::CategoryResolver;
use crate::config::TrackerConfig;
use crate::focus::FocusAdvisory;
use crate::monitor::{is_lock_screen, WindowHandle, WindowProbe};
use crate::sink::SessionSink;

/// Fired after a session has been persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageUpdated;

/// Read-only view of the tracked window for status displays
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerSnapshot {
    pub process_name: Option<String>,
    pub window_title: Option<String>,
    pub category: Option<String>,
    pub session_start: Option<DateTime<Utc>>,
}

/// Wall-clock source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The session currently being tracked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSession {
    pub handle: WindowHandle,
    pub process_name: String,
    pub window_title: String,
    pub category: String,
    pub started_at: DateTime<Utc>,
}

pub struct SessionTracker {
    probe: Arc<dyn WindowProbe>,
    resolver: CategoryResolver,
    sink: Arc<dyn SessionSink>,
    advisory: Arc<dyn FocusAdvisory>,
    usage_updated: broadcast::Sender<UsageUpdated>,
    snapshot: watch::Sender<TrackerSnapshot>,
    sleep_gap_threshold: Duration,
    side_effect_timeout: Duration,
    current: Option<OpenSession>,
    last_sample: Option<DateTime<Utc>>,
}

impl SessionTracker {
    #[must_use]
    pub fn new(
        probe: Arc<dyn WindowProbe>,
        resolver: CategoryResolver,
        sink: Arc<dyn SessionSink>,
        advisory: Arc<dyn FocusAdvisory>,
        config: &TrackerConfig,
    ) -> Self {
        let (usage_updated, _) = broadcast::channel(16);
        let (snapshot, _) = watch::channel(TrackerSnapshot::default());

        Self {
            probe,
            resolver,
            sink,
            advisory,
            usage_updated,
            snapshot,
            sleep_gap_threshold: config.sleep_gap_threshold(),
            side_effect_timeout: config.side_effect_timeout(),
            current: None,
            last_sample: None,
        }
    }

    /// Sender side of the completion signal; subscribe to be told when a session closes
    #[must_use]
    pub fn usage_updated(&self) -> broadcast::Sender<UsageUpdated> {
        self.usage_updated.clone()
    }

    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshot.subscribe()
    }

    #[must_use]
    pub fn current_session(&self) -> Option<&OpenSession> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.current.is_some()
    }

    /// Forget the last sample time so the next tick cannot be mistaken for a resume
    pub fn reset_sample_clock(&mut self) {
        self.last_sample = None;
    }

    /// One iteration of the sampling loop
    ///
    /// The gap to the previous tick is measured from when that tick finished, so time
    /// spent waiting on side effects is never mistaken for sleep.
    pub async fn tick(&mut self, clock: &dyn Clock) {
        let now = clock.now();
        if let Some(last) = self.last_sample {
            // A negative gap (clock moved backwards) fails to convert and is ignored
            if let Ok(gap) = now.signed_duration_since(last).to_std() {
                if gap > self.sleep_gap_threshold {
                    self.apply_sleep_gap(gap);
                }
            }
        }

        self.sample(now).await;
        self.last_sample = Some(clock.now());
    }

    /// Push the session start past a sleep/suspend gap so it is not counted as usage
    fn apply_sleep_gap(&mut self, gap: Duration) {
        let Some(session) = self.current.as_mut() else {
            return;
        };
        let Ok(shift) = chrono::Duration::from_std(gap) else {
            return;
        };

        session.started_at += shift;
        log::info!(
            "Detected {}s sleep gap, excluding it from {}",
            shift.num_seconds(),
            session.process_name
        );
    }

    async fn sample(&mut self, now: DateTime<Utc>) {
        let Some(handle) = self.probe.foreground_handle().await else {
            return;
        };

        if self.current.as_ref().is_some_and(|s| s.handle == handle) {
            return;
        }

        self.close_current_session(now).await;

        let process_name = self.probe.process_identity(handle).await;
        if is_lock_screen(&process_name) {
            log::debug!("Lock screen in focus, not tracking");
            return;
        }

        let window_title = self.probe.title_of(handle).await;
        let category = self.resolver.resolve(&process_name, &window_title);
        log::info!("Focus changed to {process_name} ({category})");

        self.current = Some(OpenSession {
            handle,
            process_name: process_name.clone(),
            window_title: window_title.clone(),
            category: category.clone(),
            started_at: now,
        });
        self.snapshot.send_replace(TrackerSnapshot {
            process_name: Some(process_name.clone()),
            window_title: Some(window_title.clone()),
            category: Some(category),
            session_start: Some(now),
        });

        let advisory = Arc::clone(&self.advisory);
        self.run_side_effect("focus advisory", async move {
            advisory
                .on_active_window(handle, &process_name, &window_title)
                .await
        })
        .await;
    }

    /// Close the open session at `end`, persisting it if it lasted at least a second.
    /// Always leaves the tracker idle.
    pub async fn close_current_session(&mut self, end: DateTime<Utc>) {
        let Some(open) = self.current.take() else {
            return;
        };
        self.snapshot.send_replace(TrackerSnapshot::default());

        let Some(session) = UsageSession::from_interval(
            open.process_name,
            open.window_title,
            open.category,
            open.started_at,
            end,
        ) else {
            log::debug!("Discarding session with non-positive duration");
            return;
        };

        let sink = Arc::clone(&self.sink);
        let stored = self
            .run_side_effect("session sink", async move { sink.append(session).await })
            .await;

        if stored {
            // No subscribers is fine
            let _ = self.usage_updated.send(UsageUpdated);
        }
    }

    /// Run `effect` on its own task, waiting at most `side_effect_timeout`.
    /// Errors, panics and timeouts are logged; returns whether it completed successfully.
    async fn run_side_effect<F>(&self, what: &str, effect: F) -> bool
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let task = tokio::spawn(effect);

        match tokio::time::timeout(self.side_effect_timeout, task).await {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(e))) => {
                log::warn!("{what} failed: {e:#}");
                false
            }
            Ok(Err(e)) => {
                log::error!("{what} panicked: {e}");
                false
            }
            Err(_) => {
                log::warn!(
                    "{what} still running after {:?}, continuing without it",
                    self.side_effect_timeout
                );
                false
            }
        }
    }
}
