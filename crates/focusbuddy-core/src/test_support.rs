//! Scriptable stand-ins for the probe, sink, advisory and clock.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use focusbuddy_storage::UsageSession;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use crate::focus::{FocusAdvisory, ReminderNotifier};
use crate::monitor::{WindowHandle, WindowProbe, UNKNOWN_PROCESS};
use crate::sink::SessionSink;
use crate::tracker::Clock;

#[derive(Default)]
pub struct FakeProbe {
    foreground: Mutex<Option<WindowHandle>>,
    windows: Mutex<HashMap<WindowHandle, (String, String)>>,
    minimized: Mutex<Vec<WindowHandle>>,
    foreground_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a window and give it focus
    pub fn focus(&self, raw: u64, process: &str, title: &str) -> WindowHandle {
        let handle = WindowHandle::new(raw);
        self.windows
            .lock()
            .unwrap()
            .insert(handle, (process.to_string(), title.to_string()));
        *self.foreground.lock().unwrap() = Some(handle);
        handle
    }

    pub fn clear_focus(&self) {
        *self.foreground.lock().unwrap() = None;
    }

    pub fn minimized(&self) -> Vec<WindowHandle> {
        self.minimized.lock().unwrap().clone()
    }

    pub fn foreground_calls(&self) -> usize {
        self.foreground_calls.load(Ordering::SeqCst)
    }

    /// Number of title or process lookups
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WindowProbe for FakeProbe {
    async fn foreground_handle(&self) -> Option<WindowHandle> {
        self.foreground_calls.fetch_add(1, Ordering::SeqCst);
        *self.foreground.lock().unwrap()
    }

    async fn title_of(&self, handle: WindowHandle) -> String {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.windows
            .lock()
            .unwrap()
            .get(&handle)
            .map(|(_, title)| title.clone())
            .unwrap_or_default()
    }

    async fn process_identity(&self, handle: WindowHandle) -> String {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.windows
            .lock()
            .unwrap()
            .get(&handle)
            .map_or_else(|| UNKNOWN_PROCESS.to_string(), |(process, _)| process.clone())
    }

    async fn minimize(&self, handle: WindowHandle) -> Result<()> {
        self.minimized.lock().unwrap().push(handle);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    sessions: Mutex<Vec<UsageSession>>,
    failing: AtomicBool,
    hanging: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Appends started while hanging never complete
    pub fn set_hanging(&self, hanging: bool) {
        self.hanging.store(hanging, Ordering::SeqCst);
    }

    pub fn sessions(&self) -> Vec<UsageSession> {
        self.sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionSink for RecordingSink {
    async fn append(&self, session: UsageSession) -> Result<()> {
        if self.hanging.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.sessions.lock().unwrap().push(session);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdvisoryMode {
    #[default]
    Ok,
    Fail,
    Panic,
    Hang,
}

#[derive(Default)]
pub struct CountingAdvisory {
    calls: Mutex<Vec<(WindowHandle, String, String)>>,
    mode: Mutex<AdvisoryMode>,
}

impl CountingAdvisory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&self, mode: AdvisoryMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn calls(&self) -> Vec<(WindowHandle, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FocusAdvisory for CountingAdvisory {
    async fn on_active_window(
        &self,
        handle: WindowHandle,
        process_name: &str,
        window_title: &str,
    ) -> Result<()> {
        self.calls.lock().unwrap().push((
            handle,
            process_name.to_string(),
            window_title.to_string(),
        ));
        let mode = *self.mode.lock().unwrap();
        match mode {
            AdvisoryMode::Ok => Ok(()),
            AdvisoryMode::Fail => anyhow::bail!("notification service unavailable"),
            AdvisoryMode::Panic => panic!("advisory blew up"),
            AdvisoryMode::Hang => std::future::pending().await,
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    reminders: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn reminders(&self) -> Vec<(String, String)> {
        self.reminders.lock().unwrap().clone()
    }
}

impl ReminderNotifier for RecordingNotifier {
    fn remind(&self, process_name: &str, window_title: &str) -> Result<()> {
        self.reminders
            .lock()
            .unwrap()
            .push((process_name.to_string(), window_title.to_string()));
        Ok(())
    }
}

/// Clock that only moves when told to
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap())
    }
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance_secs(&self, secs: i64) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
        *now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Clock that follows tokio time, so paused-time tests see timeouts elapse
pub struct TokioClock {
    base: DateTime<Utc>,
    origin: Instant,
}

impl TokioClock {
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + Duration::from_std(self.origin.elapsed()).unwrap()
    }
}
