//! Focus mode: distraction reminders raised when a blacklisted app takes focus.

use anyhow::{Context, Result};
use async_trait::async_trait;
use focusbuddy_storage::{AppSettings, SettingsStore};
use std::sync::Arc;
use tokio::sync::watch;

use crate::monitor::{WindowHandle, WindowProbe};

/// Called once per focus change that opens a session
#[async_trait]
pub trait FocusAdvisory: Send + Sync {
    async fn on_active_window(
        &self,
        handle: WindowHandle,
        process_name: &str,
        window_title: &str,
    ) -> Result<()>;
}

/// Surfaces a distraction reminder to the user
pub trait ReminderNotifier: Send + Sync {
    fn remind(&self, process_name: &str, window_title: &str) -> Result<()>;
}

/// Writes reminders to the log
pub struct LogNotifier;

impl ReminderNotifier for LogNotifier {
    fn remind(&self, process_name: &str, window_title: &str) -> Result<()> {
        log::warn!(
            "Focus reminder: {process_name} is marked as distracting. Window: {window_title}"
        );
        Ok(())
    }
}

/// Persisted focus-mode settings plus the channel that hands out snapshots
pub struct FocusSettings {
    store: SettingsStore,
    tx: watch::Sender<AppSettings>,
}

impl FocusSettings {
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be loaded
    pub fn new(store: SettingsStore) -> Result<Self> {
        let settings = store.load()?;
        let (tx, _rx) = watch::channel(settings);
        Ok(Self { store, tx })
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AppSettings> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> AppSettings {
        self.tx.borrow().clone()
    }

    /// Re-read the settings file and publish it
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read; the previous snapshot stays published
    pub fn reload(&self) -> Result<()> {
        let settings = self.store.load()?;
        log::info!(
            "Reloaded settings (focus mode: {}, {} blacklisted)",
            settings.focus_mode_enabled,
            settings.focus_mode_blacklist.len()
        );
        self.tx.send_replace(settings);
        Ok(())
    }

    /// Apply `edit` to a copy of the current settings, persist it, then publish it
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be written
    pub fn update(&self, edit: impl FnOnce(&mut AppSettings)) -> Result<AppSettings> {
        let mut settings = self.current();
        edit(&mut settings);
        self.store
            .save(&settings)
            .context("Failed to save settings")?;
        self.tx.send_replace(settings.clone());
        Ok(settings)
    }
}

/// Focus advisory backed by the user's focus-mode settings
pub struct FocusModeAdvisor {
    settings: watch::Receiver<AppSettings>,
    notifier: Arc<dyn ReminderNotifier>,
    probe: Arc<dyn WindowProbe>,
}

impl FocusModeAdvisor {
    #[must_use]
    pub fn new(
        settings: watch::Receiver<AppSettings>,
        notifier: Arc<dyn ReminderNotifier>,
        probe: Arc<dyn WindowProbe>,
    ) -> Self {
        Self {
            settings,
            notifier,
            probe,
        }
    }
}

#[async_trait]
impl FocusAdvisory for FocusModeAdvisor {
    async fn on_active_window(
        &self,
        handle: WindowHandle,
        process_name: &str,
        window_title: &str,
    ) -> Result<()> {
        // Snapshot; a reload mid-call does not change this decision
        let settings = self.settings.borrow().clone();

        if !settings.focus_mode_enabled || !settings.is_blacklisted(process_name) {
            return Ok(());
        }

        log::info!("Distracting app in focus: {process_name}");
        self.notifier.remind(process_name, window_title)?;

        if settings.auto_minimize_distracting_apps {
            self.probe
                .minimize(handle)
                .await
                .with_context(|| format!("Failed to minimize {process_name}"))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeProbe, RecordingNotifier};
    use tempfile::tempdir;

    fn settings(enabled: bool, minimize: bool) -> AppSettings {
        AppSettings {
            focus_mode_enabled: enabled,
            auto_minimize_distracting_apps: minimize,
            ..AppSettings::default()
        }
    }

    fn advisor(
        settings: AppSettings,
    ) -> (FocusModeAdvisor, Arc<RecordingNotifier>, Arc<FakeProbe>) {
        let (_tx, rx) = watch::channel(settings);
        let notifier = Arc::new(RecordingNotifier::default());
        let probe = Arc::new(FakeProbe::new());
        let advisor = FocusModeAdvisor::new(
            rx,
            Arc::clone(&notifier) as Arc<dyn ReminderNotifier>,
            Arc::clone(&probe) as Arc<dyn WindowProbe>,
        );
        (advisor, notifier, probe)
    }

    #[tokio::test]
    async fn test_disabled_focus_mode_is_silent() {
        let (advisor, notifier, _) = advisor(settings(false, true));
        advisor
            .on_active_window(WindowHandle::new(1), "steam.exe", "Store")
            .await
            .unwrap();
        assert!(notifier.reminders().is_empty());
    }

    #[tokio::test]
    async fn test_reminds_for_blacklisted_process() {
        let (advisor, notifier, probe) = advisor(settings(true, false));

        advisor
            .on_active_window(WindowHandle::new(1), "Discord.exe", "general")
            .await
            .unwrap();
        advisor
            .on_active_window(WindowHandle::new(2), "code.exe", "main.rs")
            .await
            .unwrap();

        assert_eq!(
            notifier.reminders(),
            vec![("Discord.exe".to_string(), "general".to_string())]
        );
        assert!(probe.minimized().is_empty());
    }

    #[tokio::test]
    async fn test_auto_minimize() {
        let (advisor, _, probe) = advisor(settings(true, true));
        advisor
            .on_active_window(WindowHandle::new(7), "steam.exe", "Library")
            .await
            .unwrap();
        assert_eq!(probe.minimized(), vec![WindowHandle::new(7)]);
    }

    #[tokio::test]
    async fn test_settings_update_reaches_advisor() {
        let dir = tempdir().unwrap();
        let focus = FocusSettings::new(SettingsStore::new(dir.path())).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let advisor = FocusModeAdvisor::new(
            focus.subscribe(),
            Arc::clone(&notifier) as Arc<dyn ReminderNotifier>,
            Arc::new(FakeProbe::new()),
        );

        advisor
            .on_active_window(WindowHandle::new(1), "steam.exe", "")
            .await
            .unwrap();
        assert!(notifier.reminders().is_empty());

        let saved = focus.update(|s| s.focus_mode_enabled = true).unwrap();
        assert!(saved.focus_mode_enabled);

        advisor
            .on_active_window(WindowHandle::new(1), "steam.exe", "")
            .await
            .unwrap();
        assert_eq!(notifier.reminders().len(), 1);

        // Persisted, so a fresh reload keeps it
        focus.reload().unwrap();
        assert!(focus.current().focus_mode_enabled);
    }
}
