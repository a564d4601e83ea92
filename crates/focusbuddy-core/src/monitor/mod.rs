use anyhow::Result;
use async_trait::async_trait;
use focusbuddy_storage::eq_ignore_case;
use std::fmt;
use sysinfo::{Pid, System};

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows;

/// Process identity reported for the system lock screen; never tracked
pub const LOCK_SCREEN_PROCESS: &str = "lockapp.exe";

/// Process identity reported when the owner of a window cannot be resolved
pub const UNKNOWN_PROCESS: &str = "unknown.exe";

/// Opaque OS window handle.
///
/// The OS may recycle or invalidate a handle at any time, so probes re-validate
/// it on every lookup instead of assuming it outlives a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(u64);

impl WindowHandle {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Foreground window inspection for platform-specific implementations
///
/// Lookups are best-effort: a handle that went stale between calls yields an
/// empty title or [`UNKNOWN_PROCESS`], never an error.
#[async_trait]
pub trait WindowProbe: Send + Sync {
    /// Handle of the window that currently has focus, if any
    async fn foreground_handle(&self) -> Option<WindowHandle>;

    /// Title of `handle`, empty when unavailable
    async fn title_of(&self, handle: WindowHandle) -> String;

    /// Normalized executable name owning `handle`
    async fn process_identity(&self, handle: WindowHandle) -> String;

    /// Minimize `handle`
    async fn minimize(&self, handle: WindowHandle) -> Result<()> {
        anyhow::bail!("minimizing {handle} is not supported on this platform")
    }
}

/// Whether `process_identity` is the lock screen
#[must_use]
pub fn is_lock_screen(process_identity: &str) -> bool {
    eq_ignore_case(process_identity, LOCK_SCREEN_PROCESS)
}

/// Lower-case an executable name and give it an `.exe` suffix so identities
/// compare equal with rule files regardless of the platform that produced them.
#[must_use]
pub fn normalize_process_name(name: &str) -> String {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return UNKNOWN_PROCESS.to_string();
    }
    if name.ends_with(".exe") {
        name
    } else {
        format!("{name}.exe")
    }
}

/// Resolve the executable name of `pid`, `None` if the process is gone
#[must_use]
pub fn process_name_for_pid(pid: u32) -> Option<String> {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    if !sys.refresh_process(pid) {
        return None;
    }
    sys.process(pid).map(|p| normalize_process_name(p.name()))
}

/// Create platform-specific probe
///
/// # Errors
///
/// Returns an error if the current platform is not supported or if the probe
/// cannot connect to the windowing system
pub fn create_probe() -> Result<Box<dyn WindowProbe>> {
    #[cfg(target_os = "macos")]
    {
        Ok(Box::new(macos::MacOSProbe::new()))
    }

    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(linux::LinuxProbe::new()?))
    }

    #[cfg(target_os = "windows")]
    {
        Ok(Box::new(self::windows::WindowsProbe::new()))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        anyhow::bail!("Unsupported platform")
    }
}
