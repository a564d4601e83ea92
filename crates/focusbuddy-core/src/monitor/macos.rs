use async_trait::async_trait;
use tokio::process::Command;

use super::{
    process_name_for_pid, WindowHandle, WindowProbe, LOCK_SCREEN_PROCESS, UNKNOWN_PROCESS,
};

/// macOS shows the lock screen through this process
const LOGIN_WINDOW_PROCESS: &str = "loginwindow.exe";

/// macOS probe. The handle is the pid of the frontmost application, as
/// AppleScript exposes no stable window identifiers.
pub struct MacOSProbe;

impl MacOSProbe {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn run_script(script: &str) -> Option<String> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .await
            .ok()?;

        if !output.status.success() {
            log::debug!(
                "osascript failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn pid_of(handle: WindowHandle) -> Option<u32> {
        u32::try_from(handle.raw()).ok()
    }
}

impl Default for MacOSProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowProbe for MacOSProbe {
    async fn foreground_handle(&self) -> Option<WindowHandle> {
        let script = r#"
            tell application "System Events"
                return unix id of first application process whose frontmost is true
            end tell
        "#;

        let pid: u64 = Self::run_script(script).await?.parse().ok()?;
        (pid != 0).then(|| WindowHandle::new(pid))
    }

    async fn title_of(&self, handle: WindowHandle) -> String {
        let Some(pid) = Self::pid_of(handle) else {
            return String::new();
        };

        let script = format!(
            r#"
            tell application "System Events"
                try
                    return name of first window of (first application process whose unix id is {pid})
                on error
                    return ""
                end try
            end tell
            "#
        );

        Self::run_script(&script).await.unwrap_or_default()
    }

    async fn process_identity(&self, handle: WindowHandle) -> String {
        match Self::pid_of(handle).and_then(process_name_for_pid) {
            Some(name) if name == LOGIN_WINDOW_PROCESS => LOCK_SCREEN_PROCESS.to_string(),
            Some(name) => name,
            None => UNKNOWN_PROCESS.to_string(),
        }
    }
}
