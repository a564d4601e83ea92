use anyhow::Result;
use async_trait::async_trait;
use ::windows::Win32::Foundation::HWND;
use ::windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId, IsWindow, ShowWindow,
    SW_MINIMIZE,
};

use super::{process_name_for_pid, WindowHandle, WindowProbe, UNKNOWN_PROCESS};

const MAX_TITLE_CHARS: usize = 512;

/// Win32 foreground window probe
pub struct WindowsProbe;

impl WindowsProbe {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    fn hwnd(handle: WindowHandle) -> HWND {
        HWND(handle.raw() as isize)
    }

    /// The handle may have been destroyed since it was sampled
    fn live_hwnd(handle: WindowHandle) -> Option<HWND> {
        let hwnd = Self::hwnd(handle);
        unsafe { IsWindow(hwnd) }.as_bool().then_some(hwnd)
    }
}

impl Default for WindowsProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowProbe for WindowsProbe {
    async fn foreground_handle(&self) -> Option<WindowHandle> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0 == 0 {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        Some(WindowHandle::new(hwnd.0 as u64))
    }

    async fn title_of(&self, handle: WindowHandle) -> String {
        let Some(hwnd) = Self::live_hwnd(handle) else {
            return String::new();
        };

        let mut buffer = [0u16; MAX_TITLE_CHARS];
        let len = unsafe { GetWindowTextW(hwnd, &mut buffer) };
        let len = usize::try_from(len).unwrap_or(0).min(buffer.len());
        String::from_utf16_lossy(&buffer[..len])
    }

    async fn process_identity(&self, handle: WindowHandle) -> String {
        let Some(hwnd) = Self::live_hwnd(handle) else {
            return UNKNOWN_PROCESS.to_string();
        };

        let mut pid = 0u32;
        unsafe { GetWindowThreadProcessId(hwnd, Some(std::ptr::addr_of_mut!(pid))) };
        if pid == 0 {
            return UNKNOWN_PROCESS.to_string();
        }

        process_name_for_pid(pid).unwrap_or_else(|| UNKNOWN_PROCESS.to_string())
    }

    async fn minimize(&self, handle: WindowHandle) -> Result<()> {
        let hwnd = Self::live_hwnd(handle)
            .ok_or_else(|| anyhow::anyhow!("window {handle} no longer exists"))?;
        // The return value reports prior visibility, not failure
        let _ = unsafe { ShowWindow(hwnd, SW_MINIMIZE) };
        Ok(())
    }
}
