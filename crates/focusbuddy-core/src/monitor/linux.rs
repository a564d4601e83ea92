use anyhow::{Context, Result};
use async_trait::async_trait;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

use super::{process_name_for_pid, WindowHandle, WindowProbe, UNKNOWN_PROCESS};

struct Atoms {
    net_active_window: Atom,
    net_wm_name: Atom,
    net_wm_pid: Atom,
}

/// EWMH-based probe for X11 sessions
pub struct LinuxProbe {
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
}

impl LinuxProbe {
    /// Connect to the X server named by `$DISPLAY`
    ///
    /// # Errors
    ///
    /// Returns an error if no X server is reachable
    pub fn new() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .context("X server reported no screens")?;

        let atoms = Atoms {
            net_active_window: intern(&conn, "_NET_ACTIVE_WINDOW")?,
            net_wm_name: intern(&conn, "_NET_WM_NAME")?,
            net_wm_pid: intern(&conn, "_NET_WM_PID")?,
        };

        log::info!("Connected to X server (screen {screen_num})");
        Ok(Self { conn, root, atoms })
    }

    fn window_of(handle: WindowHandle) -> Option<Window> {
        Window::try_from(handle.raw()).ok()
    }

    fn property_bytes(&self, window: Window, atom: Atom) -> Option<Vec<u8>> {
        let reply = self
            .conn
            .get_property(false, window, atom, AtomEnum::ANY, 0, 1024)
            .ok()?
            .reply()
            .ok()?;

        if reply.value.is_empty() {
            None
        } else {
            Some(reply.value)
        }
    }

    fn property_u32(&self, window: Window, atom: Atom) -> Option<u32> {
        let reply = self
            .conn
            .get_property(false, window, atom, AtomEnum::ANY, 0, 1)
            .ok()?
            .reply()
            .ok()?;

        reply.value32().and_then(|mut values| values.next())
    }
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    let atom = conn
        .intern_atom(false, name.as_bytes())
        .with_context(|| format!("Failed to intern {name}"))?
        .reply()
        .with_context(|| format!("Failed to intern {name}"))?
        .atom;
    Ok(atom)
}

#[async_trait]
impl WindowProbe for LinuxProbe {
    async fn foreground_handle(&self) -> Option<WindowHandle> {
        let window = self.property_u32(self.root, self.atoms.net_active_window)?;
        // x11 reports "no active window" as window 0
        (window != 0).then(|| WindowHandle::new(u64::from(window)))
    }

    async fn title_of(&self, handle: WindowHandle) -> String {
        let Some(window) = Self::window_of(handle) else {
            return String::new();
        };

        self.property_bytes(window, self.atoms.net_wm_name)
            .or_else(|| self.property_bytes(window, AtomEnum::WM_NAME.into()))
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }

    async fn process_identity(&self, handle: WindowHandle) -> String {
        Self::window_of(handle)
            .and_then(|window| self.property_u32(window, self.atoms.net_wm_pid))
            .and_then(process_name_for_pid)
            .unwrap_or_else(|| UNKNOWN_PROCESS.to_string())
    }
}
