//! Helper utility functions for CLI commands

use std::path::Path;

/// Render seconds as `1h 05m`, `4m 09s` or `42s`
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}

/// Share of `total`, one decimal place
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: i64, total: i64) -> String {
    if total > 0 {
        format!("{:.1}%", (part as f64 / total as f64) * 100.0)
    } else {
        String::from("0%")
    }
}

/// Which file a running daemon should re-read
#[derive(Debug, Clone, Copy)]
pub enum Reload {
    Rules,
    Settings,
}

/// Ask a running daemon to pick up an edited file; silent when none is running
pub async fn notify_daemon(data_dir: &Path, reload: Reload) {
    #[cfg(unix)]
    {
        use focusbuddy_core::ipc::{socket_path, IpcClient, IpcRequest, IpcResponse};

        let sock_path = socket_path(data_dir);
        if !sock_path.exists() {
            return;
        }

        let request = match reload {
            Reload::Rules => IpcRequest::ReloadRules,
            Reload::Settings => IpcRequest::ReloadSettings,
        };

        match IpcClient::new(&sock_path).send_command(request).await {
            Ok(IpcResponse::Reloaded) => println!("Running daemon reloaded."),
            Ok(IpcResponse::Error(e)) => println!("Running daemon could not reload: {e}"),
            Ok(resp) => log::warn!("Unexpected response from daemon: {resp:?}"),
            Err(e) => log::debug!("No daemon to notify: {e:#}"),
        }
    }

    #[cfg(not(unix))]
    {
        log::debug!("Cannot signal daemon in {} about {reload:?}", data_dir.display());
        println!("Restart the daemon to apply the change.");
    }
}
