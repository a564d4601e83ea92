/// Daemon lifecycle management commands
use anyhow::{Context, Result};
use focusbuddy_core::Daemon;
use focusbuddy_storage::Database;
use std::{env, fs, path::Path, process::Command, time::Duration};
use sysinfo::{Pid, System};

use super::helpers::format_duration;

const PID_FILE: &str = "focusbuddy.pid";
const LOG_FILE: &str = "focusbuddy.log";

fn read_pid(pid_file_path: &Path) -> Option<usize> {
    fs::read_to_string(pid_file_path)
        .ok()
        .and_then(|pid| pid.trim().parse::<usize>().ok())
}

fn is_alive(pid: usize) -> bool {
    let mut sys = System::new();
    sys.refresh_process(Pid::from(pid))
}

pub fn start_daemon(data_dir: &Path) -> Result<()> {
    let pid_file_path = data_dir.join(PID_FILE);

    // 1. Check if daemon is already running
    if pid_file_path.exists() {
        if let Some(pid) = read_pid(&pid_file_path) {
            if is_alive(pid) {
                log::info!("Daemon is already running (PID: {pid}).");
                return Ok(());
            }
        }
        log::warn!("Removing stale PID file.");
        let _ = fs::remove_file(&pid_file_path);
    }

    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    log::info!("Starting FocusBuddy daemon...");

    // 2. Spawn a new process for the daemon
    let current_exe = env::current_exe()?;
    let child = Command::new(current_exe)
        .arg("daemon-internal-start")
        .current_dir(data_dir)
        .spawn()?;

    // 3. In parent process, write PID and exit
    log::info!("Daemon process started with PID: {}", child.id());
    fs::write(&pid_file_path, child.id().to_string())?;

    Ok(())
}

/// Entry point of the detached daemon process
pub async fn run_daemon_process(data_dir: &Path) -> Result<()> {
    // A new process: logging goes to a file since there is no terminal
    if let Err(e) = setup_daemon_logging(data_dir) {
        eprintln!("Failed to set up daemon logging: {e:#}");
        return Err(e);
    }
    log::info!("Daemon process started internally.");

    if let Err(e) = run_daemon(data_dir).await {
        log::error!("Daemon exited with a fatal error: {e:#}");
        return Err(e);
    }

    Ok(())
}

pub async fn run_daemon_foreground(data_dir: &Path) -> Result<()> {
    println!("Tracking foreground windows. Press Ctrl-C to stop.");
    run_daemon(data_dir).await
}

async fn run_daemon(data_dir: &Path) -> Result<()> {
    fs::create_dir_all(data_dir)?;
    let db = Database::new(None)?;
    let mut daemon = Daemon::new(db, data_dir)?;
    daemon.run_with_signals().await
}

pub async fn stop_daemon(data_dir: &Path) -> Result<()> {
    let pid_file_path = data_dir.join(PID_FILE);

    let Some(pid) = read_pid(&pid_file_path) else {
        log::info!("Daemon is not running (no PID file).");
        let _ = fs::remove_file(&pid_file_path);
        return Ok(());
    };

    log::info!("Stopping FocusBuddy daemon (PID: {pid})...");

    if request_shutdown(data_dir).await {
        log::info!("Daemon shutdown signal sent. Waiting for process to exit...");
        for _ in 0..20 {
            if !is_alive(pid) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    let mut sys = System::new();
    if sys.refresh_process(Pid::from(pid)) {
        log::warn!("Daemon did not stop gracefully. Force killing...");
        if let Some(process) = sys.process(Pid::from(pid)) {
            process.kill();
        }
    } else {
        log::info!("Daemon stopped successfully.");
    }

    fs::remove_file(&pid_file_path)?;
    Ok(())
}

#[cfg(unix)]
async fn request_shutdown(data_dir: &Path) -> bool {
    use focusbuddy_core::ipc::{socket_path, IpcClient, IpcRequest, IpcResponse};

    let sock_path = socket_path(data_dir);
    match IpcClient::new(&sock_path)
        .send_command(IpcRequest::Shutdown)
        .await
    {
        Ok(IpcResponse::Shutdown) => true,
        Ok(resp) => {
            log::error!("Received unexpected response from daemon: {resp:?}");
            false
        }
        Err(e) => {
            log::error!("Failed to send shutdown command: {e:#}. Forcing cleanup.");
            let _ = fs::remove_file(&sock_path);
            false
        }
    }
}

#[cfg(not(unix))]
#[allow(clippy::unused_async)]
async fn request_shutdown(_data_dir: &Path) -> bool {
    false
}

#[cfg(unix)]
pub async fn show_status(data_dir: &Path) -> Result<()> {
    use focusbuddy_core::ipc::{socket_path, IpcClient, IpcRequest, IpcResponse};

    let sock_path = socket_path(data_dir);
    if !sock_path.exists() {
        println!("Daemon Status: Not running");
        return Ok(());
    }

    match IpcClient::new(&sock_path)
        .send_command(IpcRequest::Status)
        .await
    {
        Ok(IpcResponse::Status {
            running,
            process_name,
            window_title,
            category,
            session_seconds,
            today_seconds,
        }) => {
            println!(
                "Daemon Status: {}",
                if running { "Running" } else { "Stopped" }
            );
            println!("\nCurrent Window:");
            println!(
                "  Process: {}",
                process_name.unwrap_or_else(|| "None".to_string())
            );
            println!(
                "  Title: {}",
                window_title.unwrap_or_else(|| "None".to_string())
            );
            println!(
                "  Category: {}",
                category.unwrap_or_else(|| "None".to_string())
            );
            println!("\nIn this window: {}", format_duration(session_seconds));
            println!("Tracked today: {}", format_duration(today_seconds));
        }
        Ok(_) => anyhow::bail!("Unexpected response from daemon"),
        Err(e) => {
            log::error!("Failed to get status: {e:#}");
            println!("Daemon Status: Not running (or not responding)");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unused_async)]
pub async fn show_status(data_dir: &Path) -> Result<()> {
    let running = read_pid(&data_dir.join(PID_FILE)).is_some_and(is_alive);
    println!(
        "Daemon Status: {}",
        if running { "Running" } else { "Not running" }
    );

    let today = Database::new(None)?.today_total_seconds()?;
    println!("Tracked today: {}", format_duration(today));
    Ok(())
}

fn setup_daemon_logging(data_dir: &Path) -> Result<()> {
    use std::fs::{create_dir_all, OpenOptions};

    create_dir_all(data_dir)?;
    let log_path = data_dir.join(LOG_FILE);

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug)
        .init();

    Ok(())
}
