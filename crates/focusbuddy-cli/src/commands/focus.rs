/// Focus mode command handlers
use anyhow::Result;
use focusbuddy_core::{focus::FocusSettings, monitor::normalize_process_name};
use focusbuddy_storage::{eq_ignore_case, AppSettings, SettingsStore};
use std::path::Path;

use super::helpers::{notify_daemon, Reload};

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

pub fn show_focus(data_dir: &Path) -> Result<()> {
    let settings = SettingsStore::new(data_dir).load()?;

    println!("Focus mode: {}", on_off(settings.focus_mode_enabled));
    println!(
        "Auto-minimize distracting apps: {}",
        on_off(settings.auto_minimize_distracting_apps)
    );
    println!("Run on startup: {}", on_off(settings.run_on_startup));

    if settings.focus_mode_blacklist.is_empty() {
        println!("\nNo distracting apps listed.");
    } else {
        println!("\nDistracting apps:");
        for process in &settings.focus_mode_blacklist {
            println!("  - {process}");
        }
    }
    Ok(())
}

/// Persist an edit and tell a running daemon about it
async fn edit_settings(
    data_dir: &Path,
    edit: impl FnOnce(&mut AppSettings),
) -> Result<AppSettings> {
    let settings = FocusSettings::new(SettingsStore::new(data_dir))?.update(edit)?;
    notify_daemon(data_dir, Reload::Settings).await;
    Ok(settings)
}

pub async fn set_focus_mode(data_dir: &Path, enabled: bool) -> Result<()> {
    edit_settings(data_dir, |s| s.focus_mode_enabled = enabled).await?;
    println!("Focus mode {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

pub async fn set_auto_minimize(data_dir: &Path, enabled: bool) -> Result<()> {
    edit_settings(data_dir, |s| s.auto_minimize_distracting_apps = enabled).await?;
    println!("Auto-minimize {}", on_off(enabled));
    Ok(())
}

pub async fn block_process(data_dir: &Path, process: &str) -> Result<()> {
    let process = normalize_process_name(process);
    let settings = edit_settings(data_dir, |s| {
        if !s.is_blacklisted(&process) {
            s.focus_mode_blacklist.push(process.clone());
        }
    })
    .await?;

    println!("{process} marked as distracting");
    if !settings.focus_mode_enabled {
        println!("Focus mode is off; enable it with: focusbuddy focus enable");
    }
    Ok(())
}

pub async fn unblock_process(data_dir: &Path, process: &str) -> Result<()> {
    let process = normalize_process_name(process);
    let mut removed = false;
    edit_settings(data_dir, |s| {
        let before = s.focus_mode_blacklist.len();
        s.focus_mode_blacklist
            .retain(|p| !eq_ignore_case(p, &process));
        removed = s.focus_mode_blacklist.len() != before;
    })
    .await?;

    if removed {
        println!("{process} is no longer marked as distracting");
    } else {
        println!("{process} was not on the distracting list");
    }
    Ok(())
}
