//! First-time setup: data directory, usage database, settings and category rules

use anyhow::{Context, Result};
use focusbuddy_storage::{AppSettings, CategoryRule, Database, RuleStore, SettingsStore};
use std::fs;
use std::path::Path;

/// Initialize the data directory
///
/// # Errors
///
/// Returns an error if the directory, database or JSON files cannot be created
pub fn init_command(data_dir: &Path, force: bool) -> Result<()> {
    println!("Initializing FocusBuddy in {}\n", data_dir.display());

    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let db = Database::new(None)?;
    drop(db);
    println!("Usage database ready.");

    write_default_files(data_dir, force)?;

    println!("\nStart tracking with: focusbuddy start");
    Ok(())
}

/// Write default settings and rules, keeping existing files unless `force`.
/// Returns whether each of (settings, rules) was written.
fn write_default_files(data_dir: &Path, force: bool) -> Result<(bool, bool)> {
    let settings = SettingsStore::new(data_dir);
    let write_settings = force || !settings.path().exists();
    if write_settings {
        settings.save(&AppSettings::default())?;
        println!("Wrote default settings to {}", settings.path().display());
    } else {
        println!("Keeping existing settings at {}", settings.path().display());
    }

    let rules = RuleStore::new(data_dir);
    let write_rules = force || !rules.exists();
    if write_rules {
        let defaults = CategoryRule::defaults();
        rules.save(&defaults)?;
        println!(
            "Wrote {} default category rules to {}",
            defaults.len(),
            rules.path().display()
        );
    } else {
        println!("Keeping existing category rules at {}", rules.path().display());
    }

    Ok((write_settings, write_rules))
}
