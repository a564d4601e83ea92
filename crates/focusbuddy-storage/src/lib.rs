pub mod db;
pub mod migrations;
pub mod models;
pub mod store;

pub use db::Database;
pub use models::{
    eq_ignore_case, AppSettings, AppUsageSummary, CategoryRule, DailyUsageSummary, UsageSession,
    DEFAULT_CATEGORY,
};
pub use store::{RuleStore, SettingsStore, StoreError};
