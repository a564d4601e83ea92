/// Report and top-apps command handlers
use anyhow::{bail, Result};
use chrono::NaiveDate;
use focusbuddy_storage::{AppUsageSummary, Database, DailyUsageSummary};
use std::collections::BTreeMap;
use tabled::{Table, Tabled};

use super::helpers::{format_duration, percentage};

#[derive(Tabled, Debug, PartialEq, Eq)]
struct CategoryStats {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Percentage")]
    percentage: String,
}

#[derive(Tabled)]
struct DayStats {
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "Time")]
    time: String,
}

#[derive(Tabled)]
struct AppStats {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Application")]
    process_name: String,
    #[tabled(rename = "Time")]
    time: String,
}

/// Which slice of history a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportPeriod {
    Today,
    Week,
    Day(NaiveDate),
}

impl ReportPeriod {
    /// An explicit `date` wins over the named period
    fn parse(period: &str, date: Option<NaiveDate>) -> Result<Self> {
        if let Some(date) = date {
            return Ok(Self::Day(date));
        }
        match period {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            _ => bail!("Unknown period: {period}. Use 'today', 'week' or --date YYYY-MM-DD"),
        }
    }

    fn label(self) -> String {
        match self {
            Self::Today => "today".to_string(),
            Self::Week => "last 7 days".to_string(),
            Self::Day(date) => date.to_string(),
        }
    }

    fn rows(self, db: &Database) -> Result<Vec<DailyUsageSummary>> {
        match self {
            Self::Today => db.today_by_category(),
            Self::Week => db.last_7_days_by_category(),
            Self::Day(date) => db.by_category_on(date),
        }
    }
}

pub fn handle_report_command(period: &str, date: Option<NaiveDate>) -> Result<()> {
    let period = ReportPeriod::parse(period, date)?;
    let db = Database::new(None)?;
    let rows = period.rows(&db)?;
    let label = period.label();

    if rows.is_empty() {
        println!("No usage recorded for {label}");
        return Ok(());
    }

    let (stats, total) = category_stats(&rows);

    println!("\nUsage Report: {label}");
    println!("{}", "=".repeat(28));
    println!("{}", Table::new(stats));

    if period == ReportPeriod::Week {
        println!("\nPer day:");
        println!("{}", Table::new(day_stats(&rows)));
    }

    println!("\nTotal: {}", format_duration(total));
    Ok(())
}

pub fn handle_top_command(limit: usize, date: Option<NaiveDate>) -> Result<()> {
    let db = Database::new(None)?;
    let apps = top_apps(&db, date, limit)?;
    let label = date.map_or_else(|| "today".to_string(), |d| format!("on {d}"));

    if apps.is_empty() {
        println!("No usage recorded {label}");
        return Ok(());
    }

    println!("\nTop applications {label}:");
    println!("{}", Table::new(app_stats(apps)));
    Ok(())
}

fn top_apps(db: &Database, date: Option<NaiveDate>, limit: usize) -> Result<Vec<AppUsageSummary>> {
    match date {
        Some(date) => db.top_apps_on(date, limit),
        None => db.top_apps_today(limit),
    }
}

/// Sum rows per category, largest first, with the grand total
fn category_stats(rows: &[DailyUsageSummary]) -> (Vec<CategoryStats>, i64) {
    let mut per_category: BTreeMap<&str, i64> = BTreeMap::new();
    for row in rows {
        *per_category.entry(row.category.as_str()).or_default() += row.duration_seconds;
    }
    let total: i64 = per_category.values().sum();

    let mut sorted: Vec<(&str, i64)> = per_category.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let stats = sorted
        .into_iter()
        .map(|(category, seconds)| CategoryStats {
            category: category.to_string(),
            time: format_duration(seconds),
            percentage: percentage(seconds, total),
        })
        .collect();

    (stats, total)
}

fn day_stats(rows: &[DailyUsageSummary]) -> Vec<DayStats> {
    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for row in rows {
        *per_day.entry(row.date).or_default() += row.duration_seconds;
    }

    per_day
        .into_iter()
        .map(|(date, seconds)| DayStats {
            date,
            time: format_duration(seconds),
        })
        .collect()
}

fn app_stats(apps: Vec<AppUsageSummary>) -> Vec<AppStats> {
    apps.into_iter()
        .enumerate()
        .map(|(i, app)| AppStats {
            rank: i + 1,
            process_name: app.process_name,
            time: format_duration(app.duration_seconds),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone, Utc};
    use focusbuddy_storage::UsageSession;

    fn row(day: u32, category: &str, seconds: i64) -> DailyUsageSummary {
        DailyUsageSummary {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            category: category.to_string(),
            duration_seconds: seconds,
        }
    }

    #[test]
    fn test_category_stats_merge_days() {
        let rows = vec![
            row(1, "Development", 600),
            row(1, "Other", 300),
            row(2, "Development", 300),
        ];

        let (stats, total) = category_stats(&rows);

        assert_eq!(total, 1200);
        assert_eq!(
            stats,
            vec![
                CategoryStats {
                    category: "Development".into(),
                    time: "15m 00s".into(),
                    percentage: "75.0%".into(),
                },
                CategoryStats {
                    category: "Other".into(),
                    time: "5m 00s".into(),
                    percentage: "25.0%".into(),
                },
            ]
        );
    }

    #[test]
    fn test_day_stats_are_chronological() {
        let rows = vec![row(3, "A", 60), row(1, "A", 30), row(3, "B", 60)];

        let days = day_stats(&rows);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(days[1].time, "2m 00s");
    }

    #[test]
    fn test_app_stats_are_ranked() {
        let apps = vec![
            AppUsageSummary {
                process_name: "code.exe".into(),
                duration_seconds: 90,
            },
            AppUsageSummary {
                process_name: "slack.exe".into(),
                duration_seconds: 30,
            },
        ];

        let stats = app_stats(apps);

        assert_eq!(stats[1].rank, 2);
        assert_eq!(stats[1].process_name, "slack.exe");
        assert_eq!(stats[0].time, "1m 30s");
    }

    fn record(db: &Database, process: &str, category: &str, day: u32, hour: u32, minutes: i64) {
        let start = Local
            .with_ymd_and_hms(2024, 3, day, hour, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let session = UsageSession::from_interval(
            process.to_string(),
            String::new(),
            category.to_string(),
            start,
            start + chrono::Duration::minutes(minutes),
        )
        .unwrap();
        db.insert_usage_session(&session).unwrap();
    }

    #[test]
    fn test_period_parsing() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        assert_eq!(ReportPeriod::parse("today", None).unwrap(), ReportPeriod::Today);
        assert_eq!(ReportPeriod::parse("week", None).unwrap(), ReportPeriod::Week);
        assert_eq!(ReportPeriod::parse("today", Some(day)).unwrap(), ReportPeriod::Day(day));
        assert!(ReportPeriod::parse("month", None).is_err());
        assert_eq!(ReportPeriod::Day(day).label(), "2024-03-01");
    }

    #[test]
    fn test_past_day_report_and_top_apps() {
        let db = Database::open_in_memory().unwrap();
        record(&db, "code.exe", "Development", 1, 10, 30);
        record(&db, "slack.exe", "Communication", 1, 11, 10);
        record(&db, "code.exe", "Development", 1, 12, 15);
        record(&db, "steam.exe", "Entertainment", 2, 10, 60);

        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let rows = ReportPeriod::Day(day).rows(&db).unwrap();
        let (stats, total) = category_stats(&rows);

        assert_eq!(total, 55 * 60);
        assert_eq!(stats[0].category, "Development");
        assert_eq!(stats[0].time, "45m 00s");
        assert_eq!(stats.len(), 2);

        let apps = top_apps(&db, Some(day), 1).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].process_name, "code.exe");
        assert_eq!(apps[0].duration_seconds, 45 * 60);

        let empty = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert!(top_apps(&db, Some(empty), 5).unwrap().is_empty());
    }
}
