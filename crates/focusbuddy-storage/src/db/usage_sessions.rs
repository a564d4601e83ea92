//! Usage session writes and the aggregate queries behind reports.

use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use rusqlite::params;

use super::helpers::{format_date, format_timestamp, parse_date};
use super::Database;
use crate::models::{AppUsageSummary, DailyUsageSummary, UsageSession};

impl Database {
    /// Append a closed usage session
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub fn insert_usage_session(&self, session: &UsageSession) -> Result<()> {
        self.conn().execute(
            "INSERT INTO usage_sessions (process_name, window_title, category, start_time, end_time, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.process_name,
                session.window_title,
                session.category,
                format_timestamp(&session.start_time),
                format_timestamp(&session.end_time),
                session.duration_seconds,
            ],
        )?;
        Ok(())
    }

    /// Total tracked seconds for sessions starting on `date`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub fn total_seconds_on(&self, date: NaiveDate) -> Result<i64> {
        let total = self.conn().query_row(
            "SELECT COALESCE(SUM(duration_seconds), 0)
             FROM usage_sessions
             WHERE DATE(start_time) = ?1",
            params![format_date(date)],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Per-category totals for `date`, largest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub fn by_category_on(&self, date: NaiveDate) -> Result<Vec<DailyUsageSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT category, COALESCE(SUM(duration_seconds), 0) AS total
             FROM usage_sessions
             WHERE DATE(start_time) = ?1
             GROUP BY category
             ORDER BY total DESC, category ASC",
        )?;

        let rows = stmt
            .query_map(params![format_date(date)], |row| {
                Ok(DailyUsageSummary {
                    date,
                    category: row.get(0)?,
                    duration_seconds: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Per-day, per-category totals from `start` onwards, oldest day first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored date is malformed
    pub fn daily_by_category_since(&self, start: NaiveDate) -> Result<Vec<DailyUsageSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT DATE(start_time) AS usage_date, category, COALESCE(SUM(duration_seconds), 0)
             FROM usage_sessions
             WHERE DATE(start_time) >= ?1
             GROUP BY usage_date, category
             ORDER BY usage_date ASC, category ASC",
        )?;

        let rows = stmt
            .query_map(params![format_date(start)], |row| {
                Ok(DailyUsageSummary {
                    date: parse_date(&row.get::<_, String>(0)?)?,
                    category: row.get(1)?,
                    duration_seconds: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Processes with the most tracked time on `date`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub fn top_apps_on(&self, date: NaiveDate, take: usize) -> Result<Vec<AppUsageSummary>> {
        let limit = i64::try_from(take).unwrap_or(i64::MAX);
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT process_name, COALESCE(SUM(duration_seconds), 0) AS total
             FROM usage_sessions
             WHERE DATE(start_time) = ?1
             GROUP BY process_name
             ORDER BY total DESC, process_name ASC
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![format_date(date), limit], |row| {
                Ok(AppUsageSummary {
                    process_name: row.get(0)?,
                    duration_seconds: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    // ==================== Local-day shortcuts ====================

    /// # Errors
    ///
    /// Returns an error if the query fails
    pub fn today_total_seconds(&self) -> Result<i64> {
        self.total_seconds_on(Local::now().date_naive())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails
    pub fn today_by_category(&self) -> Result<Vec<DailyUsageSummary>> {
        self.by_category_on(Local::now().date_naive())
    }

    /// Today plus the six days before it
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub fn last_7_days_by_category(&self) -> Result<Vec<DailyUsageSummary>> {
        let today = Local::now().date_naive();
        let start = today.checked_sub_days(Days::new(6)).unwrap_or(today);
        self.daily_by_category_since(start)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails
    pub fn top_apps_today(&self, take: usize) -> Result<Vec<AppUsageSummary>> {
        self.top_apps_on(Local::now().date_naive(), take)
    }
}
