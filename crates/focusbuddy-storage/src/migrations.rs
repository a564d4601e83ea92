use anyhow::Result;
use rusqlite::Connection;

/// Initialize database schema
///
/// # Errors
///
/// Returns an error if table or index creation fails
pub fn init_schema(conn: &Connection) -> Result<()> {
    // Usage sessions - one row per closed foreground session
    conn.execute(
        "CREATE TABLE IF NOT EXISTS usage_sessions (
            id INTEGER PRIMARY KEY,
            process_name TEXT NOT NULL,
            window_title TEXT,
            category TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            duration_seconds INTEGER NOT NULL
        )",
        [],
    )?;

    // Daily summary - kept for databases created by earlier releases
    conn.execute(
        "CREATE TABLE IF NOT EXISTS daily_summary (
            date TEXT NOT NULL,
            category TEXT NOT NULL,
            duration_seconds INTEGER NOT NULL,
            PRIMARY KEY(date, category)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_usage_sessions_start ON usage_sessions(start_time)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('usage_sessions', 'daily_summary')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }
}
