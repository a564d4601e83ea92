use anyhow::{Context, Result};
use async_trait::async_trait;
use focusbuddy_storage::{Database, UsageSession};
use std::sync::Arc;

/// Destination for closed sessions
#[async_trait]
pub trait SessionSink: Send + Sync {
    /// Persist one closed session. The tracker logs and drops failures.
    async fn append(&self, session: UsageSession) -> Result<()>;
}

/// Writes sessions to the SQLite usage store
pub struct DatabaseSink {
    database: Arc<Database>,
}

impl DatabaseSink {
    #[must_use]
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl SessionSink for DatabaseSink {
    async fn append(&self, session: UsageSession) -> Result<()> {
        let database = Arc::clone(&self.database);
        tokio::task::spawn_blocking(move || -> Result<()> {
            database.insert_usage_session(&session)?;
            log::info!(
                "Recorded {}s of {} ({})",
                session.duration_seconds,
                session.process_name,
                session.category
            );
            Ok(())
        })
        .await
        .context("usage store task failed")?
    }
}
