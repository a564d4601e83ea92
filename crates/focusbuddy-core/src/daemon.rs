use crate::{
    classifier::CategoryResolver,
    config::Config,
    engine::TrackingEngine,
    focus::{FocusModeAdvisor, FocusSettings, LogNotifier},
    monitor::{create_probe, WindowProbe},
    sink::DatabaseSink,
    tracker::{SessionTracker, UsageUpdated},
};
use anyhow::Result;
use focusbuddy_storage::{Database, RuleStore, SettingsStore};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

// The reload handles are only served over the Unix socket
#[cfg_attr(not(unix), allow(dead_code))]
pub struct Daemon {
    database: Arc<Database>,
    engine: TrackingEngine,
    resolver: CategoryResolver,
    rule_store: RuleStore,
    focus: Arc<FocusSettings>,
    today_seconds: Arc<AtomicI64>,
    shutdown: CancellationToken,
    data_dir: PathBuf,
}

impl Daemon {
    /// Wire the probe, stores and engine for `data_dir`
    ///
    /// # Errors
    ///
    /// Returns an error if the config, settings or rule files are unreadable, or if no
    /// window probe is available on this platform
    pub fn new(db: Database, data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let database = Arc::new(db);

        let probe: Arc<dyn WindowProbe> = Arc::from(create_probe()?);
        let rule_store = RuleStore::new(data_dir);
        let resolver = CategoryResolver::from_store(&rule_store)?;
        let focus = Arc::new(FocusSettings::new(SettingsStore::new(data_dir))?);

        let advisor = FocusModeAdvisor::new(
            focus.subscribe(),
            Arc::new(LogNotifier),
            Arc::clone(&probe),
        );
        let tracker = SessionTracker::new(
            probe,
            resolver.clone(),
            Arc::new(DatabaseSink::new(Arc::clone(&database))),
            Arc::new(advisor),
            &config.tracker,
        );

        Ok(Self::from_parts(
            database,
            TrackingEngine::new(tracker, &config.tracker),
            resolver,
            rule_store,
            focus,
            data_dir,
        ))
    }

    fn from_parts(
        database: Arc<Database>,
        engine: TrackingEngine,
        resolver: CategoryResolver,
        rule_store: RuleStore,
        focus: Arc<FocusSettings>,
        data_dir: &Path,
    ) -> Self {
        Self {
            database,
            engine,
            resolver,
            rule_store,
            focus,
            today_seconds: Arc::new(AtomicI64::new(0)),
            shutdown: CancellationToken::new(),
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Token that stops `run_with_signals` when cancelled
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until Ctrl-C or an IPC shutdown request, then close the open session
    ///
    /// # Errors
    ///
    /// Returns an error if the tracking engine cannot start
    pub async fn run_with_signals(&mut self) -> Result<()> {
        // Nothing runs alongside an engine that failed to start
        self.engine.start()?;

        tokio::spawn(refresh_today_total(
            Arc::clone(&self.database),
            self.engine.subscribe(),
            Arc::clone(&self.today_seconds),
            self.shutdown.clone(),
        ));

        #[cfg(unix)]
        self.spawn_ipc();

        log::info!("Daemon started");

        tokio::select! {
            () = self.shutdown.cancelled() => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Received Ctrl-C, shutting down...");
                self.shutdown.cancel();
            }
        }

        self.engine.stop().await;
        log::info!("Daemon shut down gracefully.");
        Ok(())
    }

    #[cfg(unix)]
    fn spawn_ipc(&self) {
        use crate::ipc::{listen, socket_path, DaemonIpcHandler};

        let handler = Arc::new(DaemonIpcHandler::new(
            self.engine.snapshots(),
            Arc::clone(&self.today_seconds),
            self.resolver.clone(),
            self.rule_store.clone(),
            Arc::clone(&self.focus),
            self.shutdown.clone(),
        ));
        let sock_path = socket_path(&self.data_dir);

        tokio::spawn(async move {
            if let Err(e) = listen(handler, &sock_path).await {
                log::error!("IPC listener failed: {e}");
            }
        });
    }
}

/// Keep the cached today total current; recomputed whenever a session is persisted
async fn refresh_today_total(
    database: Arc<Database>,
    mut updates: broadcast::Receiver<UsageUpdated>,
    today_seconds: Arc<AtomicI64>,
    shutdown: CancellationToken,
) {
    loop {
        let db = Arc::clone(&database);
        match tokio::task::spawn_blocking(move || db.today_total_seconds()).await {
            Ok(Ok(total)) => today_seconds.store(total, Ordering::Relaxed),
            Ok(Err(e)) => log::warn!("Failed to refresh today's total: {e:#}"),
            Err(e) => log::error!("Today total task failed: {e}"),
        }

        tokio::select! {
            () = shutdown.cancelled() => break,
            received = updates.recv() => match received {
                Ok(UsageUpdated) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
