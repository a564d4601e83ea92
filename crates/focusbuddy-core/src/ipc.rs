use anyhow::{Context, Result};
use focusbuddy_storage::RuleStore;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::watch,
};
use tokio_util::sync::CancellationToken;

use crate::classifier::CategoryResolver;
use crate::focus::FocusSettings;
use crate::tracker::TrackerSnapshot;

pub const SOCKET_FILE: &str = "focusbuddy.sock";

/// IPC request from CLI to daemon
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcRequest {
    Status,
    ReloadRules,
    ReloadSettings,
    Shutdown,
}

/// IPC response from daemon to CLI
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcResponse {
    Status {
        running: bool,
        process_name: Option<String>,
        window_title: Option<String>,
        category: Option<String>,
        session_seconds: i64,
        today_seconds: i64,
    },
    Reloaded,
    Shutdown,
    Error(String),
}

#[must_use]
pub fn socket_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SOCKET_FILE)
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable or replies with garbage
    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path)
            .await
            .with_context(|| format!("Failed to connect to {}", self.sock_path.display()))?;

        let encoded = bincode::serialize(&request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: IpcResponse = bincode::deserialize(&buffer)?;

        Ok(response)
    }
}

pub struct DaemonIpcHandler {
    snapshots: watch::Receiver<TrackerSnapshot>,
    today_seconds: Arc<AtomicI64>,
    resolver: CategoryResolver,
    rule_store: RuleStore,
    focus: Arc<FocusSettings>,
    shutdown: CancellationToken,
}

impl DaemonIpcHandler {
    #[must_use]
    pub fn new(
        snapshots: watch::Receiver<TrackerSnapshot>,
        today_seconds: Arc<AtomicI64>,
        resolver: CategoryResolver,
        rule_store: RuleStore,
        focus: Arc<FocusSettings>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            snapshots,
            today_seconds,
            resolver,
            rule_store,
            focus,
            shutdown,
        }
    }

    /// Produce the reply for `request`
    #[must_use]
    pub fn respond(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Status => {
                let snapshot = self.snapshots.borrow().clone();
                let session_seconds = snapshot.session_start.map_or(0, |start| {
                    chrono::Utc::now()
                        .signed_duration_since(start)
                        .num_seconds()
                        .max(0)
                });

                IpcResponse::Status {
                    running: true,
                    process_name: snapshot.process_name,
                    window_title: snapshot.window_title,
                    category: snapshot.category,
                    session_seconds,
                    today_seconds: self.today_seconds.load(Ordering::Relaxed),
                }
            }
            IpcRequest::ReloadRules => match self.resolver.reload(&self.rule_store) {
                Ok(_) => IpcResponse::Reloaded,
                Err(e) => IpcResponse::Error(format!("{e:#}")),
            },
            IpcRequest::ReloadSettings => match self.focus.reload() {
                Ok(()) => IpcResponse::Reloaded,
                Err(e) => IpcResponse::Error(format!("{e:#}")),
            },
            IpcRequest::Shutdown => {
                log::info!("Shutdown requested over IPC");
                self.shutdown.cancel();
                IpcResponse::Shutdown
            }
        }
    }

    async fn handle(&self, stream: &mut UnixStream, request: IpcRequest) -> Result<()> {
        let response = self.respond(request);
        let encoded = bincode::serialize(&response)?;
        stream.write_all(&encoded).await?;
        Ok(())
    }
}

/// Accept connections until the handler's shutdown token fires
///
/// # Errors
///
/// Returns an error if the socket cannot be bound
pub async fn listen(handler: Arc<DaemonIpcHandler>, sock_path: &Path) -> io::Result<()> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    let listener = UnixListener::bind(sock_path)?;
    log::info!("IPC listening on {}", sock_path.display());

    loop {
        let accepted = tokio::select! {
            () = handler.shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((mut stream, _)) => {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    match stream.read_to_end(&mut buf).await {
                        Ok(n) if n > 0 => match bincode::deserialize::<IpcRequest>(&buf) {
                            Ok(request) => {
                                if let Err(e) = handler.handle(&mut stream, request).await {
                                    log::error!("IPC handle error: {e}");
                                }
                            }
                            Err(e) => {
                                log::error!("IPC deserialize error: {e}");
                            }
                        },
                        Ok(_) => {} // Connection closed
                        Err(e) => {
                            log::error!("IPC read error: {e}");
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }

    let _ = fs::remove_file(sock_path);
    Ok(())
}
