//! Blocklist Loader Supervisor: orchestrates startup, daily
//! refresh, retry, and exposes status. A single task runs a refresh at a
//! time; concurrent update requests coalesce onto it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::builder;
use crate::category::{CATALOG, MX_CACHE_NAME};
use crate::config::{LoaderConfig, REFRESH_INTERVAL, RETRY_INTERVAL};
use crate::error::LoaderResult;
use crate::fetcher;
use crate::index::Registry;

/// Soft, observable refresh state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderStatus {
    Pending,
    Ok,
    Error(String),
}

impl LoaderStatus {
    fn as_str(&self) -> String {
        match self {
            LoaderStatus::Pending => "pending".to_string(),
            LoaderStatus::Ok => "ok".to_string(),
            LoaderStatus::Error(reason) => format!("error: {reason}"),
        }
    }
}

struct LoaderState {
    status: LoaderStatus,
    last_update: Option<DateTime<Utc>>,
    update_count: u64,
    next_update_at: Option<DateTime<Utc>>,
}

/// `status()` response shape, ready to hand to `axum::Json`.
#[derive(Debug, Serialize)]
pub struct Status {
    pub last_update: Option<DateTime<Utc>>,
    pub last_status: String,
    pub update_count: u64,
    pub next_update_at: Option<DateTime<Utc>>,
    pub per_category_sizes: HashMap<String, usize>,
}

pub struct Loader {
    registry: Arc<Registry>,
    client: Client,
    config: LoaderConfig,
    state: Mutex<LoaderState>,
    refresh_lock: tokio::sync::Mutex<()>,
    refresh_in_flight: AtomicBool,
    shutdown_tx: tokio::sync::mpsc::Sender<()>,
    shutdown_rx: tokio::sync::Mutex<tokio::sync::mpsc::Receiver<()>>,
}

impl Loader {
    pub fn new(registry: Arc<Registry>, config: LoaderConfig) -> Arc<Self> {
        let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel(1);
        Arc::new(Self {
            registry,
            client: Client::new(),
            config,
            state: Mutex::new(LoaderState {
                status: LoaderStatus::Pending,
                last_update: None,
                update_count: 0,
                next_update_at: None,
            }),
            refresh_lock: tokio::sync::Mutex::new(()),
            refresh_in_flight: AtomicBool::new(false),
            shutdown_tx,
            shutdown_rx: tokio::sync::Mutex::new(shutdown_rx),
        })
    }

    /// Signal the periodic refresh task spawned by `run` to stop after its
    /// current iteration. A no-op if `run` was never called.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Read-only, cheap, no I/O.
    pub fn status(&self) -> Status {
        let state = self.state.lock();
        let mut per_category_sizes = HashMap::new();
        for category in CATALOG {
            per_category_sizes.insert(
                category.name.to_string(),
                self.registry.size(category.name).unwrap_or(0),
            );
        }
        per_category_sizes.insert(MX_CACHE_NAME.to_string(), self.registry.mx_size());

        Status {
            last_update: state.last_update,
            last_status: state.status.as_str(),
            update_count: state.update_count,
            next_update_at: state.next_update_at,
            per_category_sizes,
        }
    }

    /// Boot sequence: create empty indexes, attempt to
    /// load the most recent snapshot, and schedule the first periodic
    /// refresh. If no snapshot is available, a fetch is scheduled
    /// immediately instead of waiting 24h.
    pub async fn boot(self: &Arc<Self>) {
        for category in CATALOG {
            self.registry.create(category.name);
        }

        match self.load_latest_snapshot().await {
            Ok(()) => {
                info!("loaded most recent blocklist snapshot");
                self.mark_success();
            }
            Err(reason) => {
                warn!(%reason, "no usable snapshot on disk, scheduling immediate fetch");
                self.schedule_next(Utc::now());
                let loader = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = loader.update_now().await {
                        error!(error = %e, "initial blocklist fetch failed");
                    }
                });
                return;
            }
        }

        self.schedule_next(Utc::now() + chrono::Duration::from_std(REFRESH_INTERVAL).unwrap());
    }

    /// Spawn the periodic refresh/retry scheduling task. Runs until `shutdown`
    /// is called.
    pub fn run(self: Arc<Self>) {
        tokio::spawn(async move {
            self.boot().await;
            let mut shutdown_rx = self.shutdown_rx.lock().await;
            loop {
                let wait = {
                    let state = self.state.lock();
                    match state.next_update_at {
                        Some(at) => (at - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO),
                        None => REFRESH_INTERVAL,
                    }
                };

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown_rx.recv() => {
                        info!("loader shutting down");
                        return;
                    }
                }

                let result = self.update_now().await;
                let delay = if result.is_ok() { REFRESH_INTERVAL } else { RETRY_INTERVAL };
                self.schedule_next(Utc::now() + chrono::Duration::from_std(delay).unwrap());
            }
        });
    }

    /// Trigger an immediate refresh. Coalesces with any in-flight refresh:
    /// a caller arriving mid-refresh waits for it to finish and returns its
    /// outcome rather than starting a second one.
    pub async fn update_now(&self) -> LoaderResult<()> {
        if self.refresh_in_flight.swap(true, Ordering::SeqCst) {
            let _guard = self.refresh_lock.lock().await;
            return self.last_result();
        }

        let _guard = self.refresh_lock.lock().await;
        let result = self.do_refresh().await;
        match &result {
            Ok(()) => self.mark_success(),
            Err(e) => self.mark_failure(e.to_string()),
        }
        self.refresh_in_flight.store(false, Ordering::SeqCst);
        result
    }

    fn last_result(&self) -> LoaderResult<()> {
        match &self.state.lock().status {
            LoaderStatus::Error(reason) => Err(crate::error::LoaderError::LoadFailed(reason.clone())),
            _ => Ok(()),
        }
    }

    /// Refresh protocol: fetch into a fresh dated directory,
    /// build staging indexes from the files on disk, and swap every
    /// category only if every build succeeded.
    async fn do_refresh(&self) -> LoaderResult<()> {
        let date = Utc::now().format("%Y%m%d").to_string();
        let dir = self.config.base_dir.join(&date);

        fetcher::fetch_all(&self.client, &dir).await?;
        self.build_and_swap_all(&dir)
    }

    async fn load_latest_snapshot(&self) -> LoaderResult<()> {
        let dir = latest_snapshot_dir(&self.config.base_dir).ok_or_else(|| {
            crate::error::LoaderError::LoadFailed("no snapshot directory found".to_string())
        })?;
        self.build_and_swap_all(&dir)
    }

    /// Build a staging index for every category from files already on disk
    /// in `dir`, then swap every category only once every build succeeded.
    /// A failed build deletes all staging indexes built so far and leaves
    /// the previous live indexes untouched.
    fn build_and_swap_all(&self, dir: &Path) -> LoaderResult<()> {
        let mut staged_names = Vec::with_capacity(CATALOG.len());

        for category in CATALOG {
            let staging_name = format!("staging:{}", category.name);
            match builder::build_staging_from_file(dir, category.name, category.kind) {
                Ok(entries) => {
                    self.registry.load_staging(&staging_name, entries);
                    staged_names.push(staging_name);
                }
                Err(e) => {
                    for name in &staged_names {
                        self.registry.delete_staging(name);
                    }
                    return Err(e);
                }
            }
        }

        for category in CATALOG {
            let staging_name = format!("staging:{}", category.name);
            self.registry.swap(&staging_name, category.name)?;
            self.registry.delete_staging(&staging_name);
        }

        Ok(())
    }

    fn mark_success(&self) {
        let mut state = self.state.lock();
        state.status = LoaderStatus::Ok;
        state.last_update = Some(Utc::now());
        state.update_count += 1;
    }

    fn mark_failure(&self, reason: String) {
        error!(%reason, "blocklist refresh failed");
        let mut state = self.state.lock();
        state.status = LoaderStatus::Error(reason);
    }

    fn schedule_next(&self, at: DateTime<Utc>) {
        self.state.lock().next_update_at = Some(at);
    }
}

/// List `<base>/YYYYMMDD` entries and return the lexicographically greatest
/// (ISO dates sort chronologically), or `None` if no snapshot exists.
fn latest_snapshot_dir(base: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(base).ok()?;
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|s| s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()))
                .unwrap_or(false)
        })
        .max_by_key(|e| e.file_name())
        .map(|e| e.path())
}
