//! Background snapshotting
//!
//! `SnapshotTask` saves the shared index to its snapshot file on a fixed
//! period. A failed save is logged and retried on the next tick; the
//! in-memory index is never affected. `shutdown` stops the loop and writes
//! one last snapshot so the file reflects the final state.

use crate::config::IndexConfig;
use crate::error::{Result, SiftError};
use crate::index::SearchIndex;
use crate::snapshot::Codec;
use crate::storage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct SnapshotTask {
    index: Arc<SearchIndex>,
    path: PathBuf,
    codec: Codec,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SnapshotTask {
    /// Starts the loop on the current tokio runtime. Every save uses `codec`.
    pub fn spawn(index: Arc<SearchIndex>, path: PathBuf, period: Duration, codec: Codec) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            index.clone(),
            path.clone(),
            codec,
            period,
            cancel.clone(),
        ));

        tracing::info!(
            "Snapshotting search index to {} every {:?} ({:?})",
            path.display(),
            period,
            codec
        );

        Self {
            index,
            path,
            codec,
            cancel,
            handle,
        }
    }

    /// Snapshot path, period and compression all come from `config`.
    pub fn from_config(index: Arc<SearchIndex>, config: &IndexConfig) -> Self {
        Self::spawn(
            index,
            config.snapshot_path(),
            config.snapshot_interval,
            config.codec(),
        )
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Saves immediately, outside the regular schedule.
    pub async fn snapshot_now(&self) -> Result<()> {
        save_blocking(self.index.clone(), self.path.clone(), self.codec).await
    }

    /// Stops the loop and performs the final snapshot.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!("Snapshot loop ended abnormally: {}", e);
        }
        save_blocking(self.index, self.path, self.codec).await
    }
}

async fn run_loop(
    index: Arc<SearchIndex>,
    path: PathBuf,
    codec: Codec,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; nothing has changed yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = save_blocking(index.clone(), path.clone(), codec).await {
                    tracing::error!("Periodic snapshot to {} failed: {}", path.display(), e);
                }
            }
        }
    }

    tracing::debug!("Snapshot loop for {} stopped", path.display());
}

async fn save_blocking(index: Arc<SearchIndex>, path: PathBuf, codec: Codec) -> Result<()> {
    tokio::task::spawn_blocking(move || storage::save_to_path(&index, &path, codec))
        .await
        .map_err(|e| SiftError::Io(std::io::Error::other(e)))?
}
