// src/snapshot.rs
//! Single-file snapshot of the last discovery list. Absence and corruption read
//! as "no snapshot"; write failures are logged and swallowed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::counter;

use crate::card::Snapshot;

#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: PathBuf,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn read(&self) -> Option<Snapshot> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(target: "snapshot", path = %self.path.display(), error = %e, "snapshot unreadable");
                return None;
            }
        };
        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snap) => Some(snap),
            Err(e) => {
                tracing::warn!(target: "snapshot", path = %self.path.display(), error = %e, "snapshot corrupt, ignoring");
                None
            }
        }
    }

    /// Overwrite the stored snapshot. Returns false (after logging) on failure.
    pub async fn write(&self, snapshot: &Snapshot) -> bool {
        match self.try_write(snapshot).await {
            Ok(()) => {
                tracing::debug!(target: "snapshot", count = snapshot.discoveries.len(), "snapshot written");
                true
            }
            Err(e) => {
                tracing::warn!(target: "snapshot", path = %self.path.display(), "could not write snapshot: {e:#}");
                counter!("discovery_snapshot_write_errors_total").increment(1);
                false
            }
        }
    }

    async fn try_write(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let body = serde_json::to_vec_pretty(snapshot).context("serializing snapshot")?;

        // Write-then-rename so a crash never leaves a half-written snapshot.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("renaming into {}", self.path.display()))?;
        Ok(())
    }

    /// Fresh while `now - timestamp < ttl`.
    pub fn is_fresh(&self, snapshot: &Snapshot, now_ms: i64) -> bool {
        let age = now_ms.saturating_sub(snapshot.timestamp);
        age >= 0 && (age as u128) < self.ttl.as_millis()
    }
}
