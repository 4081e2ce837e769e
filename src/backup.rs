use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::engine::Engine;

/// `<dir>/reservations-<UTC timestamp>.json`
pub fn backup_path(dir: &Path, at: DateTime<Utc>) -> PathBuf {
    dir.join(format!("reservations-{}.json", at.format("%Y%m%dT%H%M%S%.3fZ")))
}

/// Background task that periodically exports the store into `dir`.
pub async fn run_backup_scheduler(engine: Arc<Engine>, dir: PathBuf, every: Duration) {
    let mut interval = tokio::time::interval(every);
    // First tick fires immediately; the store was just loaded.
    interval.tick().await;
    loop {
        interval.tick().await;
        let path = backup_path(&dir, Utc::now());
        if engine.backup(&path).await {
            info!("scheduled backup written to {}", path.display());
        } else {
            warn!("scheduled backup to {} failed", path.display());
        }
    }
}
