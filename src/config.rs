use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_NOTIFY_QUEUE: usize = 1024;
const DEFAULT_BACKUP_INTERVAL_SECS: u64 = 3600;

/// Process settings, read from `ROOMBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub store_file: PathBuf,
    pub capacity_file: PathBuf,
    pub lecture_file: PathBuf,
    pub metrics_port: Option<u16>,
    pub notify_queue: usize,
    /// Scheduled backups are off unless set.
    pub backup_dir: Option<PathBuf>,
    pub backup_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparsable numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = PathBuf::from(lookup("ROOMBOOK_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into()));
        let capacity_file = lookup("ROOMBOOK_CAPACITY_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("room-capacity.json"));
        let metrics_port = lookup("ROOMBOOK_METRICS_PORT").and_then(|s| s.parse().ok());
        let notify_queue = lookup("ROOMBOOK_NOTIFY_QUEUE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_NOTIFY_QUEUE);
        let backup_dir = lookup("ROOMBOOK_BACKUP_DIR").map(PathBuf::from);
        let backup_secs: u64 = lookup("ROOMBOOK_BACKUP_INTERVAL_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|&s| s > 0)
            .unwrap_or(DEFAULT_BACKUP_INTERVAL_SECS);

        Self {
            store_file: data_dir.join("reservations.json"),
            lecture_file: data_dir.join("lectures.json"),
            data_dir,
            capacity_file,
            metrics_port,
            notify_queue,
            backup_dir,
            backup_interval: Duration::from_secs(backup_secs),
        }
    }
}
