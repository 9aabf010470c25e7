//! Configuration.
//!
//! Everything the store and the worker pool need is passed in explicitly
//! through `QueueConfig`; nothing is looked up from ambient globals.
//!
//! `<data_dir>/config.json` holds the retry defaults. When it is missing it is
//! created with `{ "max_retries": 3, "backoff_base": 2 }`. The remaining keys
//! are optional and fall back to the defaults below.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::WorkerSettings;
use crate::domain::QueueError;
use crate::queue::{BackoffPolicy, LockSettings};

pub const STORE_FILE: &str = "jobs.json";
pub const CONFIG_FILE: &str = "config.json";

/// On-disk shape of `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_base")]
    pub backoff_base: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_unit_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backoff_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_timeout_ms: Option<u64>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> u32 {
    2
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base: default_backoff_base(),
            backoff_unit_ms: None,
            max_backoff_ms: None,
            poll_interval_ms: None,
            lock_timeout_ms: None,
        }
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub store_path: PathBuf,
    /// Assigned to each newly enqueued job.
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
    pub worker: WorkerSettings,
    pub lock: LockSettings,
}

impl QueueConfig {
    /// Defaults with the store inside `data_dir`. Does not touch the filesystem.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::from_file(data_dir.as_ref(), ConfigFile::default())
    }

    /// Read (or create) `<data_dir>/config.json` and resolve it.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, QueueError> {
        let data_dir = data_dir.as_ref();
        let file = read_or_create(&data_dir.join(CONFIG_FILE))?;
        let config = Self::from_file(data_dir, file);
        config.validate()?;
        Ok(config)
    }

    fn from_file(data_dir: &Path, file: ConfigFile) -> Self {
        let defaults = BackoffPolicy::default();
        let unit = file.backoff_unit_ms.map_or(defaults.unit, Duration::from_millis);
        let max_delay = file.max_backoff_ms.map_or(defaults.max_delay, Duration::from_millis);
        let backoff = BackoffPolicy::new(file.backoff_base, unit).with_max_delay(max_delay);

        let idle_interval = WorkerSettings::default().idle_interval;
        let worker = WorkerSettings {
            idle_interval: file.poll_interval_ms.map_or(idle_interval, Duration::from_millis),
        };

        let lock = LockSettings {
            timeout: file
                .lock_timeout_ms
                .map_or(LockSettings::default().timeout, Duration::from_millis),
        };

        Self {
            store_path: data_dir.join(STORE_FILE),
            max_retries: file.max_retries,
            backoff,
            worker,
            lock,
        }
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.backoff.base == 0 {
            return Err(QueueError::Config("backoff_base must be at least 1".into()));
        }
        if self.worker.idle_interval.is_zero() {
            return Err(QueueError::Config("poll_interval_ms must be positive".into()));
        }
        if self.lock.timeout.is_zero() {
            return Err(QueueError::Config("lock_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

fn read_or_create(path: &Path) -> Result<ConfigFile, QueueError> {
    match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).map_err(|e| QueueError::serialization(path, e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let file = ConfigFile::default();
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(dir).map_err(|e| QueueError::storage(dir, e))?;
            }
            let raw = serde_json::to_string_pretty(&file)
                .map_err(|e| QueueError::serialization(path, e))?;
            fs::write(path, raw + "\n").map_err(|e| QueueError::storage(path, e))?;
            Ok(file)
        }
        Err(e) => Err(QueueError::storage(path, e)),
    }
}
