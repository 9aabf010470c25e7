//! Cross-process store lock.
//!
//! An OS advisory lock (`File::try_lock`) on a lock file next to the store
//! (`jobs.json.lock`). The file itself is never deleted; ownership is the OS
//! lock, not the file's existence. The OS drops the lock when the holder's
//! handle closes, including when the holding process dies, so there is no
//! stale-lock cleanup and a slow holder is never evicted.
//! Blocking: call from `spawn_blocking`.

use std::fs::{File, OpenOptions, TryLockError};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::domain::QueueError;

const RETRY_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSettings {
    /// Give up with `QueueError::LockTimeout` after this long.
    pub timeout: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Held lock; released when dropped (the file handle closes).
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
}

impl StoreLock {
    /// Lock file path for a store file.
    pub fn path_for(store_path: &Path) -> PathBuf {
        let mut name = store_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        store_path.with_file_name(name)
    }

    pub fn acquire(store_path: &Path, settings: &LockSettings) -> Result<Self, QueueError> {
        let path = Self::path_for(store_path);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| QueueError::storage(&path, e))?;

        let start = Instant::now();
        loop {
            match file.try_lock() {
                Ok(()) => break,
                Err(TryLockError::WouldBlock) => {
                    let waited = start.elapsed();
                    if waited >= settings.timeout {
                        return Err(QueueError::LockTimeout { path, waited });
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(TryLockError::Error(e)) => return Err(QueueError::storage(&path, e)),
            }
        }

        // owner pid is informational only
        if let Err(e) = record_owner(&mut file) {
            trace!(lock = %path.display(), error = %e, "could not record lock owner");
        }
        Ok(Self { _file: file })
    }
}

fn record_owner(file: &mut File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())
}
