//! File-backed job store (`jobs.json`).
//!
//! Every operation is one atomic read-modify-write of the whole document:
//! 1. in-process `Mutex` (workers of this process queue up here, not on the lock file)
//! 2. `StoreLock` (other processes sharing the file)
//! 3. re-read the document, apply a `JobBook` operation
//! 4. write to a temp file in the same directory, fsync, rename over the store
//!
//! Readers take the same path, so they never see a partial write.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;

use super::{JobBook, LockSettings, StoreLock};
use crate::domain::{Job, QueueError};
use crate::ports::{Clock, IdGenerator, JobStore, SystemClock, UlidGenerator};

pub struct FileJobStore {
    path: PathBuf,
    lock_settings: LockSettings,
    max_retries: u32,
    guard: Mutex<()>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl FileJobStore {
    /// Open the store, creating the directory and an empty document if needed.
    ///
    /// An error here is fatal to startup.
    pub async fn open(
        path: impl Into<PathBuf>,
        max_retries: u32,
        lock_settings: LockSettings,
    ) -> Result<Self, QueueError> {
        Self::open_with_clock(path, max_retries, lock_settings, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(
        path: impl Into<PathBuf>,
        max_retries: u32,
        lock_settings: LockSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, QueueError> {
        let store = Self {
            path: path.into(),
            lock_settings,
            max_retries,
            guard: Mutex::new(()),
            ids: Arc::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
        };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<(), QueueError> {
        // writes the empty document when the file does not exist yet
        self.transact(|_| Ok(((), false))).await?;
        debug!(store = %self.path.display(), "job store ready");
        Ok(())
    }

    /// Run `op` against the current document under both locks.
    ///
    /// `op` returns `(result, dirty)`; the document is written back only when dirty.
    async fn transact<T, F>(&self, op: F) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(&mut JobBook) -> Result<(T, bool), QueueError> + Send + 'static,
    {
        let _in_process = self.guard.lock().await;
        let path = self.path.clone();
        let lock_settings = self.lock_settings.clone();

        tokio::task::spawn_blocking(move || {
            ensure_parent_dir(&path)?;
            let _lock = StoreLock::acquire(&path, &lock_settings)?;
            let (mut book, existed) = load(&path)?;
            let (value, dirty) = op(&mut book)?;
            if dirty || !existed {
                save(&path, &book)?;
            }
            Ok(value)
        })
        .await
        .map_err(|e| QueueError::storage(&self.path, std::io::Error::other(e)))?
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn enqueue(&self, command: &str) -> Result<Job, QueueError> {
        let command = command.to_string();
        let max_retries = self.max_retries;
        let clock = Arc::clone(&self.clock);
        let ids = Arc::clone(&self.ids);
        // id and created_at are taken under the lock so list order matches claim order
        let job = self
            .transact(move |book| {
                let job = Job::new(ids.generate_job_id(), command, max_retries, clock.now());
                book.push(job.clone());
                Ok((job, true))
            })
            .await?;
        debug!(job.id = %job.id, store = %self.path.display(), "job persisted");
        Ok(job)
    }

    async fn claim_next_pending(&self) -> Result<Option<Job>, QueueError> {
        let clock = Arc::clone(&self.clock);
        self.transact(move |book| {
            let claimed = book.claim_next_pending(clock.now());
            let dirty = claimed.is_some();
            Ok((claimed, dirty))
        })
        .await
    }

    async fn commit(&self, job: Job) -> Result<(), QueueError> {
        self.transact(move |book| {
            book.commit(job)?;
            Ok(((), true))
        })
        .await
    }

    async fn list_active(&self) -> Result<Vec<Job>, QueueError> {
        self.transact(|book| Ok((book.active(), false))).await
    }

    async fn list_dead(&self) -> Result<Vec<Job>, QueueError> {
        self.transact(|book| Ok((book.dead(), false))).await
    }
}

/// Read the document. A missing file is an empty book (`existed == false`).
fn load(path: &Path) -> Result<(JobBook, bool), QueueError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((JobBook::new(), false)),
        Err(e) => return Err(QueueError::storage(path, e)),
    };
    let book = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| QueueError::serialization(path, e))?;
    Ok((book, true))
}

fn ensure_parent_dir(path: &Path) -> Result<(), QueueError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| QueueError::storage(dir, e))
        }
        _ => Ok(()),
    }
}

/// Atomic replace: temp file in the same directory, fsync, rename.
fn save(path: &Path, book: &JobBook) -> Result<(), QueueError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(|e| QueueError::storage(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, book)
            .map_err(|e| QueueError::serialization(path, e))?;
        writer.write_all(b"\n").map_err(|e| QueueError::storage(path, e))?;
        writer.flush().map_err(|e| QueueError::storage(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| QueueError::storage(path, e))?;
    tmp.persist(path).map_err(|e| QueueError::storage(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobState;
    use std::time::Duration;

    fn lock_settings() -> LockSettings {
        LockSettings {
            timeout: Duration::from_secs(5),
        }
    }

    async fn open(path: &Path) -> FileJobStore {
        FileJobStore::open(path, 2, lock_settings()).await.unwrap()
    }

    #[tokio::test]
    async fn open_creates_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jobs.json");

        open(&path).await;

        let raw = fs::read_to_string(&path).unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v, serde_json::json!({ "jobs": [], "dlq": [] }));
        // nothing is left holding the lock
        let free = LockSettings {
            timeout: Duration::from_millis(50),
        };
        StoreLock::acquire(&path, &free).unwrap();
    }

    #[tokio::test]
    async fn enqueue_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");

        let job = open(&path).await.enqueue("echo hi").await.unwrap();

        let reopened = open(&path).await;
        let active = reopened.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, job.id);
        assert_eq!(active[0].command, "echo hi");
        assert_eq!(active[0].state, JobState::Pending);
        assert_eq!(active[0].attempts, 0);
    }

    #[tokio::test]
    async fn dead_commit_is_visible_in_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        let store = open(&path).await;
        store.enqueue("false").await.unwrap();

        let mut job = store.claim_next_pending().await.unwrap().unwrap();
        job.attempts = 2;
        job.mark_dead(chrono::Utc::now());
        store.commit(job).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["jobs"].as_array().unwrap().len(), 0);
        assert_eq!(raw["dlq"][0]["state"], "dead");
        assert_eq!(raw["dlq"][0]["attempts"], 3);
        assert_eq!(raw["dlq"][0]["command"], "false");
    }

    #[tokio::test]
    async fn malformed_document_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        fs::write(&path, "{ not json").unwrap();

        let err = FileJobStore::open(&path, 2, lock_settings())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, QueueError::Serialization { .. }));
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn two_stores_on_one_file_never_double_claim() {
        // two handles on one file stand in for two worker processes
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        let a = Arc::new(open(&path).await);
        let b = Arc::new(open(&path).await);
        for i in 0..10 {
            a.enqueue(&format!("echo {i}")).await.unwrap();
        }

        let mut handles = Vec::new();
        for store in [a.clone(), b.clone(), a.clone(), b.clone()] {
            handles.push(tokio::spawn(async move {
                let mut mine = Vec::new();
                while let Some(job) = store.claim_next_pending().await.unwrap() {
                    mine.push(job.id);
                }
                mine
            }));
        }
        let mut claimed = Vec::new();
        for handle in handles {
            claimed.extend(handle.await.unwrap());
        }

        claimed.sort();
        let before = claimed.len();
        claimed.dedup();
        assert_eq!(before, 10);
        assert_eq!(claimed.len(), 10);

        let active = b.list_active().await.unwrap();
        assert!(active.iter().all(|job| job.state == JobState::Processing));
    }

    #[tokio::test]
    async fn single_pending_job_goes_to_exactly_one_racer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        let a = Arc::new(open(&path).await);
        let b = Arc::new(open(&path).await);
        a.enqueue("echo only").await.unwrap();

        let (ra, rb) = tokio::join!(
            {
                let a = a.clone();
                async move { a.claim_next_pending().await.unwrap() }
            },
            {
                let b = b.clone();
                async move { b.claim_next_pending().await.unwrap() }
            }
        );
        assert_eq!(ra.is_some() as u8 + rb.is_some() as u8, 1);
    }

    #[tokio::test]
    async fn concurrent_enqueues_claim_in_listing_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        let a = Arc::new(open(&path).await);
        let b = Arc::new(open(&path).await);

        let mut handles = Vec::new();
        for i in 0..12 {
            let store = if i % 2 == 0 { a.clone() } else { b.clone() };
            handles.push(tokio::spawn(async move {
                store.enqueue(&format!("echo {i}")).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let listed: Vec<_> = a.list_active().await.unwrap().iter().map(|j| j.id).collect();
        let mut claimed = Vec::new();
        while let Some(job) = b.claim_next_pending().await.unwrap() {
            claimed.push(job.id);
        }
        assert_eq!(claimed, listed);
    }
}
