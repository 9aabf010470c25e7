//! In-memory job store.
//!
//! Single-process deployments and tests. Nothing survives a restart.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::JobBook;
use crate::domain::{Job, QueueError};
use crate::ports::{Clock, IdGenerator, JobStore, SystemClock, UlidGenerator};

/// In-memory job store.
///
/// The mutex is the single coordinating owner: every operation is one
/// critical section, so a claim is never observed half-done.
pub struct InMemoryJobStore {
    book: Mutex<JobBook>,
    max_retries: u32,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryJobStore {
    pub fn new(max_retries: u32) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_clock(max_retries, clock)
    }

    pub fn with_clock(max_retries: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            book: Mutex::new(JobBook::new()),
            max_retries,
            ids: Arc::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
        }
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn enqueue(&self, command: &str) -> Result<Job, QueueError> {
        let mut book = self.book.lock().await;
        // created under the lock: insertion order (claim order) follows created_at
        let job = Job::new(
            self.ids.generate_job_id(),
            command,
            self.max_retries,
            self.clock.now(),
        );
        book.push(job.clone());
        Ok(job)
    }

    async fn claim_next_pending(&self) -> Result<Option<Job>, QueueError> {
        let mut book = self.book.lock().await;
        Ok(book.claim_next_pending(self.clock.now()))
    }

    async fn commit(&self, job: Job) -> Result<(), QueueError> {
        self.book.lock().await.commit(job)
    }

    async fn list_active(&self) -> Result<Vec<Job>, QueueError> {
        Ok(self.book.lock().await.active())
    }

    async fn list_dead(&self) -> Result<Vec<Job>, QueueError> {
        Ok(self.book.lock().await.dead())
    }
}
