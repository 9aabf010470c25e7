//! JobBook: the whole persisted document, `{ "jobs": [...], "dlq": [...] }`.
//!
//! Design:
//! - Pure data + pure operations; no locking, no I/O.
//! - Both stores run these operations under their own exclusion (a mutex for
//!   `InMemoryJobStore`, mutex + lock file + atomic rename for `FileJobStore`).
//! - `jobs` keeps insertion order, which is creation order, so the first
//!   Pending entry is the oldest one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Job, JobState, QueueError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobBook {
    /// Active jobs (Pending / Processing / Completed).
    #[serde(default)]
    pub jobs: Vec<Job>,

    /// Dead-lettered jobs.
    #[serde(default)]
    pub dlq: Vec<Job>,
}

impl JobBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: Job) {
        self.jobs.push(job);
    }

    /// Claim the oldest Pending job.
    pub fn claim_next_pending(&mut self, now: DateTime<Utc>) -> Option<Job> {
        let job = self.jobs.iter_mut().find(|job| job.state.is_claimable())?;
        job.claim(now);
        Some(job.clone())
    }

    /// Write back a job claimed earlier. Dead jobs move to the DLQ.
    pub fn commit(&mut self, job: Job) -> Result<(), QueueError> {
        let index = self
            .jobs
            .iter()
            .position(|stored| stored.id == job.id)
            .ok_or(QueueError::UnknownJob(job.id))?;

        let stored_state = self.jobs[index].state;
        if stored_state != JobState::Processing {
            return Err(QueueError::NotClaimed {
                id: job.id,
                state: stored_state,
            });
        }

        if job.state == JobState::Dead {
            self.jobs.remove(index);
            self.dlq.push(job);
        } else {
            self.jobs[index] = job;
        }
        Ok(())
    }

    pub fn active(&self) -> Vec<Job> {
        sorted_by_creation(&self.jobs)
    }

    pub fn dead(&self) -> Vec<Job> {
        sorted_by_creation(&self.dlq)
    }
}

fn sorted_by_creation(jobs: &[Job]) -> Vec<Job> {
    let mut jobs = jobs.to_vec();
    // stable: equal timestamps keep insertion order
    jobs.sort_by_key(|job| job.created_at);
    jobs
}
