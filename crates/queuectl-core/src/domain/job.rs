//! Job record: the persisted unit of work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::JobId;
use super::state::JobState;

/// A shell-command job.
///
/// Design:
/// - This is the "single source of truth" for a job's lifecycle.
/// - State transitions happen through the methods below, called only by the
///   lifecycle engine (or the store, for the Pending -> Processing claim).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub command: String,
    pub state: JobState,

    /// Number of failed execution attempts so far.
    pub attempts: u32,

    /// Ceiling on retries after the first attempt.
    pub max_retries: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, command: impl Into<String>, max_retries: u32, now: DateTime<Utc>) -> Self {
        Self {
            id,
            command: command.into(),
            state: JobState::Pending,
            attempts: 0,
            max_retries,
            created_at: now,
            updated_at: now,
        }
    }

    /// Upper bound on `attempts`: the first run plus `max_retries` retries.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Pending -> Processing.
    pub fn claim(&mut self, now: DateTime<Utc>) {
        self.state = JobState::Processing;
        self.updated_at = now;
    }

    /// Processing -> Completed.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.state = JobState::Completed;
        self.updated_at = now;
    }

    /// Processing -> Pending, recording one more failed attempt.
    pub fn schedule_retry(&mut self, now: DateTime<Utc>) {
        self.attempts += 1;
        self.state = JobState::Pending;
        self.updated_at = now;
    }

    /// Processing -> Dead, recording the final failed attempt.
    pub fn mark_dead(&mut self, now: DateTime<Utc>) {
        self.attempts += 1;
        self.state = JobState::Dead;
        self.updated_at = now;
    }
}
