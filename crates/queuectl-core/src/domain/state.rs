//! Job state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Job state.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Pending (retry, attempts incremented)
/// - Pending -> Processing -> Dead (retries exhausted, moved to the DLQ)
///
/// Serialized lowercase ("pending", "processing", ...) in the job store document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting to be claimed by a worker.
    Pending,

    /// Claimed by exactly one worker and currently executing.
    Processing,

    /// Command exited successfully.
    Completed,

    /// Failed permanently; lives in the dead-letter collection.
    Dead,
}

impl JobState {
    /// Is this job eligible for claiming?
    pub fn is_claimable(self) -> bool {
        matches!(self, JobState::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Dead => "dead",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
