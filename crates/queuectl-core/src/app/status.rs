//! Status - `status` / `dlq` 表示用の集計

use serde::{Deserialize, Serialize};

use crate::domain::{Job, JobState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub dead: usize,
}

impl QueueCounts {
    /// Count jobs by state across the active collection and the DLQ.
    pub fn tally(active: &[Job], dead: &[Job]) -> Self {
        let mut counts = QueueCounts::default();
        for job in active.iter().chain(dead) {
            match job.state {
                JobState::Pending => counts.pending += 1,
                JobState::Processing => counts.processing += 1,
                JobState::Completed => counts.completed += 1,
                JobState::Dead => counts.dead += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.dead
    }
}
