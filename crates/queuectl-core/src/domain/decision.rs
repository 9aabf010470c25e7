//! Decision model: what happens to a job after one execution attempt.
//!
//! This module defines the Decision type (what to do next) and the Decider trait
//! (how to determine it from the job and the outcome).

use std::time::Duration;

use super::{ExecOutcome, Job};
use crate::queue::BackoffPolicy;

/// The next transition for a `Processing` job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The command succeeded.
    Complete,

    /// Put the job back to Pending; the deciding worker waits `delay` before polling again.
    Retry { attempts: u32, delay: Duration },

    /// Retries exhausted; move the job to the dead-letter collection.
    MarkDead { attempts: u32 },
}

/// Trait for deciding the next transition based on job state and outcome.
///
/// Deciders are pure functions: given the current state and observation,
/// they return the next action without side effects.
pub trait Decider: Send + Sync {
    fn decide(&self, job: &Job, outcome: &ExecOutcome) -> Decision;
}

/// Default decider.
///
/// - Success -> Complete
/// - Failure and `attempts + 1 <= max_retries` -> Retry with geometric backoff
/// - Failure and `attempts + 1 > max_retries` -> MarkDead
///
/// Applying the decision to the `Job` and committing it is the engine's job.
#[derive(Debug, Clone)]
pub struct DefaultDecider {
    backoff: BackoffPolicy,
}

impl DefaultDecider {
    pub fn new(backoff: BackoffPolicy) -> Self {
        Self { backoff }
    }
}

impl Decider for DefaultDecider {
    fn decide(&self, job: &Job, outcome: &ExecOutcome) -> Decision {
        if outcome.is_success() {
            return Decision::Complete;
        }

        let attempts = job.attempts.saturating_add(1);
        if attempts <= job.max_retries {
            Decision::Retry {
                attempts,
                delay: self.backoff.delay_for(attempts),
            }
        } else {
            Decision::MarkDead { attempts }
        }
    }
}
