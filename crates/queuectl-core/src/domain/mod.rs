//! Domain model (ids, job record, state, outcome, decision, events, errors).

pub mod decision;
pub mod errors;
pub mod events;
pub mod ids;
pub mod job;
pub mod outcome;
pub mod state;

pub use decision::{Decider, Decision, DefaultDecider};
pub use errors::QueueError;
pub use events::JobEvent;
pub use ids::JobId;
pub use job::Job;
pub use outcome::ExecOutcome;
pub use state::JobState;
