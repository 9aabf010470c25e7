//! Queue module: backoff policy, the persisted job document, and the job stores.

mod book;
mod file;
mod lock;
mod memory;
mod retry;

pub use book::JobBook;
pub use file::FileJobStore;
pub use lock::{LockSettings, StoreLock};
pub use memory::InMemoryJobStore;
pub use retry::{BackoffPolicy, DEFAULT_MAX_DELAY, compute_delay};
