//! Errors - エラー型と分類
//!
//! コマンドの失敗（exit code != 0）はエラーではなく `ExecOutcome::Failure` として扱う。
//! ここにあるのは store / config / 呼び出し側の誤用だけ。

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::{JobId, JobState};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("storage I/O failed for {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("timed out after {waited:?} waiting for store lock {}", .path.display())]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("job not found in active jobs: {0}")]
    UnknownJob(JobId),

    #[error("job {id} is {state}, only processing jobs can be committed")]
    NotClaimed { id: JobId, state: JobState },

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl QueueError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.into(),
            source,
        }
    }

    /// Store read/write failure: recoverable per operation, fatal at startup.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            QueueError::Storage { .. }
                | QueueError::Serialization { .. }
                | QueueError::LockTimeout { .. }
        )
    }
}
