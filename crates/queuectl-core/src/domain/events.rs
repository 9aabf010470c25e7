//! Events - ジョブのライフサイクルイベント
//!
//! core はイベントを `EventSink` に渡すだけで、表示方法（色付きコンソール、JSON ログなど）には依存しない。

use std::time::Duration;

use super::JobId;

/// JobEvent はライフサイクル上で発生したイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// enqueue 直後（state = Pending）
    JobEnqueued { id: JobId, command: String },

    /// worker が claim した（Pending -> Processing）
    JobClaimed { id: JobId, worker: usize },

    /// コマンド成功（Processing -> Completed）
    JobCompleted { id: JobId },

    /// 失敗、リトライ予定（Processing -> Pending）
    JobRetrying {
        id: JobId,
        attempt: u32,
        delay: Duration,
        reason: String,
    },

    /// リトライ上限に到達（Processing -> Dead）
    JobDeadLettered {
        id: JobId,
        attempts: u32,
        reason: String,
    },
}

impl JobEvent {
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::JobEnqueued { .. } => "JobEnqueued",
            JobEvent::JobClaimed { .. } => "JobClaimed",
            JobEvent::JobCompleted { .. } => "JobCompleted",
            JobEvent::JobRetrying { .. } => "JobRetrying",
            JobEvent::JobDeadLettered { .. } => "JobDeadLettered",
        }
    }
}
