//! EventSink の実装

use std::sync::Mutex;

use tracing::{info, warn};

use crate::domain::JobEvent;
use crate::ports::EventSink;

/// ライフサイクルイベントを tracing の構造化ログとして出力する
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &JobEvent) {
        match event {
            JobEvent::JobEnqueued { id, command } => {
                info!(event = event.name(), job.id = %id, %command, "job enqueued");
            }
            JobEvent::JobClaimed { id, worker } => {
                info!(event = event.name(), job.id = %id, worker.id = worker, "job claimed");
            }
            JobEvent::JobCompleted { id } => {
                info!(event = event.name(), job.id = %id, "job completed");
            }
            JobEvent::JobRetrying {
                id,
                attempt,
                delay,
                reason,
            } => {
                warn!(
                    event = event.name(),
                    job.id = %id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %reason,
                    "job failed, retrying"
                );
            }
            JobEvent::JobDeadLettered {
                id,
                attempts,
                reason,
            } => {
                warn!(
                    event = event.name(),
                    job.id = %id,
                    attempts,
                    %reason,
                    "job failed permanently, moved to DLQ"
                );
            }
        }
    }
}

/// イベントを記録するだけ（テスト・埋め込み用）
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<JobEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<JobEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &JobEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
