//! JobQueue - 外側（CLI など）から使う唯一の入口
//!
//! - `enqueue()` で Pending の job を追加
//! - `start_worker()` で N 本の worker を起動（戻り値の WorkerGroup で停止）
//! - `list_active()` / `list_dead()` で一覧

use std::sync::Arc;

use tokio::sync::Notify;

use super::builder::JobQueueBuilder;
use super::engine::LifecycleEngine;
use super::worker_loop::{WorkerGroup, WorkerSettings};
use crate::config::QueueConfig;
use crate::domain::{Decider, Job, JobEvent, QueueError};
use crate::ports::{Clock, CommandExecutor, EventSink, JobStore};

pub struct JobQueue {
    store: Arc<dyn JobStore>,
    engine: Arc<LifecycleEngine>,
    events: Arc<dyn EventSink>,
    worker: WorkerSettings,
    /// enqueue のたびに idle な worker を 1 本起こす
    wake: Arc<Notify>,
}

impl JobQueue {
    /// Open the queue described by `config` with the default components.
    pub async fn open(config: &QueueConfig) -> Result<Self, QueueError> {
        JobQueueBuilder::new(config.clone()).build().await
    }

    pub fn builder(config: QueueConfig) -> JobQueueBuilder {
        JobQueueBuilder::new(config)
    }

    pub(super) fn from_parts(
        store: Arc<dyn JobStore>,
        executor: Arc<dyn CommandExecutor>,
        decider: Arc<dyn Decider>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        worker: WorkerSettings,
    ) -> Self {
        let engine = Arc::new(LifecycleEngine::new(
            Arc::clone(&store),
            executor,
            decider,
            Arc::clone(&events),
            clock,
        ));
        Self {
            store,
            engine,
            events,
            worker,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Persist a new Pending job for `command`.
    pub async fn enqueue(&self, command: &str) -> Result<Job, QueueError> {
        if command.trim().is_empty() {
            return Err(QueueError::InvalidCommand(command.to_string()));
        }

        let job = self.store.enqueue(command).await?;
        self.events.emit(&JobEvent::JobEnqueued {
            id: job.id,
            command: job.command.clone(),
        });
        self.wake.notify_one();
        Ok(job)
    }

    /// Start `count` workers in this process.
    pub fn start_worker(&self, count: usize) -> Result<WorkerGroup, QueueError> {
        if count == 0 {
            return Err(QueueError::Config("worker count must be at least 1".into()));
        }
        Ok(WorkerGroup::spawn(
            count,
            Arc::clone(&self.engine),
            self.worker.clone(),
            Arc::clone(&self.wake),
        ))
    }

    /// Pending, Processing and Completed jobs, oldest first.
    pub async fn list_active(&self) -> Result<Vec<Job>, QueueError> {
        self.store.list_active().await
    }

    /// Dead jobs, oldest first.
    pub async fn list_dead(&self) -> Result<Vec<Job>, QueueError> {
        self.store.list_dead().await
    }
}
