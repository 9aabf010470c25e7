//! JobQueueBuilder - JobQueue の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンで ports の実装を差し替え可能にする
//! - 起動時検証（Fail-fast 設計）: 設定とストアの open は build() で失敗させる

use std::sync::Arc;

use super::queue::JobQueue;
use crate::config::QueueConfig;
use crate::domain::{DefaultDecider, QueueError};
use crate::impls::{ShellExecutor, TracingEventSink};
use crate::ports::{Clock, CommandExecutor, EventSink, JobStore, SystemClock};
use crate::queue::FileJobStore;

/// JobQueueBuilder は JobQueue を構築
///
/// # 使用例
/// ```ignore
/// let queue = JobQueueBuilder::new(QueueConfig::load(".")?)
///     .event_sink(Arc::new(MemoryEventSink::new()))
///     .build()
///     .await?;
/// ```
///
/// 指定しなかった部品は既定の実装になる:
/// - store: `FileJobStore`（`config.store_path`）
/// - executor: `ShellExecutor`
/// - event sink: `TracingEventSink`
pub struct JobQueueBuilder {
    config: QueueConfig,
    store: Option<Arc<dyn JobStore>>,
    executor: Option<Arc<dyn CommandExecutor>>,
    events: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
}

impl JobQueueBuilder {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            store: None,
            executor: None,
            events: None,
            clock: None,
        }
    }

    /// Use an already opened store instead of the file store.
    pub fn store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration, open the store and wire everything up.
    pub async fn build(self) -> Result<JobQueue, QueueError> {
        self.config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = match self.store {
            Some(store) => store,
            None => Arc::new(
                FileJobStore::open_with_clock(
                    &self.config.store_path,
                    self.config.max_retries,
                    self.config.lock.clone(),
                    Arc::clone(&clock),
                )
                .await?,
            ),
        };
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(ShellExecutor::new()));
        let events = self.events.unwrap_or_else(|| Arc::new(TracingEventSink));
        let decider = Arc::new(DefaultDecider::new(self.config.backoff.clone()));

        Ok(JobQueue::from_parts(
            store,
            executor,
            decider,
            events,
            clock,
            self.config.worker,
        ))
    }
}
