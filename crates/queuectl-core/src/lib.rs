//! queuectl-core
//!
//! Durable shell-command job queue: a JSON-file job store shared across
//! processes, exponential retry backoff, a dead letter queue and a pool of
//! async workers with graceful shutdown.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, job, state, outcome, decision, events, errors）
//! - **ports**: 抽象化レイヤー（JobStore, CommandExecutor, EventSink, Clock, IdGenerator）
//! - **queue**: JobStore の実装（ファイル / インメモリ）とバックオフ計算
//! - **impls**: その他の実装（ShellExecutor, EventSink）
//! - **app**: アプリケーションロジック（JobQueue, LifecycleEngine, WorkerGroup）
//! - **config**: `config.json` の読み込み

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;

pub use app::{JobQueue, JobQueueBuilder, QueueCounts, WorkerGroup};
pub use config::QueueConfig;
pub use domain::{Job, JobId, JobState, QueueError};
