//! App - アプリケーション層
//!
//! ports を組み合わせて job のライフサイクルを動かす。
//!
//! # 主要コンポーネント
//! - **JobQueue / JobQueueBuilder**: 外側から使う入口とそのワイヤリング
//! - **LifecycleEngine**: claim → 実行 → decide → commit
//! - **WorkerGroup**: N 本の poll loop と graceful shutdown
//! - **QueueCounts**: status 表示用の集計

pub mod builder;
pub mod engine;
pub mod queue;
pub mod status;
pub mod worker_loop;

pub use self::builder::JobQueueBuilder;
pub use self::engine::{EngineError, LifecycleEngine, Transition, Uncommitted};
pub use self::queue::JobQueue;
pub use self::status::QueueCounts;
pub use self::worker_loop::{WorkerGroup, WorkerSettings};
