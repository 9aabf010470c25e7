//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! LifecycleEngine / WorkerGroup はこれらの trait にだけ依存し、
//! ファイル・プロセス・ログ出力などの実装の詳細は queue / impls 側に置きます。

pub mod clock;
pub mod event_sink;
pub mod executor;
pub mod id_generator;
pub mod job_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::executor::CommandExecutor;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::job_store::JobStore;
