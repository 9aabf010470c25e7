//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ShellExecutor**: `sh -c` / `cmd.exe /C` でコマンドを実行する CommandExecutor
//! - **TracingEventSink**: イベントを tracing に流す（CLI のデフォルト）
//! - **MemoryEventSink**: イベントを記録するだけ（テスト用）
//!
//! JobStore の実装は `queue` モジュール（InMemoryJobStore / FileJobStore）にあります。

pub mod shell;
pub mod sinks;

// 主要な型を再エクスポート
pub use self::shell::{HostShell, ShellExecutor, normalize_command};
pub use self::sinks::{MemoryEventSink, TracingEventSink};
