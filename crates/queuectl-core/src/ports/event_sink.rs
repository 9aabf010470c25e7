//! EventSink port - ライフサイクルイベントの出力先
//!
//! # 実装
//! - `TracingEventSink`: tracing に流す（CLI のデフォルト）
//! - `MemoryEventSink`: 記録するだけ（テスト用）

use crate::domain::JobEvent;

/// EventSink はライフサイクルイベントを受け取る
///
/// emit は同期・infallible。表示の失敗で job の遷移を止めてはいけない。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &JobEvent);
}
