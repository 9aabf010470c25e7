//! CommandExecutor port - job のコマンドを 1 回実行する
//!
//! Executor 自身はリトライしない。リトライ方針は LifecycleEngine の責務。

use async_trait::async_trait;

use crate::domain::ExecOutcome;

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// コマンドを実行して結果を返す。失敗は `ExecOutcome::Failure` で表現し、エラーにはしない
    async fn run(&self, command: &str) -> ExecOutcome;
}
