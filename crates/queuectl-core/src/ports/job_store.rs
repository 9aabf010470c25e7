//! JobStore port - 全 job と DLQ の正本（source of truth）
//!
//! # 設計原則
//! - 変更系（enqueue / claim_next_pending / commit）はすべて store 単位で直列化された
//!   read-modify-write。同じ Pending job を 2 つの worker が claim することはない
//! - 永続化はアトミック（他の reader が書きかけの状態を見ることはない）
//! - 読み取り系は snapshot を返す

use async_trait::async_trait;

use crate::domain::{Job, QueueError};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Pending の新しい job を作成して保存し、それを返す
    async fn enqueue(&self, command: &str) -> Result<Job, QueueError>;

    /// 作成順で最初の Pending job を Processing にして返す。無ければ None
    async fn claim_next_pending(&self) -> Result<Option<Job>, QueueError>;

    /// job を id で上書き保存する。state が Dead なら active から外して DLQ に移す
    ///
    /// 保存されている job が Processing でない場合は `QueueError::NotClaimed`
    async fn commit(&self, job: Job) -> Result<(), QueueError>;

    /// active な job（Pending / Processing / Completed）。created_at 順
    async fn list_active(&self) -> Result<Vec<Job>, QueueError>;

    /// DLQ の job。created_at 順
    async fn list_dead(&self) -> Result<Vec<Job>, QueueError>;
}
