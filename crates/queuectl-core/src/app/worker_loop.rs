//! WorkerLoop - N 本の poll loop を並行に動かす
//!
//! # フロー（各 worker）
//! 1. LifecycleEngine::run_once() で claim → 実行 → commit
//! 2. 何も無ければ idle_interval だけ待つ（enqueue の通知で早めに起きる）
//! 3. Retry になったら、その worker だけがバックオフ分待つ（他の worker は止めない）
//! 4. commit できなかった遷移は worker が持ち続け、次の poll で新しい job より先に書き戻す
//!
//! 待ちの間に shutdown が来たらすぐ抜ける。実行中の job は必ず 1 つの遷移を
//! commit してから止まる（Processing のまま放置しない）。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::engine::{EngineError, LifecycleEngine, Transition, Uncommitted};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// How long an idle worker waits before polling again.
    pub idle_interval: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(2),
        }
    }
}

/// Worker group handle.
/// - `request_shutdown()` で全 worker に停止を要求
/// - `join()` / `shutdown_and_join()` で全 worker の終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers.
    pub fn spawn(
        n: usize,
        engine: Arc<LifecycleEngine>,
        settings: WorkerSettings,
        wake: Arc<Notify>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let engine = Arc::clone(&engine);
            let settings = settings.clone();
            let wake = Arc::clone(&wake);
            let rx = shutdown_rx.clone();

            joins.push(tokio::spawn(async move {
                worker_loop(worker_id, engine, settings, wake, rx).await;
            }));
        }

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Request shutdown for all workers.
    /// 実行中の job は中断しない。現在の遷移を commit してから止まる。
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for all workers to exit.
    pub async fn join(self) {
        for join in self.joins {
            if let Err(e) = join.await {
                error!(error = %e, "worker task panicked");
            }
        }
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        self.join().await;
    }
}

enum Pause {
    Idle,
    Backoff(Duration),
}

async fn worker_loop(
    worker_id: usize,
    engine: Arc<LifecycleEngine>,
    settings: WorkerSettings,
    wake: Arc<Notify>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(worker.id = worker_id, "worker started");
    let mut uncommitted: Option<Uncommitted> = None;
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // run_once は shutdown と競合させない（実行中の job を途中で捨てない）
        let result = match uncommitted.take() {
            Some(pending) => engine.recommit(pending).await.map(Some),
            None => engine.run_once(worker_id).await,
        };
        let pause = match result {
            Ok(Some(Transition::Retried { delay, .. })) => Pause::Backoff(delay),
            Ok(Some(_)) => continue,
            Ok(None) => Pause::Idle,
            Err(EngineError::CommitFailed { pending, source }) => {
                error!(
                    worker.id = worker_id,
                    job.id = %pending.job().id,
                    error = %source,
                    "commit failed, holding the transition until the store recovers"
                );
                uncommitted = Some(*pending);
                Pause::Idle
            }
            Err(e) => {
                error!(worker.id = worker_id, error = %e, "worker iteration failed");
                Pause::Idle
            }
        };

        let stop = match pause {
            Pause::Idle => {
                trace!(worker.id = worker_id, "no pending jobs");
                suspend(settings.idle_interval, &mut shutdown_rx, Some(&wake)).await
            }
            Pause::Backoff(delay) => {
                debug!(worker.id = worker_id, delay_ms = delay.as_millis() as u64, "backing off");
                suspend(delay, &mut shutdown_rx, None).await
            }
        };
        if stop {
            break;
        }
    }

    // last chance before exiting
    if let Some(pending) = uncommitted
        && let Err(e) = engine.recommit(pending).await
    {
        warn!(
            worker.id = worker_id,
            error = %e,
            "stopping with an uncommitted transition; the job stays processing"
        );
    }
    info!(worker.id = worker_id, "worker stopped");
}

/// Sleep for `duration`, returning early on shutdown or (if given) a wake-up.
///
/// Returns true when the worker should stop.
async fn suspend(
    duration: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
    wake: Option<&Notify>,
) -> bool {
    let woken = async {
        match wake {
            Some(wake) => wake.notified().await,
            None => std::future::pending::<()>().await,
        }
    };

    let sender_gone = tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = woken => false,
        changed = shutdown_rx.changed() => changed.is_err(),
    };
    sender_gone || *shutdown_rx.borrow()
}
