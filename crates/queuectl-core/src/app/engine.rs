//! LifecycleEngine - job のライフサイクル状態遷移
//!
//! # フロー
//! 1. JobStore::claim_next_pending() で Pending -> Processing
//! 2. CommandExecutor::run() でコマンド実行 → ExecOutcome
//! 3. Decider::decide() で Decision（Complete / Retry / MarkDead）
//! 4. Job に遷移を適用して JobStore::commit()
//! 5. EventSink にイベントを通知
//!
//! state を変更するのはこの流れだけ。バックオフ待ちは engine ではなく
//! worker loop 側で行う（shutdown と競合させるため）。

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{Decider, Decision, Job, JobEvent, QueueError};
use crate::ports::{Clock, CommandExecutor, EventSink, JobStore};

/// commit が storage 系エラーで失敗したときの再試行回数（1 回の呼び出しあたり）
const COMMIT_ATTEMPTS: u32 = 3;
const COMMIT_RETRY_PAUSE: Duration = Duration::from_millis(100);

/// 1 回の実行で起きた遷移
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Processing -> Completed
    Completed(Job),
    /// Processing -> Pending。claim した worker は `delay` 待ってから次の poll
    Retried { job: Job, delay: Duration },
    /// Processing -> Dead（DLQ へ移動済み）
    DeadLettered(Job),
}

impl Transition {
    pub fn job(&self) -> &Job {
        match self {
            Transition::Completed(job)
            | Transition::Retried { job, .. }
            | Transition::DeadLettered(job) => job,
        }
    }
}

/// 決定済みだが commit できていない遷移。
///
/// worker はこれを持ち続け、新しい job を claim する前に `LifecycleEngine::recommit` で
/// 書き戻す（job を Processing のまま放置しない）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uncommitted {
    transition: Transition,
    event: JobEvent,
}

impl Uncommitted {
    pub fn job(&self) -> &Job {
        self.transition.job()
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// claim failed, or the store rejected the commit for good
    #[error(transparent)]
    Store(#[from] QueueError),

    /// The transition was decided but could not be stored; retry it with `recommit`.
    #[error("commit of job {} failed: {source}", .pending.job().id)]
    CommitFailed {
        pending: Box<Uncommitted>,
        #[source]
        source: QueueError,
    },
}

pub struct LifecycleEngine {
    store: Arc<dyn JobStore>,
    executor: Arc<dyn CommandExecutor>,
    decider: Arc<dyn Decider>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn JobStore>,
        executor: Arc<dyn CommandExecutor>,
        decider: Arc<dyn Decider>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            executor,
            decider,
            events,
            clock,
        }
    }

    /// Claim the next pending job and drive it through one attempt.
    ///
    /// Returns `Ok(None)` when nothing is pending.
    pub async fn run_once(&self, worker: usize) -> Result<Option<Transition>, EngineError> {
        let Some(job) = self.store.claim_next_pending().await? else {
            return Ok(None);
        };
        self.events.emit(&JobEvent::JobClaimed { id: job.id, worker });
        self.process(job).await.map(Some)
    }

    /// Execute a claimed (Processing) job and commit exactly one transition.
    pub async fn process(&self, mut job: Job) -> Result<Transition, EngineError> {
        debug!(job.id = %job.id, command = %job.command, attempts = job.attempts, "executing job");
        let outcome = self.executor.run(&job.command).await;
        let decision = self.decider.decide(&job, &outcome);
        let reason = outcome.reason().unwrap_or_default().to_string();
        let now = self.clock.now();

        let (transition, event) = match decision {
            Decision::Complete => {
                job.mark_completed(now);
                let event = JobEvent::JobCompleted { id: job.id };
                (Transition::Completed(job), event)
            }
            Decision::Retry { delay, .. } => {
                job.schedule_retry(now);
                let event = JobEvent::JobRetrying {
                    id: job.id,
                    attempt: job.attempts,
                    delay,
                    reason,
                };
                (Transition::Retried { job, delay }, event)
            }
            Decision::MarkDead { .. } => {
                job.mark_dead(now);
                let event = JobEvent::JobDeadLettered {
                    id: job.id,
                    attempts: job.attempts,
                    reason,
                };
                (Transition::DeadLettered(job), event)
            }
        };

        self.recommit(Uncommitted { transition, event }).await
    }

    /// Store a decided transition and emit its event.
    ///
    /// Storage errors hand the transition back in `EngineError::CommitFailed`.
    pub async fn recommit(&self, pending: Uncommitted) -> Result<Transition, EngineError> {
        let job = pending.job();
        let mut attempt = 1;
        loop {
            match self.store.commit(job.clone()).await {
                Ok(()) => break,
                Err(e) if e.is_storage() && attempt < COMMIT_ATTEMPTS => {
                    warn!(job.id = %job.id, attempt, error = %e, "commit failed, retrying");
                    tokio::time::sleep(COMMIT_RETRY_PAUSE).await;
                    attempt += 1;
                }
                Err(e) if e.is_storage() => {
                    return Err(EngineError::CommitFailed {
                        pending: Box::new(pending),
                        source: e,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.events.emit(&pending.event);
        Ok(pending.transition)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{DefaultDecider, ExecOutcome, JobState};
    use crate::impls::MemoryEventSink;
    use crate::ports::SystemClock;
    use crate::queue::{BackoffPolicy, InMemoryJobStore};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn disk_full() -> QueueError {
        QueueError::storage("/data/jobs.json", std::io::Error::other("disk full"))
    }

    /// In-memory store whose first N claims / commits fail.
    pub(crate) struct FlakyStore {
        inner: InMemoryJobStore,
        failing_claims: AtomicUsize,
        failing_commits: AtomicUsize,
        error: fn() -> QueueError,
        pub(crate) commit_calls: AtomicUsize,
    }

    impl FlakyStore {
        pub(crate) fn new(max_retries: u32) -> Self {
            Self {
                inner: InMemoryJobStore::new(max_retries),
                failing_claims: AtomicUsize::new(0),
                failing_commits: AtomicUsize::new(0),
                error: disk_full,
                commit_calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing_claims(self, n: usize) -> Self {
            self.failing_claims.store(n, Ordering::SeqCst);
            self
        }

        pub(crate) fn failing_commits(self, n: usize) -> Self {
            self.failing_commits.store(n, Ordering::SeqCst);
            self
        }

        pub(crate) fn failing_with(mut self, error: fn() -> QueueError) -> Self {
            self.error = error;
            self
        }

        fn take_failure(counter: &AtomicUsize) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    #[async_trait]
    impl JobStore for FlakyStore {
        async fn enqueue(&self, command: &str) -> Result<Job, QueueError> {
            self.inner.enqueue(command).await
        }

        async fn claim_next_pending(&self) -> Result<Option<Job>, QueueError> {
            if Self::take_failure(&self.failing_claims) {
                return Err((self.error)());
            }
            self.inner.claim_next_pending().await
        }

        async fn commit(&self, job: Job) -> Result<(), QueueError> {
            self.commit_calls.fetch_add(1, Ordering::SeqCst);
            if Self::take_failure(&self.failing_commits) {
                return Err((self.error)());
            }
            self.inner.commit(job).await
        }

        async fn list_active(&self) -> Result<Vec<Job>, QueueError> {
            self.inner.list_active().await
        }

        async fn list_dead(&self) -> Result<Vec<Job>, QueueError> {
            self.inner.list_dead().await
        }
    }

    /// Plays back scripted outcomes, then repeats the last one.
    pub(crate) struct ScriptedExecutor {
        script: Mutex<VecDeque<bool>>,
        last: bool,
        pub(crate) runs: AtomicUsize,
    }

    impl ScriptedExecutor {
        pub(crate) fn new(script: &[bool]) -> Self {
            Self {
                script: Mutex::new(script.iter().copied().collect()),
                last: script.last().copied().unwrap_or(true),
                runs: AtomicUsize::new(0),
            }
        }

        pub(crate) fn always_fail() -> Self {
            Self::new(&[false])
        }

        pub(crate) fn always_succeed() -> Self {
            Self::new(&[true])
        }
    }

    #[async_trait]
    impl CommandExecutor for ScriptedExecutor {
        async fn run(&self, _command: &str) -> ExecOutcome {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let ok = self.script.lock().unwrap().pop_front().unwrap_or(self.last);
            if ok {
                ExecOutcome::success("ok")
            } else {
                ExecOutcome::from_exit(Some(1), String::new(), "boom".into())
            }
        }
    }

    fn engine(
        store: Arc<dyn JobStore>,
        executor: Arc<ScriptedExecutor>,
        events: Arc<MemoryEventSink>,
    ) -> LifecycleEngine {
        let backoff = BackoffPolicy::new(2, Duration::from_millis(1));
        LifecycleEngine::new(
            store,
            executor,
            Arc::new(DefaultDecider::new(backoff)),
            events,
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn nothing_pending_returns_none() {
        let store = Arc::new(InMemoryJobStore::new(3));
        let events = Arc::new(MemoryEventSink::new());
        let engine = engine(store, Arc::new(ScriptedExecutor::always_succeed()), events.clone());

        assert!(engine.run_once(0).await.unwrap().is_none());
        assert!(events.events().is_empty());
    }

    #[tokio::test]
    async fn success_completes_and_stays_active() {
        let store = Arc::new(InMemoryJobStore::new(3));
        let events = Arc::new(MemoryEventSink::new());
        let engine = engine(store.clone(), Arc::new(ScriptedExecutor::always_succeed()), events.clone());
        let job = store.enqueue("echo hi").await.unwrap();

        let transition = engine.run_once(7).await.unwrap().unwrap();
        assert!(matches!(transition, Transition::Completed(_)));

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].state, JobState::Completed);
        assert_eq!(active[0].attempts, 0);
        assert_eq!(
            events.events(),
            vec![
                JobEvent::JobClaimed { id: job.id, worker: 7 },
                JobEvent::JobCompleted { id: job.id },
            ]
        );
    }

    #[tokio::test]
    async fn failure_with_budget_left_goes_back_to_pending() {
        let store = Arc::new(InMemoryJobStore::new(2));
        let events = Arc::new(MemoryEventSink::new());
        let engine = engine(store.clone(), Arc::new(ScriptedExecutor::always_fail()), events.clone());
        store.enqueue("false").await.unwrap();

        let transition = engine.run_once(0).await.unwrap().unwrap();
        match transition {
            Transition::Retried { job, delay } => {
                assert_eq!(job.attempts, 1);
                assert_eq!(job.state, JobState::Pending);
                assert_eq!(delay, Duration::from_millis(2));
            }
            other => panic!("expected retry, got {other:?}"),
        }

        let active = store.list_active().await.unwrap();
        assert_eq!(active[0].state, JobState::Pending);
        assert_eq!(active[0].attempts, 1);
        assert!(matches!(
            events.events().last(),
            Some(JobEvent::JobRetrying { attempt: 1, reason, .. }) if reason == "boom"
        ));
    }

    #[tokio::test]
    async fn always_failing_job_is_dead_after_max_retries_plus_one() {
        let store = Arc::new(InMemoryJobStore::new(2));
        let events = Arc::new(MemoryEventSink::new());
        let executor = Arc::new(ScriptedExecutor::always_fail());
        let engine = engine(store.clone(), executor.clone(), events.clone());
        let job = store.enqueue("false").await.unwrap();

        let mut seen = Vec::new();
        while let Some(transition) = engine.run_once(0).await.unwrap() {
            let current = transition.job();
            assert!(current.attempts <= current.max_attempts());
            seen.push((current.state, current.attempts));
        }

        assert_eq!(
            seen,
            vec![
                (JobState::Pending, 1),
                (JobState::Pending, 2),
                (JobState::Dead, 3),
            ]
        );
        assert_eq!(executor.runs.load(Ordering::SeqCst), 3);
        assert!(store.list_active().await.unwrap().is_empty());
        let dead = store.list_dead().await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].id, job.id);
        assert_eq!(dead[0].command, "false");
        assert_eq!(dead[0].attempts, 3);
        assert!(matches!(
            events.events().last(),
            Some(JobEvent::JobDeadLettered { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn flaky_job_recovers_and_keeps_its_attempt_count() {
        let store = Arc::new(InMemoryJobStore::new(3));
        let events = Arc::new(MemoryEventSink::new());
        let executor = Arc::new(ScriptedExecutor::new(&[false, false, true]));
        let engine = engine(store.clone(), executor, events);
        store.enqueue("flaky").await.unwrap();

        while engine.run_once(0).await.unwrap().is_some() {}

        let active = store.list_active().await.unwrap();
        assert_eq!(active[0].state, JobState::Completed);
        assert_eq!(active[0].attempts, 2);
    }

    #[tokio::test]
    async fn transient_commit_failures_are_retried() {
        let store = Arc::new(FlakyStore::new(3).failing_commits(2));
        let events = Arc::new(MemoryEventSink::new());
        let engine = engine(store.clone(), Arc::new(ScriptedExecutor::always_succeed()), events.clone());
        store.enqueue("echo hi").await.unwrap();

        let transition = engine.run_once(0).await.unwrap().unwrap();

        assert!(matches!(transition, Transition::Completed(_)));
        assert_eq!(store.commit_calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.list_active().await.unwrap()[0].state, JobState::Completed);
    }

    #[tokio::test]
    async fn exhausted_commit_hands_the_transition_back() {
        let store = Arc::new(FlakyStore::new(3).failing_commits(4));
        let events = Arc::new(MemoryEventSink::new());
        let executor = Arc::new(ScriptedExecutor::always_succeed());
        let engine = engine(store.clone(), executor.clone(), events.clone());
        let job = store.enqueue("echo hi").await.unwrap();

        let pending = match engine.run_once(0).await {
            Err(EngineError::CommitFailed { pending, source }) => {
                assert!(source.is_storage());
                pending
            }
            other => panic!("expected a failed commit, got {other:?}"),
        };
        assert_eq!(pending.job().id, job.id);
        assert_eq!(pending.job().state, JobState::Completed);
        assert_eq!(store.list_active().await.unwrap()[0].state, JobState::Processing);
        assert!(!events.events().contains(&JobEvent::JobCompleted { id: job.id }));

        // one more storage failure, then the store recovers
        let transition = engine.recommit(*pending).await.unwrap();
        assert!(matches!(transition, Transition::Completed(_)));
        assert_eq!(store.list_active().await.unwrap()[0].state, JobState::Completed);
        assert_eq!(events.events().last(), Some(&JobEvent::JobCompleted { id: job.id }));
        assert_eq!(executor.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_storage_commit_errors_are_not_retried() {
        let store = Arc::new(
            FlakyStore::new(3)
                .failing_commits(1)
                .failing_with(|| QueueError::Config("rejected".into())),
        );
        let events = Arc::new(MemoryEventSink::new());
        let engine = engine(store.clone(), Arc::new(ScriptedExecutor::always_succeed()), events);
        store.enqueue("echo hi").await.unwrap();

        let err = engine.run_once(0).await.unwrap_err();

        assert!(matches!(err, EngineError::Store(QueueError::Config(_))));
        assert_eq!(store.commit_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn claim_failure_surfaces_as_store_error() {
        let store = Arc::new(FlakyStore::new(3).failing_claims(1));
        let events = Arc::new(MemoryEventSink::new());
        let engine = engine(store.clone(), Arc::new(ScriptedExecutor::always_succeed()), events);
        store.enqueue("echo hi").await.unwrap();

        assert!(matches!(engine.run_once(0).await, Err(EngineError::Store(_))));
        assert!(matches!(engine.run_once(0).await, Ok(Some(Transition::Completed(_)))));
    }
}
