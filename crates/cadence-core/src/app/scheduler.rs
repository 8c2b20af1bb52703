//! Scheduler - 日次タイマーと手動トリガ
//!
//! プロセスにつき 1 つだけ作られ、stopped → running → stopped の
//! 状態を持ちます。running の間は 1 本の tokio タスクが毎日決まった
//! 時刻に `Executor::execute_pending(today)` を起動します。

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::app::executor::Executor;
use crate::config::SchedulerConfig;
use crate::ports::Clock;

/// Read-only view of the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    /// Next firing of the daily job, when running.
    pub next_run_at: Option<DateTime<Utc>>,
    pub jobs: Vec<JobView>,
}

/// One recurring job held by the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub name: &'static str,
    pub next_run_at: DateTime<Utc>,
}

/// Handle to the running daily job.
struct RunningJob {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Scheduler は Executor を日次で駆動する
///
/// `start`/`stop` は冪等セーフ: すでに目的の状態なら warn を出して
/// 何もしません。`execute_now` はタイマーと独立に即時実行します。
pub struct Scheduler {
    executor: Arc<Executor>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    job: Mutex<Option<RunningJob>>,
}

impl Scheduler {
    pub fn new(executor: Arc<Executor>, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            executor,
            clock,
            config,
            job: Mutex::new(None),
        }
    }

    /// Next firing strictly after `now`: today at the configured time, or
    /// tomorrow when that has already passed.
    fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today_fire = now
            .date_naive()
            .and_time(self.config.fire_at)
            .and_utc();
        if today_fire > now {
            today_fire
        } else {
            today_fire + ChronoDuration::days(1)
        }
    }

    /// Start the daily timer. No-op (with a warning) when already running.
    pub async fn start(self: &Arc<Self>) {
        let mut job = self.job.lock().await;
        if job.is_some() {
            tracing::warn!("scheduler already running, start ignored");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        // タスクは弱参照だけ持つ。stop() を経ずに Scheduler が drop されても
        // JoinHandle との循環参照でリークしない。
        let scheduler = Arc::downgrade(self);
        let join = tokio::spawn(async move {
            loop {
                let Some(strong) = scheduler.upgrade() else {
                    break;
                };
                let now = strong.clock.now();
                let fire_at = strong.next_fire_after(now);
                let wait = (fire_at - now)
                    .to_std()
                    .unwrap_or(std::time::Duration::ZERO);
                let executor = Arc::clone(&strong.executor);
                let clock = Arc::clone(&strong.clock);
                // sleep の間は強参照を保持しない
                drop(strong);

                // shutdown と競合させて眠る
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        // sender が落ちた（Scheduler ごと drop された）場合も終了
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(wait) => {
                        let today = clock.today();
                        match executor.execute_pending(today).await {
                            Ok(report) => tracing::info!(
                                %today,
                                executed = report.executed,
                                failed = report.failed,
                                "daily run finished"
                            ),
                            Err(e) => tracing::error!(%today, error = %e, "daily run failed"),
                        }
                    }
                }
            }
        });

        *job = Some(RunningJob { shutdown_tx, join });
        tracing::info!(fire_at = %self.config.fire_at, "scheduler started");
    }

    /// Stop the daily timer. No-op (with a warning) when already stopped.
    ///
    /// An in-progress run is not cancelled; it finishes over the due set it
    /// fetched at its start.
    pub async fn stop(&self) {
        let job = {
            let mut guard = self.job.lock().await;
            guard.take()
        };
        let Some(job) = job else {
            tracing::warn!("scheduler not running, stop ignored");
            return;
        };

        // receiver が先に落ちていても構わない
        let _ = job.shutdown_tx.send(true);
        let _ = job.join.await;
        tracing::info!("scheduler stopped");
    }

    /// Fire `execute_pending(today)` immediately, detached from the timer.
    ///
    /// Fire-and-forget: the spawned run neither resets the timer nor reports
    /// back here. The store's (payment, date) uniqueness keeps a concurrent
    /// timer run from double-materializing an occurrence.
    pub fn execute_now(&self) {
        let executor = Arc::clone(&self.executor);
        let today = self.clock.today();
        tokio::spawn(async move {
            match executor.execute_pending(today).await {
                Ok(report) => tracing::info!(
                    %today,
                    executed = report.executed,
                    failed = report.failed,
                    "manual run finished"
                ),
                Err(e) => tracing::error!(%today, error = %e, "manual run failed"),
            }
        });
    }

    /// Introspection for the operational status endpoint.
    pub async fn status(&self) -> SchedulerStatus {
        let running = self.job.lock().await.is_some();
        if !running {
            return SchedulerStatus {
                running: false,
                next_run_at: None,
                jobs: Vec::new(),
            };
        }

        let next = self.next_fire_after(self.clock.now());
        SchedulerStatus {
            running: true,
            next_run_at: Some(next),
            jobs: vec![JobView {
                name: "execute-pending-daily",
                next_run_at: next,
            }],
        }
    }
}
