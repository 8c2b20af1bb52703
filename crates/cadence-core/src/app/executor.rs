//! Executor - 期日になった occurrence の実体化
//!
//! # フロー（ルールごとに独立）
//! 1. pending の PaymentSchedule 行を挿入（重複はここで弾かれる）
//! 2. CategoryPort でカテゴリの存在・所有チェック
//! 3. LedgerPort で expense/income を作成
//! 4. 成功: 行を executed に、ルールの last_executed / next_execution を更新
//! 5. 失敗: 行を failed に、ルールは触らない（次回の実行で再試行される）
//!
//! 1 つのルールの失敗は他のルールの処理を止めません。

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::recurrence;
use crate::domain::{
    CadenceError, LedgerRef, PaymentKind, PaymentSchedule, PaymentStatus, RecurringPayment,
    ScheduleId,
};
use crate::ports::{
    CategoryCheck, CategoryPort, Clock, IdGenerator, LedgerPort, NewLedgerEntry, PaymentStore,
};

/// Result of one `execute_pending` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Rules whose occurrence was materialized this run.
    pub executed: usize,
    /// Rules whose attempt failed (recorded on their schedule row).
    pub failed: usize,
    /// Rules skipped because an attempt for that date already existed.
    pub skipped: usize,
}

/// Result of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Executed,
    Failed,
    /// A pending/executed row for this (payment, date) already exists.
    Skipped,
}

/// Executor は期日のルールを台帳レコードへ実体化する
///
/// 外部サービス呼び出しは試行ごとに 1 回だけ。バックオフ付きリトライは
/// ポート実装側（HTTP クライアント）の責務です。
pub struct Executor {
    store: Arc<dyn PaymentStore>,
    categories: Arc<dyn CategoryPort>,
    ledger: Arc<dyn LedgerPort>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl Executor {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        categories: Arc<dyn CategoryPort>,
        ledger: Arc<dyn LedgerPort>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            categories,
            ledger,
            clock,
            ids,
        }
    }

    /// Materialize every rule due on/before `as_of`.
    ///
    /// Rules are processed sequentially; one rule's failure is recorded on
    /// its own schedule row and never aborts the run. Returns the counts for
    /// this run (`executed` is the original "executedCount").
    pub async fn execute_pending(&self, as_of: NaiveDate) -> Result<RunReport, CadenceError> {
        let due = self.store.due_payments(as_of).await?;
        tracing::info!(%as_of, due = due.len(), "executing pending payments");

        let mut report = RunReport::default();
        for payment in due {
            match self.run_attempt(&payment, as_of, None).await {
                Ok(AttemptOutcome::Executed) => report.executed += 1,
                Ok(AttemptOutcome::Failed) => report.failed += 1,
                Ok(AttemptOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    // 失敗の記録すらできなかったケース。次の run に任せる。
                    report.failed += 1;
                    tracing::error!(
                        payment_id = %payment.payment_id,
                        error = %e,
                        "attempt could not be recorded"
                    );
                }
            }
        }

        tracing::info!(
            %as_of,
            executed = report.executed,
            failed = report.failed,
            skipped = report.skipped,
            "run finished"
        );
        Ok(report)
    }

    /// Rules due on/before `as_of`, for the operational "list pending" query.
    pub async fn due_payments(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<RecurringPayment>, CadenceError> {
        self.store.due_payments(as_of).await
    }

    /// Re-run a failed attempt.
    ///
    /// Creates a new schedule row for the same execution_date, linked to the
    /// failed one via `retry_of`; the failed row is preserved as-is. Only
    /// failed rows of still-active payments can be retried.
    pub async fn retry_failed(
        &self,
        schedule_id: ScheduleId,
    ) -> Result<AttemptOutcome, CadenceError> {
        let schedule = self
            .store
            .get_schedule(schedule_id)
            .await?
            .ok_or(CadenceError::ScheduleNotFound(schedule_id))?;
        if schedule.state != crate::domain::AttemptState::Failed {
            return Err(CadenceError::Execution(format!(
                "only failed attempts can be retried, {} is {:?}",
                schedule_id, schedule.state
            )));
        }

        let payment = self
            .store
            .get_payment(schedule.payment_id)
            .await?
            .ok_or(CadenceError::PaymentNotFound(schedule.payment_id))?;
        if payment.status != PaymentStatus::Active {
            return Err(CadenceError::Execution(format!(
                "payment {} is {:?}, not active",
                payment.payment_id, payment.status
            )));
        }

        self.run_attempt(&payment, schedule.execution_date, Some(schedule_id))
            .await
    }

    /// One isolated attempt for one rule (steps 1a-1e).
    async fn run_attempt(
        &self,
        payment: &RecurringPayment,
        execution_date: NaiveDate,
        retry_of: Option<ScheduleId>,
    ) -> Result<AttemptOutcome, CadenceError> {
        let mut schedule = PaymentSchedule::pending(
            self.ids.schedule_id(),
            payment.payment_id,
            execution_date,
            retry_of,
            self.clock.now(),
        );

        // pending 行を先にコミットする。クラッシュしても試行の痕跡が残る。
        match self.store.begin_attempt(schedule.clone()).await {
            Ok(()) => {}
            Err(CadenceError::DuplicateAttempt { .. }) => {
                tracing::debug!(
                    payment_id = %payment.payment_id,
                    %execution_date,
                    "attempt already exists, skipping"
                );
                return Ok(AttemptOutcome::Skipped);
            }
            Err(e) => return Err(e),
        }

        match self.attempt(payment, execution_date).await {
            Ok(ledger_ref) => {
                let now = self.clock.now();
                schedule.mark_executed(ledger_ref, now);
                self.store.finish_attempt(&schedule).await?;

                // next occurrence is computed from the new last_executed
                let next = recurrence::next_occurrence_after(&payment.rule, now.date_naive());
                let mut updated = payment.clone();
                updated.record_execution(now, execution_date, next);
                self.store.update_payment(&updated).await?;

                tracing::info!(
                    payment_id = %payment.payment_id,
                    schedule_id = %schedule.schedule_id,
                    %execution_date,
                    status = ?updated.status,
                    "occurrence executed"
                );
                Ok(AttemptOutcome::Executed)
            }
            Err(error) => {
                schedule.mark_failed(error.to_string());
                // 失敗経路のコミット。これが通らないと履歴から消えるので伝播する。
                self.store.finish_attempt(&schedule).await?;

                tracing::warn!(
                    payment_id = %payment.payment_id,
                    schedule_id = %schedule.schedule_id,
                    %execution_date,
                    error = %error,
                    "occurrence failed"
                );
                Ok(AttemptOutcome::Failed)
            }
        }
    }

    /// Category check + ledger call. Any error here fails the attempt only.
    async fn attempt(
        &self,
        payment: &RecurringPayment,
        execution_date: NaiveDate,
    ) -> Result<LedgerRef, CadenceError> {
        match self
            .categories
            .check(payment.category_id, payment.user_id)
            .await?
        {
            CategoryCheck::Found => {}
            CategoryCheck::NotFound => {
                return Err(CadenceError::Execution(format!(
                    "category {} not found",
                    payment.category_id
                )));
            }
            CategoryCheck::Forbidden => {
                return Err(CadenceError::Execution(format!(
                    "category {} does not belong to {}",
                    payment.category_id, payment.user_id
                )));
            }
        }

        let entry = NewLedgerEntry {
            user_id: payment.user_id,
            category_id: payment.category_id,
            amount: payment.amount,
            currency: payment.currency.clone(),
            description: payment
                .description
                .clone()
                .unwrap_or_else(|| payment.name.clone()),
            date: execution_date,
        };

        match payment.kind {
            PaymentKind::Expense => {
                let id = self.ledger.create_expense(&entry).await?;
                Ok(LedgerRef::Expense(id))
            }
            PaymentKind::Income => {
                let id = self.ledger.create_income(&entry).await?;
                Ok(LedgerRef::Income(id))
            }
        }
    }
}
