//! PaymentStore port - ルールと実行履歴の正本（source of truth）
//!
//! # 設計原則
//! - 失敗した試行も必ず永続化される（failed 行のコミットが失敗経路の一部）
//! - `begin_attempt` は (payment_id, execution_date) につき pending/executed
//!   行を 1 行までに制限する（daily timer と execute_now の競合対策）

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AttemptState, CadenceError, PaymentId, PaymentSchedule, RecurringPayment, ScheduleId, UserId,
};

/// Filter for occurrence-history queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    /// Only attempts in this state.
    pub state: Option<AttemptState>,
    /// Only attempts with execution_date >= from.
    pub from: Option<NaiveDate>,
    /// Only attempts with execution_date <= to.
    pub to: Option<NaiveDate>,
}

/// Offset pagination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// One page of attempt history, newest execution_date first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub items: Vec<PaymentSchedule>,
    /// Total matching rows before pagination.
    pub total: usize,
}

/// Executed/failed attempt counts for the statistics window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounts {
    pub executed: usize,
    pub failed: usize,
}

/// PaymentStore は RecurringPayment と PaymentSchedule の永続化ポート
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert_payment(&self, payment: RecurringPayment) -> Result<(), CadenceError>;

    async fn update_payment(&self, payment: &RecurringPayment) -> Result<(), CadenceError>;

    async fn get_payment(&self, id: PaymentId) -> Result<Option<RecurringPayment>, CadenceError>;

    /// Delete the payment and cascade to its attempt history.
    async fn delete_payment(&self, id: PaymentId) -> Result<(), CadenceError>;

    async fn payments_for_user(&self, user: UserId) -> Result<Vec<RecurringPayment>, CadenceError>;

    /// Active payments with next_execution <= as_of whose end_date (if any)
    /// has not passed as_of.
    async fn due_payments(&self, as_of: NaiveDate) -> Result<Vec<RecurringPayment>, CadenceError>;

    /// Insert a pending attempt row.
    ///
    /// Rejects with [`CadenceError::DuplicateAttempt`] when a pending or
    /// executed row already exists for the same (payment_id, execution_date).
    /// Failed rows do not block: retrying a failure creates a new row.
    async fn begin_attempt(&self, schedule: PaymentSchedule) -> Result<(), CadenceError>;

    /// Persist the terminal state (executed or failed) of an attempt row.
    async fn finish_attempt(&self, schedule: &PaymentSchedule) -> Result<(), CadenceError>;

    async fn get_schedule(&self, id: ScheduleId)
    -> Result<Option<PaymentSchedule>, CadenceError>;

    /// Attempt history for one payment, filtered and paginated, newest
    /// execution_date first.
    async fn history(
        &self,
        payment: PaymentId,
        filter: &HistoryFilter,
        page: Page,
    ) -> Result<HistoryPage, CadenceError>;

    /// Executed/failed counts across all of a user's payments with
    /// execution_date >= since.
    async fn attempt_counts(
        &self,
        user: UserId,
        since: NaiveDate,
    ) -> Result<AttemptCounts, CadenceError>;
}
