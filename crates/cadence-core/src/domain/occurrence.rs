//! PaymentSchedule - 1 回の実行試行の記録
//!
//! pending で作られ、executed か failed に一度だけ遷移します。
//! その後は通常実行では変更されません（リトライは新しい行を作る）。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{LedgerEntryId, PaymentId, ScheduleId};

/// State of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    /// Inserted immediately before the external calls.
    Pending,
    /// The ledger record was created.
    Executed,
    /// Category check or ledger call failed; error recorded.
    Failed,
}

/// Reference to the ledger record created on success.
///
/// A sum type instead of two nullable columns: exactly one of
/// expense/income is set, matching the payment's kind by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LedgerRef {
    Expense(LedgerEntryId),
    Income(LedgerEntryId),
}

/// One execution attempt of a recurring payment on one execution date.
///
/// Holds only a back-reference to its payment; the payment owns the history
/// (cascade delete). A retry of a failed attempt creates a new row pointing
/// back via `retry_of`, preserving the failed row untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSchedule {
    pub schedule_id: ScheduleId,
    pub payment_id: PaymentId,

    /// The calendar date this attempt targets.
    pub execution_date: NaiveDate,

    pub state: AttemptState,

    /// Set on success, together with `executed_at`.
    pub ledger_ref: Option<LedgerRef>,
    pub executed_at: Option<DateTime<Utc>>,

    /// Set on failure; `ledger_ref` stays None.
    pub error_message: Option<String>,

    /// The failed attempt this row retries, if any.
    pub retry_of: Option<ScheduleId>,

    pub created_at: DateTime<Utc>,
}

impl PaymentSchedule {
    /// Create a pending attempt row.
    pub fn pending(
        schedule_id: ScheduleId,
        payment_id: PaymentId,
        execution_date: NaiveDate,
        retry_of: Option<ScheduleId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            schedule_id,
            payment_id,
            execution_date,
            state: AttemptState::Pending,
            ledger_ref: None,
            executed_at: None,
            error_message: None,
            retry_of,
            created_at: now,
        }
    }

    /// Transition pending -> executed.
    pub fn mark_executed(&mut self, ledger_ref: LedgerRef, now: DateTime<Utc>) {
        self.state = AttemptState::Executed;
        self.ledger_ref = Some(ledger_ref);
        self.executed_at = Some(now);
    }

    /// Transition pending -> failed.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.state = AttemptState::Failed;
        self.error_message = Some(error.into());
    }
}
