//! Errors - エラー型と分類
//!
//! 1 件の実行失敗はプロセスレベルのエラーではなく、その PaymentSchedule 行に
//! 記録されて処理は次のルールへ続きます。呼び出し元へ同期的に返るのは
//! 作成・更新時のバリデーションエラーだけです。

use chrono::NaiveDate;
use thiserror::Error;

use super::ids::{PaymentId, ScheduleId};
use super::payment::PaymentStatus;

#[derive(Debug, Error)]
pub enum CadenceError {
    /// The recurrence rule does not exist (or is not visible to the caller).
    #[error("recurring payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// The attempt row does not exist.
    #[error("payment schedule not found: {0}")]
    ScheduleNotFound(ScheduleId),

    /// Schedule config rejected at create/update time (range or shape).
    #[error("invalid schedule config: {0}")]
    InvalidSchedule(String),

    /// Amount/window validation failed at create/update time.
    #[error("invalid payment: {0}")]
    InvalidPayment(String),

    /// Status transition not allowed (e.g. resume on a cancelled payment).
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// A category/ledger call failed or timed out after bounded retries.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// A pending or executed attempt already exists for this payment/date.
    /// Guards the daily-timer vs execute-now race.
    #[error("attempt already exists for {payment_id} on {date}")]
    DuplicateAttempt {
        payment_id: PaymentId,
        date: NaiveDate,
    },

    /// Persistence failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Catch-all for any other per-attempt failure.
    #[error("execution error: {0}")]
    Execution(String),
}

impl CadenceError {
    /// Not-found errors map to 404-style responses upstream.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PaymentNotFound(_) | Self::ScheduleNotFound(_)
        )
    }

    /// Validation errors are surfaced synchronously to the caller.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidSchedule(_) | Self::InvalidPayment(_) | Self::InvalidTransition { .. }
        )
    }
}
