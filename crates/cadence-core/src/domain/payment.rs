//! RecurringPayment - 繰り返しルールの本体
//!
//! 状態遷移はフィールドを直接書き換えず、メソッド経由で行います。

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::CadenceError;
use super::ids::{CategoryId, PaymentId, UserId};
use super::schedule::ScheduleRule;

/// Whether an occurrence materializes as an expense or an income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentKind {
    Expense,
    Income,
}

/// Payment status.
///
/// State transitions:
/// - Active -> Paused -> Active (pause/resume, only this pair)
/// - Active | Paused -> Cancelled
/// - Active -> Completed (executor, when next occurrence passes end_date)
/// - Completed / Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl PaymentStatus {
    /// Is this a terminal status (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Cancelled)
    }
}

/// A recurrence rule: the declarative definition of a repeating obligation.
///
/// Owns its PaymentSchedule history exclusively (deleting a payment cascades
/// to its attempts). Mutated by the executor after each successful attempt
/// (last_executed, next_execution, status) and by the lifecycle service
/// (pause/resume/edit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringPayment {
    pub payment_id: PaymentId,
    pub user_id: UserId,

    pub name: String,
    pub description: Option<String>,

    /// Fixed-point amount, always > 0 (validated at creation).
    pub amount: Decimal,
    /// ISO 4217 currency code. No conversion happens here.
    pub currency: String,
    /// Reference into the external category service.
    pub category_id: CategoryId,
    pub kind: PaymentKind,

    pub rule: ScheduleRule,

    pub start_date: NaiveDate,
    /// Strictly after start_date when set.
    pub end_date: Option<NaiveDate>,

    pub status: PaymentStatus,
    pub last_executed: Option<DateTime<Utc>>,
    /// Always >= start_date. Once status is Completed, never exceeds
    /// end_date.
    pub next_execution: NaiveDate,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringPayment {
    /// Pause. Only Active payments may pause.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), CadenceError> {
        if self.status != PaymentStatus::Active {
            return Err(CadenceError::InvalidTransition {
                from: self.status,
                to: PaymentStatus::Paused,
            });
        }
        self.status = PaymentStatus::Paused;
        self.updated_at = now;
        Ok(())
    }

    /// Resume. Only Paused payments may resume.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), CadenceError> {
        if self.status != PaymentStatus::Paused {
            return Err(CadenceError::InvalidTransition {
                from: self.status,
                to: PaymentStatus::Active,
            });
        }
        self.status = PaymentStatus::Active;
        self.updated_at = now;
        Ok(())
    }

    /// Cancel. Allowed from Active or Paused; terminal afterwards.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), CadenceError> {
        if self.status.is_terminal() {
            return Err(CadenceError::InvalidTransition {
                from: self.status,
                to: PaymentStatus::Cancelled,
            });
        }
        self.status = PaymentStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Record a successful execution.
    ///
    /// `executed_on` is the occurrence date that was just materialized and
    /// `next` the occurrence computed from the rule. When `next` would pass
    /// end_date, the payment completes and next_execution stays at the final
    /// executed date so it never exceeds end_date.
    pub fn record_execution(
        &mut self,
        now: DateTime<Utc>,
        executed_on: NaiveDate,
        next: NaiveDate,
    ) {
        self.last_executed = Some(now);
        match self.end_date {
            Some(end) if next > end => {
                self.status = PaymentStatus::Completed;
                self.next_execution = executed_on;
            }
            _ => {
                self.next_execution = next;
            }
        }
        self.updated_at = now;
    }
}
