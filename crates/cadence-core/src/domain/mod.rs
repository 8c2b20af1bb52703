//! Domain model (IDs, rules, attempt records, recurrence arithmetic).
//!
//! - **ids**: 強く型付けされた ULID ベースの ID
//! - **schedule**: ScheduleRule（tagged union の繰り返しルール）
//! - **payment**: RecurringPayment と状態遷移
//! - **occurrence**: PaymentSchedule（1 回の実行試行）
//! - **recurrence**: 純粋な日付計算（I/O なし）
//! - **errors**: エラー型と分類

pub mod errors;
pub mod ids;
pub mod occurrence;
pub mod payment;
pub mod recurrence;
pub mod schedule;

pub use errors::CadenceError;
pub use ids::{CategoryId, LedgerEntryId, PaymentId, ScheduleId, UserId};
pub use occurrence::{AttemptState, LedgerRef, PaymentSchedule};
pub use payment::{PaymentKind, PaymentStatus, RecurringPayment};
pub use schedule::ScheduleRule;
