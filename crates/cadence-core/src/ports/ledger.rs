//! LedgerPort - 外部台帳サービス（支出・収入の作成）
//!
//! executor は 1 回の試行につき 1 回だけ呼びます。タイムアウトと
//! バックオフ付きリトライはこのポートの実装側の責務です。

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{CadenceError, CategoryId, LedgerEntryId, UserId};

/// Payload for creating one ledger record (expense or income).
#[derive(Debug, Clone, Serialize)]
pub struct NewLedgerEntry {
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    /// The occurrence's execution date, not the wall-clock date of the call.
    pub date: NaiveDate,
}

/// LedgerPort は台帳レコードの作成
///
/// Exactly one of the two methods is used per attempt, matching the
/// payment's kind.
#[async_trait]
pub trait LedgerPort: Send + Sync {
    async fn create_expense(&self, entry: &NewLedgerEntry) -> Result<LedgerEntryId, CadenceError>;

    async fn create_income(&self, entry: &NewLedgerEntry) -> Result<LedgerEntryId, CadenceError>;
}
