//! CategoryPort - 外部カテゴリサービスへの照会
//!
//! 実行前にルールの category_id が存在し、所有者のものかを確認します。
//! NotFound / Forbidden はその試行の失敗として記録されます。

use async_trait::async_trait;

use crate::domain::{CadenceError, CategoryId, UserId};

/// Outcome of a category existence/ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryCheck {
    /// The category exists and belongs to the user.
    Found,
    /// No such category.
    NotFound,
    /// The category belongs to someone else.
    Forbidden,
}

/// CategoryPort はカテゴリの存在・所有チェック
///
/// Errors are reserved for transport-level failures; a definitive
/// not-found/forbidden answer is a normal `Ok` value.
#[async_trait]
pub trait CategoryPort: Send + Sync {
    async fn check(
        &self,
        category: CategoryId,
        user: UserId,
    ) -> Result<CategoryCheck, CadenceError>;
}
