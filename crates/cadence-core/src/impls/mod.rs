//! Implementations - ポートの実装
//!
//! - **memory**: InMemoryStore（開発・テスト用の正本）
//! - **http_category / http_ledger**: reqwest ベースの外部サービスクライアント
//! - **retry**: HTTP クライアント用のバックオフポリシー
//! - **stubs**: テスト・デモ用のダブル

pub mod http_category;
pub mod http_ledger;
pub mod memory;
pub mod retry;
pub mod stubs;

#[cfg(test)]
pub(crate) mod test_http;

pub use self::http_category::HttpCategoryClient;
pub use self::http_ledger::HttpLedgerClient;
pub use self::memory::InMemoryStore;
pub use self::retry::RetryPolicy;
pub use self::stubs::{RecordingLedger, StaticCategories};
