//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（永続化、カテゴリサービス、台帳サービス、
//! 時刻、ID 生成）へのインターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - PaymentStore が正本（source of truth）
//! - 外部サービス呼び出しのリトライはポート実装側、executor は 1 試行 1 回

pub mod category;
pub mod clock;
pub mod id_generator;
pub mod ledger;
pub mod store;

// 主要な trait を再エクスポート
pub use self::category::{CategoryCheck, CategoryPort};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::ledger::{LedgerPort, NewLedgerEntry};
pub use self::store::{AttemptCounts, HistoryFilter, HistoryPage, Page, PaymentStore};
