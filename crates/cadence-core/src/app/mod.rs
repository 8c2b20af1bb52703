//! App - アプリケーション層
//!
//! ports を組み合わせてエンジンのロジックを実装します。
//!
//! # 主要コンポーネント
//! - **EngineBuilder**: ポートの注入と Engine の組み立て
//! - **Executor**: due なルールの実行（begin→attempt→finish→advance）
//! - **Scheduler**: 日次タイマーと手動トリガ
//! - **PaymentService**: ライフサイクル操作とレポート

pub mod builder;
pub mod executor;
pub mod scheduler;
pub mod service;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, Engine, EngineBuilder};
pub use self::executor::{Executor, RunReport};
pub use self::scheduler::{Scheduler, SchedulerStatus};
pub use self::service::{NewPayment, PaymentService, PaymentStatistics, PaymentUpdate};
