//! cadence-core
//!
//! Core building blocks for the Cadence recurring-payment engine.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, schedule, payment, occurrence, recurrence, errors）
//! - **ports**: 抽象化レイヤー（PaymentStore, CategoryPort, LedgerPort, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, executor, scheduler, service）
//! - **impls**: 実装（InMemoryStore, HTTP クライアント, retry, テスト用スタブ）
//! - **config**: エンジン設定
//!
//! # 設計原則
//! - 日付計算（domain::recurrence）は純粋関数。I/O は app 層だけが行う
//! - PaymentStore が正本。外部台帳への書き込みは PaymentSchedule 行で追跡する
//! - executor は 1 試行 1 回。HTTP リトライはポート実装側に閉じる

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
