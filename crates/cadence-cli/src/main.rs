use std::sync::Arc;

use chrono::Utc;
use rust_decimal_macros::dec;
use tokio::time::{Duration, sleep};
use tracing_subscriber::EnvFilter;
use ulid::Ulid;

use cadence_core::app::{EngineBuilder, NewPayment};
use cadence_core::domain::{CategoryId, PaymentKind, ScheduleRule, UserId};
use cadence_core::impls::stubs::{RecordingLedger, StaticCategories};
use cadence_core::impls::InMemoryStore;
use cadence_core::ports::{HistoryFilter, Page};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // (A) インメモリのポートで Engine を組み立てる
    //     本番では HttpCategoryClient / HttpLedgerClient と DB ストアを差し込む
    let ledger = Arc::new(RecordingLedger::new());
    let engine = EngineBuilder::new()
        .with_store(Arc::new(InMemoryStore::new()))
        .with_categories(Arc::new(StaticCategories::found()))
        .with_ledger(ledger.clone())
        .build()
        .expect("all required ports are wired");

    let user = UserId::from_ulid(Ulid::new());
    let category = CategoryId::from_ulid(Ulid::new());
    let today = Utc::now().date_naive();

    // (B) 今日から始まる日次ルールを作る（今日が due になる）
    let payment = engine
        .service
        .create(NewPayment {
            user_id: user,
            name: "netflix".to_string(),
            description: Some("family plan".to_string()),
            amount: dec!(15.99),
            currency: "USD".to_string(),
            category_id: category,
            kind: PaymentKind::Expense,
            rule: ScheduleRule::Daily,
            start_date: today,
            end_date: None,
        })
        .await
        .expect("valid payment");
    println!(
        "created: id={} next_execution={}",
        payment.payment_id, payment.next_execution
    );

    // (C) due 分を即時実行（scheduler のタイマーを待たない）
    let report = engine
        .executor
        .execute_pending(today)
        .await
        .expect("store is in memory");
    println!(
        "run report: executed={} failed={} skipped={}",
        report.executed, report.failed, report.skipped
    );
    for entry in ledger.recorded().await {
        println!(
            "ledger saw: id={} kind={:?} amount={} {}",
            entry.entry_id, entry.kind, entry.entry.amount, entry.entry.currency
        );
    }

    // (D) 履歴と統計を見る
    let history = engine
        .service
        .history(user, payment.payment_id, HistoryFilter::default(), Page::default())
        .await
        .expect("payment exists");
    println!("history: total={}", history.total);
    for row in &history.items {
        println!(
            "  {} state={:?} ledger_ref={:?}",
            row.execution_date, row.state, row.ledger_ref
        );
    }
    let stats = engine.service.statistics(user).await.expect("user exists");
    println!("statistics: {}", serde_json::to_string(&stats).unwrap());

    // (E) scheduler を起動して状態を覗き、手動トリガも一度かける
    engine.scheduler.start().await;
    let status = engine.scheduler.status().await;
    println!(
        "scheduler: running={} next_run_at={:?}",
        status.running, status.next_run_at
    );
    engine.scheduler.execute_now();
    sleep(Duration::from_millis(100)).await;

    // (F) pause / resume のライフサイクル
    engine
        .service
        .pause(user, payment.payment_id)
        .await
        .expect("active payment can pause");
    engine
        .service
        .resume(user, payment.payment_id)
        .await
        .expect("paused payment can resume");
    println!("paused and resumed: id={}", payment.payment_id);

    // (G) graceful shutdown
    engine.scheduler.stop().await;
}
