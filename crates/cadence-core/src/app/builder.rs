//! EngineBuilder - エンジンの組み立て
//!
//! ポート実装を差し込んで Engine（executor / scheduler / service）を
//! 構築します。必須ポートが欠けていれば `build` が即座に失敗します。

use std::sync::Arc;

use thiserror::Error;

use crate::app::executor::Executor;
use crate::app::scheduler::Scheduler;
use crate::app::service::PaymentService;
use crate::config::EngineConfig;
use crate::ports::{CategoryPort, Clock, IdGenerator, LedgerPort, PaymentStore, SystemClock, UlidGenerator};

/// 組み立てエラー
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("missing required port: {0}")]
    MissingPort(&'static str),
}

/// Assembled engine: one executor, one scheduler, one lifecycle service,
/// all sharing the same ports.
pub struct Engine {
    pub executor: Arc<Executor>,
    pub scheduler: Arc<Scheduler>,
    pub service: PaymentService,
}

/// EngineBuilder はポートを注入して Engine を組み立てる
///
/// store / categories / ledger は必須。clock と ids は省略時に
/// SystemClock / UlidGenerator が使われます。
#[derive(Default)]
pub struct EngineBuilder {
    store: Option<Arc<dyn PaymentStore>>,
    categories: Option<Arc<dyn CategoryPort>>,
    ledger: Option<Arc<dyn LedgerPort>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn PaymentStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_categories(mut self, categories: Arc<dyn CategoryPort>) -> Self {
        self.categories = Some(categories);
        self
    }

    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerPort>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble the engine. Fails fast on a missing required port.
    pub fn build(self) -> Result<Engine, BuildError> {
        let store = self.store.ok_or(BuildError::MissingPort("store"))?;
        let categories = self
            .categories
            .ok_or(BuildError::MissingPort("categories"))?;
        let ledger = self.ledger.ok_or(BuildError::MissingPort("ledger"))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)) as Arc<dyn IdGenerator>);

        let executor = Arc::new(Executor::new(
            store.clone(),
            categories.clone(),
            ledger,
            clock.clone(),
            ids.clone(),
        ));
        let scheduler = Arc::new(Scheduler::new(
            executor.clone(),
            clock.clone(),
            self.config.scheduler,
        ));
        let service = PaymentService::new(store, categories, clock, ids);

        Ok(Engine {
            executor,
            scheduler,
            service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::stubs::{RecordingLedger, StaticCategories};
    use crate::impls::InMemoryStore;

    #[test]
    fn builds_with_all_required_ports() {
        let engine = EngineBuilder::new()
            .with_store(Arc::new(InMemoryStore::new()))
            .with_categories(Arc::new(StaticCategories::found()))
            .with_ledger(Arc::new(RecordingLedger::new()))
            .build();
        assert!(engine.is_ok());
    }

    #[test]
    fn missing_store_fails_fast() {
        let result = EngineBuilder::new()
            .with_categories(Arc::new(StaticCategories::found()))
            .with_ledger(Arc::new(RecordingLedger::new()))
            .build();
        assert!(matches!(result, Err(BuildError::MissingPort("store"))));
    }

    #[test]
    fn missing_ledger_fails_fast() {
        let result = EngineBuilder::new()
            .with_store(Arc::new(InMemoryStore::new()))
            .with_categories(Arc::new(StaticCategories::found()))
            .build();
        assert!(matches!(result, Err(BuildError::MissingPort("ledger"))));
    }
}
