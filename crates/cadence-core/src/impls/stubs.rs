//! Test doubles for the external-service ports.
//!
//! Used by unit tests and the demo CLI. A real deployment wires
//! [`HttpCategoryClient`](super::http_category::HttpCategoryClient) and
//! [`HttpLedgerClient`](super::http_ledger::HttpLedgerClient) instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::domain::{CadenceError, CategoryId, LedgerEntryId, UserId};
use crate::ports::{CategoryCheck, CategoryPort, LedgerPort, NewLedgerEntry};

/// Category port answering every check with a fixed result.
pub struct StaticCategories {
    answer: CategoryCheck,
}

impl StaticCategories {
    pub fn found() -> Self {
        Self {
            answer: CategoryCheck::Found,
        }
    }

    pub fn answering(answer: CategoryCheck) -> Self {
        Self { answer }
    }
}

#[async_trait]
impl CategoryPort for StaticCategories {
    async fn check(
        &self,
        _category: CategoryId,
        _user: UserId,
    ) -> Result<CategoryCheck, CadenceError> {
        Ok(self.answer)
    }
}

/// What the recording ledger saw.
#[derive(Debug, Clone)]
pub struct RecordedEntry {
    pub entry_id: LedgerEntryId,
    pub kind: RecordedKind,
    pub entry: NewLedgerEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedKind {
    Expense,
    Income,
}

/// Ledger port that records every created entry in memory.
///
/// Can be primed with `fail_next_n` to simulate a ledger outage for the
/// first N calls.
pub struct RecordingLedger {
    entries: Arc<Mutex<Vec<RecordedEntry>>>,
    remaining_failures: AtomicU64,
    next_seq: AtomicU64,
}

impl RecordingLedger {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            remaining_failures: AtomicU64::new(0),
            next_seq: AtomicU64::new(1),
        }
    }

    pub fn failing_first(n: u64) -> Self {
        let ledger = Self::new();
        ledger.remaining_failures.store(n, Ordering::Relaxed);
        ledger
    }

    pub async fn recorded(&self) -> Vec<RecordedEntry> {
        self.entries.lock().await.clone()
    }

    async fn record(
        &self,
        kind: RecordedKind,
        entry: &NewLedgerEntry,
    ) -> Result<LedgerEntryId, CadenceError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(CadenceError::ExternalService(format!(
                "ledger unavailable (left={left})"
            )));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let entry_id = LedgerEntryId::from_ulid(Ulid::from_parts(seq, u128::from(seq)));
        self.entries.lock().await.push(RecordedEntry {
            entry_id,
            kind,
            entry: entry.clone(),
        });
        Ok(entry_id)
    }
}

impl Default for RecordingLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerPort for RecordingLedger {
    async fn create_expense(&self, entry: &NewLedgerEntry) -> Result<LedgerEntryId, CadenceError> {
        self.record(RecordedKind::Expense, entry).await
    }

    async fn create_income(&self, entry: &NewLedgerEntry) -> Result<LedgerEntryId, CadenceError> {
        self.record(RecordedKind::Income, entry).await
    }
}
