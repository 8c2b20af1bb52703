//! In-memory store implementation.
//!
//! Development and test backend for [`PaymentStore`]. A SQL backend would
//! enforce the (payment_id, execution_date) uniqueness with a partial unique
//! index; here it is checked under the state lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::domain::{
    AttemptState, CadenceError, PaymentId, PaymentSchedule, RecurringPayment, ScheduleId, UserId,
};
use crate::ports::{AttemptCounts, HistoryFilter, HistoryPage, Page, PaymentStore};

/// In-memory store state.
#[derive(Default)]
struct StoreState {
    /// All recurrence rules (single source of truth).
    payments: HashMap<PaymentId, RecurringPayment>,

    /// All attempt rows.
    schedules: HashMap<ScheduleId, PaymentSchedule>,
}

impl StoreState {
    fn schedules_of(&self, payment: PaymentId) -> impl Iterator<Item = &PaymentSchedule> {
        self.schedules
            .values()
            .filter(move |s| s.payment_id == payment)
    }
}

/// In-memory `PaymentStore`.
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert_payment(&self, payment: RecurringPayment) -> Result<(), CadenceError> {
        let mut state = self.state.lock().await;
        state.payments.insert(payment.payment_id, payment);
        Ok(())
    }

    async fn update_payment(&self, payment: &RecurringPayment) -> Result<(), CadenceError> {
        let mut state = self.state.lock().await;
        if !state.payments.contains_key(&payment.payment_id) {
            return Err(CadenceError::PaymentNotFound(payment.payment_id));
        }
        state.payments.insert(payment.payment_id, payment.clone());
        Ok(())
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<RecurringPayment>, CadenceError> {
        let state = self.state.lock().await;
        Ok(state.payments.get(&id).cloned())
    }

    async fn delete_payment(&self, id: PaymentId) -> Result<(), CadenceError> {
        let mut state = self.state.lock().await;
        if state.payments.remove(&id).is_none() {
            return Err(CadenceError::PaymentNotFound(id));
        }
        // cascade: the payment exclusively owns its history
        state.schedules.retain(|_, s| s.payment_id != id);
        Ok(())
    }

    async fn payments_for_user(&self, user: UserId) -> Result<Vec<RecurringPayment>, CadenceError> {
        let state = self.state.lock().await;
        let mut payments: Vec<_> = state
            .payments
            .values()
            .filter(|p| p.user_id == user)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.payment_id);
        Ok(payments)
    }

    async fn due_payments(&self, as_of: NaiveDate) -> Result<Vec<RecurringPayment>, CadenceError> {
        let state = self.state.lock().await;
        let mut due: Vec<_> = state
            .payments
            .values()
            .filter(|p| crate::domain::recurrence::should_execute(p, as_of))
            .cloned()
            .collect();
        due.sort_by_key(|p| p.payment_id);
        Ok(due)
    }

    async fn begin_attempt(&self, schedule: PaymentSchedule) -> Result<(), CadenceError> {
        let mut state = self.state.lock().await;
        let duplicate = state
            .schedules_of(schedule.payment_id)
            .any(|s| s.execution_date == schedule.execution_date && s.state != AttemptState::Failed);
        if duplicate {
            return Err(CadenceError::DuplicateAttempt {
                payment_id: schedule.payment_id,
                date: schedule.execution_date,
            });
        }
        state.schedules.insert(schedule.schedule_id, schedule);
        Ok(())
    }

    async fn finish_attempt(&self, schedule: &PaymentSchedule) -> Result<(), CadenceError> {
        let mut state = self.state.lock().await;
        if !state.schedules.contains_key(&schedule.schedule_id) {
            return Err(CadenceError::ScheduleNotFound(schedule.schedule_id));
        }
        state
            .schedules
            .insert(schedule.schedule_id, schedule.clone());
        Ok(())
    }

    async fn get_schedule(
        &self,
        id: ScheduleId,
    ) -> Result<Option<PaymentSchedule>, CadenceError> {
        let state = self.state.lock().await;
        Ok(state.schedules.get(&id).cloned())
    }

    async fn history(
        &self,
        payment: PaymentId,
        filter: &HistoryFilter,
        page: Page,
    ) -> Result<HistoryPage, CadenceError> {
        let state = self.state.lock().await;
        let mut matching: Vec<_> = state
            .schedules_of(payment)
            .filter(|s| filter.state.is_none_or(|wanted| s.state == wanted))
            .filter(|s| filter.from.is_none_or(|from| s.execution_date >= from))
            .filter(|s| filter.to.is_none_or(|to| s.execution_date <= to))
            .cloned()
            .collect();
        // newest first, ids as tiebreaker for a stable order
        matching.sort_by(|a, b| {
            b.execution_date
                .cmp(&a.execution_date)
                .then(b.schedule_id.cmp(&a.schedule_id))
        });

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        Ok(HistoryPage { items, total })
    }

    async fn attempt_counts(
        &self,
        user: UserId,
        since: NaiveDate,
    ) -> Result<AttemptCounts, CadenceError> {
        let state = self.state.lock().await;
        let mut counts = AttemptCounts::default();
        for schedule in state.schedules.values() {
            if schedule.execution_date < since {
                continue;
            }
            let owned = state
                .payments
                .get(&schedule.payment_id)
                .is_some_and(|p| p.user_id == user);
            if !owned {
                continue;
            }
            match schedule.state {
                AttemptState::Executed => counts.executed += 1,
                AttemptState::Failed => counts.failed += 1,
                AttemptState::Pending => {}
            }
        }
        Ok(counts)
    }
}
