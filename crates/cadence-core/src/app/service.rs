//! PaymentService - ルールのライフサイクルとレポート
//!
//! 所有ユーザにスコープされた CRUD と統計・履歴クエリ。
//! バリデーションエラーだけが呼び出し元へ同期的に返ります。

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::recurrence::initial_next_execution;
use crate::domain::{
    CadenceError, CategoryId, PaymentId, PaymentKind, PaymentStatus, RecurringPayment, ScheduleRule,
    UserId,
};
use crate::ports::{
    CategoryCheck, CategoryPort, Clock, HistoryFilter, HistoryPage, IdGenerator, Page, PaymentStore,
};

/// Trailing window for the statistics query, in days.
const STATS_WINDOW_DAYS: u64 = 30;

/// Input for creating a recurrence rule.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub category_id: CategoryId,
    pub kind: PaymentKind,
    #[serde(flatten)]
    pub rule: ScheduleRule,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Partial update of a recurrence rule. `None` fields stay unchanged.
///
/// `description` and `end_date` are themselves optional on the payment, so
/// they use a double option: an absent field keeps the current value, an
/// explicit `null` clears it (e.g. removing an end_date makes the rule
/// open-ended again).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "clearable")]
    pub description: Option<Option<String>>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub category_id: Option<CategoryId>,
    #[serde(flatten)]
    pub rule: Option<ScheduleRule>,
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "clearable")]
    pub end_date: Option<Option<NaiveDate>>,
}

/// Maps a present field (value or `null`) to `Some(..)`, so only an absent
/// field deserializes to the outer `None`.
fn clearable<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}

/// Aggregate counts for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaymentStatistics {
    pub total: usize,
    pub active: usize,
    pub paused: usize,
    /// Executed attempts in the trailing 30-day window.
    pub executed_recently: usize,
    /// Failed attempts in the trailing 30-day window.
    pub failed_recently: usize,
}

/// PaymentService はルールの作成・変更・削除とレポートを担当
pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
    categories: Arc<dyn CategoryPort>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        categories: Arc<dyn CategoryPort>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            categories,
            clock,
            ids,
        }
    }

    /// Create a rule. Schedule shape, amount, window and category are all
    /// validated here, never at execution time.
    pub async fn create(&self, input: NewPayment) -> Result<RecurringPayment, CadenceError> {
        input.rule.validate()?;
        validate_amount(input.amount)?;
        validate_window(input.start_date, input.end_date)?;
        self.require_category(input.category_id, input.user_id).await?;

        let now = self.clock.now();
        let payment = RecurringPayment {
            payment_id: self.ids.payment_id(),
            user_id: input.user_id,
            name: input.name,
            description: input.description,
            amount: input.amount,
            currency: input.currency,
            category_id: input.category_id,
            kind: input.kind,
            rule: input.rule,
            start_date: input.start_date,
            end_date: input.end_date,
            status: PaymentStatus::Active,
            last_executed: None,
            next_execution: initial_next_execution(&input.rule, input.start_date),
            created_at: now,
            updated_at: now,
        };

        self.store.insert_payment(payment.clone()).await?;
        tracing::info!(
            payment_id = %payment.payment_id,
            user_id = %payment.user_id,
            rule = payment.rule.label(),
            next_execution = %payment.next_execution,
            "payment created"
        );
        Ok(payment)
    }

    /// Partial update. Changing the rule or start_date recomputes
    /// next_execution; changing the category re-validates it. Terminal
    /// payments reject edits.
    pub async fn update(
        &self,
        user: UserId,
        id: PaymentId,
        update: PaymentUpdate,
    ) -> Result<RecurringPayment, CadenceError> {
        let mut payment = self.owned_payment(user, id).await?;
        if payment.status.is_terminal() {
            return Err(CadenceError::InvalidTransition {
                from: payment.status,
                to: payment.status,
            });
        }

        if let Some(rule) = update.rule {
            rule.validate()?;
            payment.rule = rule;
        }
        if let Some(name) = update.name {
            payment.name = name;
        }
        if let Some(description) = update.description {
            payment.description = description;
        }
        if let Some(amount) = update.amount {
            validate_amount(amount)?;
            payment.amount = amount;
        }
        if let Some(currency) = update.currency {
            payment.currency = currency;
        }
        if let Some(category_id) = update.category_id {
            self.require_category(category_id, user).await?;
            payment.category_id = category_id;
        }
        if let Some(start_date) = update.start_date {
            payment.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            payment.end_date = end_date;
        }
        validate_window(payment.start_date, payment.end_date)?;

        if update.rule.is_some() || update.start_date.is_some() {
            payment.next_execution = initial_next_execution(&payment.rule, payment.start_date);
        }
        payment.updated_at = self.clock.now();

        self.store.update_payment(&payment).await?;
        Ok(payment)
    }

    /// Active -> Paused.
    pub async fn pause(&self, user: UserId, id: PaymentId) -> Result<(), CadenceError> {
        let mut payment = self.owned_payment(user, id).await?;
        payment.pause(self.clock.now())?;
        self.store.update_payment(&payment).await
    }

    /// Paused -> Active.
    pub async fn resume(&self, user: UserId, id: PaymentId) -> Result<(), CadenceError> {
        let mut payment = self.owned_payment(user, id).await?;
        payment.resume(self.clock.now())?;
        self.store.update_payment(&payment).await
    }

    /// Active | Paused -> Cancelled (terminal).
    pub async fn cancel(&self, user: UserId, id: PaymentId) -> Result<(), CadenceError> {
        let mut payment = self.owned_payment(user, id).await?;
        payment.cancel(self.clock.now())?;
        self.store.update_payment(&payment).await
    }

    /// Delete the rule and cascade its occurrence history.
    pub async fn delete(&self, user: UserId, id: PaymentId) -> Result<(), CadenceError> {
        let payment = self.owned_payment(user, id).await?;
        self.store.delete_payment(payment.payment_id).await
    }

    pub async fn get(&self, user: UserId, id: PaymentId) -> Result<RecurringPayment, CadenceError> {
        self.owned_payment(user, id).await
    }

    pub async fn list(&self, user: UserId) -> Result<Vec<RecurringPayment>, CadenceError> {
        self.store.payments_for_user(user).await
    }

    /// Rule counts plus attempt counts over the trailing 30-day window.
    pub async fn statistics(&self, user: UserId) -> Result<PaymentStatistics, CadenceError> {
        let payments = self.store.payments_for_user(user).await?;
        let since = self.clock.today() - Days::new(STATS_WINDOW_DAYS);
        let attempts = self.store.attempt_counts(user, since).await?;

        let mut stats = PaymentStatistics {
            total: payments.len(),
            executed_recently: attempts.executed,
            failed_recently: attempts.failed,
            ..Default::default()
        };
        for payment in &payments {
            match payment.status {
                PaymentStatus::Active => stats.active += 1,
                PaymentStatus::Paused => stats.paused += 1,
                PaymentStatus::Completed | PaymentStatus::Cancelled => {}
            }
        }
        Ok(stats)
    }

    /// Attempt history of one owned rule, filtered and paginated.
    pub async fn history(
        &self,
        user: UserId,
        id: PaymentId,
        filter: HistoryFilter,
        page: Page,
    ) -> Result<HistoryPage, CadenceError> {
        let payment = self.owned_payment(user, id).await?;
        self.store.history(payment.payment_id, &filter, page).await
    }

    /// Load a payment, hiding other users' rows behind not-found.
    async fn owned_payment(
        &self,
        user: UserId,
        id: PaymentId,
    ) -> Result<RecurringPayment, CadenceError> {
        let payment = self
            .store
            .get_payment(id)
            .await?
            .ok_or(CadenceError::PaymentNotFound(id))?;
        if payment.user_id != user {
            return Err(CadenceError::PaymentNotFound(id));
        }
        Ok(payment)
    }

    async fn require_category(
        &self,
        category: CategoryId,
        user: UserId,
    ) -> Result<(), CadenceError> {
        match self.categories.check(category, user).await? {
            CategoryCheck::Found => Ok(()),
            CategoryCheck::NotFound => Err(CadenceError::InvalidPayment(format!(
                "category {category} not found"
            ))),
            CategoryCheck::Forbidden => Err(CadenceError::InvalidPayment(format!(
                "category {category} does not belong to {user}"
            ))),
        }
    }
}

fn validate_amount(amount: Decimal) -> Result<(), CadenceError> {
    if amount <= Decimal::ZERO {
        return Err(CadenceError::InvalidPayment(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

fn validate_window(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), CadenceError> {
    if let Some(end) = end
        && end <= start
    {
        return Err(CadenceError::InvalidPayment(format!(
            "end_date {end} must be strictly after start_date {start}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{LedgerEntryId, ScheduleId};
    use crate::domain::{AttemptState, LedgerRef, PaymentSchedule};
    use crate::impls::stubs::StaticCategories;
    use crate::impls::InMemoryStore;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use ulid::Ulid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service_with(categories: StaticCategories) -> (Arc<InMemoryStore>, PaymentService) {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap(),
        ));
        let service = PaymentService::new(
            store.clone(),
            Arc::new(categories),
            clock.clone(),
            Arc::new(UlidGenerator::new(*clock)),
        );
        (store, service)
    }

    fn user() -> UserId {
        UserId::from_ulid(Ulid::from_parts(20, 1))
    }

    fn new_payment(rule: ScheduleRule) -> NewPayment {
        NewPayment {
            user_id: user(),
            name: "gym".to_string(),
            description: None,
            amount: dec!(30.00),
            currency: "EUR".to_string(),
            category_id: CategoryId::from_ulid(Ulid::from_parts(30, 1)),
            kind: PaymentKind::Expense,
            rule,
            start_date: date(2024, 1, 1),
            end_date: None,
        }
    }

    #[tokio::test]
    async fn create_computes_initial_next_execution() {
        let (_store, service) = service_with(StaticCategories::found());
        // Monday start, Wednesday rule
        let created = service
            .create(new_payment(ScheduleRule::Weekly { day_of_week: 2 }))
            .await
            .unwrap();
        assert_eq!(created.next_execution, date(2024, 1, 3));
        assert_eq!(created.status, PaymentStatus::Active);
    }

    #[tokio::test]
    async fn create_rejects_bad_amount_window_and_category() {
        let (_store, service) = service_with(StaticCategories::found());

        let mut negative = new_payment(ScheduleRule::Daily);
        negative.amount = dec!(-5);
        assert!(service.create(negative).await.is_err());

        let mut bad_window = new_payment(ScheduleRule::Daily);
        bad_window.end_date = Some(date(2024, 1, 1));
        assert!(service.create(bad_window).await.is_err());

        let mut bad_rule = new_payment(ScheduleRule::Weekly { day_of_week: 9 });
        bad_rule.name = "bad".to_string();
        assert!(matches!(
            service.create(bad_rule).await,
            Err(CadenceError::InvalidSchedule(_))
        ));

        let (_store, rejecting) = service_with(StaticCategories::answering(
            crate::ports::CategoryCheck::NotFound,
        ));
        assert!(rejecting.create(new_payment(ScheduleRule::Daily)).await.is_err());
    }

    #[tokio::test]
    async fn update_recomputes_next_execution_when_rule_changes() {
        let (_store, service) = service_with(StaticCategories::found());
        let created = service.create(new_payment(ScheduleRule::Daily)).await.unwrap();

        let updated = service
            .update(
                user(),
                created.payment_id,
                PaymentUpdate {
                    rule: Some(ScheduleRule::Monthly { day_of_month: 15 }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.next_execution, date(2024, 1, 15));

        // a name-only update leaves next_execution alone
        let renamed = service
            .update(
                user(),
                created.payment_id,
                PaymentUpdate {
                    name: Some("gym+".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.next_execution, updated.next_execution);
        assert_eq!(renamed.name, "gym+");
    }

    #[tokio::test]
    async fn update_can_clear_description_and_end_date() {
        let (_store, service) = service_with(StaticCategories::found());
        let mut input = new_payment(ScheduleRule::Daily);
        input.description = Some("temporary".to_string());
        input.end_date = Some(date(2024, 6, 1));
        let created = service.create(input).await.unwrap();

        let updated = service
            .update(
                user(),
                created.payment_id,
                PaymentUpdate {
                    description: Some(None),
                    end_date: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, None);
        assert_eq!(updated.end_date, None);
    }

    #[test]
    fn update_wire_distinguishes_absent_from_null() {
        let cleared: PaymentUpdate =
            serde_json::from_value(serde_json::json!({ "end_date": null })).unwrap();
        assert_eq!(cleared.end_date, Some(None));

        let untouched: PaymentUpdate = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(untouched.end_date, None);
    }

    #[tokio::test]
    async fn pause_resume_transitions_are_enforced() {
        let (_store, service) = service_with(StaticCategories::found());
        let created = service.create(new_payment(ScheduleRule::Daily)).await.unwrap();
        let id = created.payment_id;

        // resume on an active payment is rejected
        assert!(service.resume(user(), id).await.is_err());

        service.pause(user(), id).await.unwrap();
        assert!(service.pause(user(), id).await.is_err());
        service.resume(user(), id).await.unwrap();

        service.cancel(user(), id).await.unwrap();
        assert!(service.pause(user(), id).await.is_err());
        // edits on a terminal payment are rejected
        assert!(
            service
                .update(user(), id, PaymentUpdate::default())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn foreign_payments_are_hidden_behind_not_found() {
        let (_store, service) = service_with(StaticCategories::found());
        let created = service.create(new_payment(ScheduleRule::Daily)).await.unwrap();

        let stranger = UserId::from_ulid(Ulid::from_parts(20, 2));
        let result = service.get(stranger, created.payment_id).await;
        assert!(matches!(result, Err(CadenceError::PaymentNotFound(_))));
    }

    #[tokio::test]
    async fn delete_cascades_history() {
        let (store, service) = service_with(StaticCategories::found());
        let created = service.create(new_payment(ScheduleRule::Daily)).await.unwrap();

        let row = PaymentSchedule::pending(
            ScheduleId::from_ulid(Ulid::from_parts(40, 1)),
            created.payment_id,
            date(2024, 1, 2),
            None,
            Utc.with_ymd_and_hms(2024, 1, 2, 2, 0, 0).unwrap(),
        );
        store.begin_attempt(row.clone()).await.unwrap();

        service.delete(user(), created.payment_id).await.unwrap();
        assert!(store.get_schedule(row.schedule_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn statistics_count_rules_and_recent_attempts() {
        let (store, service) = service_with(StaticCategories::found());
        let a = service.create(new_payment(ScheduleRule::Daily)).await.unwrap();
        let b = service.create(new_payment(ScheduleRule::Daily)).await.unwrap();
        service.pause(user(), b.payment_id).await.unwrap();

        // one executed inside the window, one failed outside it
        let mut recent = PaymentSchedule::pending(
            ScheduleId::from_ulid(Ulid::from_parts(40, 1)),
            a.payment_id,
            date(2024, 1, 20),
            None,
            Utc.with_ymd_and_hms(2024, 1, 20, 2, 0, 0).unwrap(),
        );
        recent.mark_executed(
            LedgerRef::Expense(LedgerEntryId::from_ulid(Ulid::from_parts(50, 1))),
            Utc.with_ymd_and_hms(2024, 1, 20, 2, 0, 1).unwrap(),
        );
        store.begin_attempt(recent.clone()).await.unwrap();
        store.finish_attempt(&recent).await.unwrap();

        let mut old = PaymentSchedule::pending(
            ScheduleId::from_ulid(Ulid::from_parts(40, 2)),
            a.payment_id,
            date(2023, 11, 1),
            None,
            Utc.with_ymd_and_hms(2023, 11, 1, 2, 0, 0).unwrap(),
        );
        old.mark_failed("ancient history");
        store.begin_attempt(old.clone()).await.unwrap();
        store.finish_attempt(&old).await.unwrap();

        let stats = service.statistics(user()).await.unwrap();
        assert_eq!(
            stats,
            PaymentStatistics {
                total: 2,
                active: 1,
                paused: 1,
                executed_recently: 1,
                failed_recently: 0,
            }
        );
    }

    #[tokio::test]
    async fn history_is_scoped_to_the_owner() {
        let (store, service) = service_with(StaticCategories::found());
        let created = service.create(new_payment(ScheduleRule::Daily)).await.unwrap();

        let mut row = PaymentSchedule::pending(
            ScheduleId::from_ulid(Ulid::from_parts(40, 1)),
            created.payment_id,
            date(2024, 1, 2),
            None,
            Utc.with_ymd_and_hms(2024, 1, 2, 2, 0, 0).unwrap(),
        );
        row.mark_failed("nope");
        store.begin_attempt(row.clone()).await.unwrap();
        store.finish_attempt(&row).await.unwrap();

        let page = service
            .history(
                user(),
                created.payment_id,
                HistoryFilter {
                    state: Some(AttemptState::Failed),
                    ..Default::default()
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let stranger = UserId::from_ulid(Ulid::from_parts(20, 9));
        assert!(
            service
                .history(
                    stranger,
                    created.payment_id,
                    HistoryFilter::default(),
                    Page::default()
                )
                .await
                .is_err()
        );
    }
}
