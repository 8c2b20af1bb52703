//! Recurrence arithmetic - 次回実行日の純粋計算
//!
//! I/O も副作用もない決定的な日付計算だけを置きます。
//! end_date を超えた場合の completed 遷移は executor の責務です。

use chrono::{Datelike, Days, NaiveDate};

use super::payment::{PaymentStatus, RecurringPayment};
use super::schedule::ScheduleRule;

/// First occurrence on/after `start` satisfying the rule.
///
/// Result is always >= `start`. Weekly rules may return `start` itself when
/// the weekday already matches.
pub fn initial_next_execution(rule: &ScheduleRule, start: NaiveDate) -> NaiveDate {
    match *rule {
        ScheduleRule::Daily => start,
        ScheduleRule::Weekly { day_of_week } => {
            let delta = u64::from(
                (u32::from(day_of_week) + 7 - start.weekday().num_days_from_monday()) % 7,
            );
            start + Days::new(delta)
        }
        ScheduleRule::Monthly { day_of_month } => {
            let candidate = clamped_date(start.year(), start.month(), day_of_month);
            if candidate >= start {
                candidate
            } else {
                let (year, month) = next_month(start.year(), start.month());
                clamped_date(year, month, day_of_month)
            }
        }
        ScheduleRule::Yearly { month, day } => {
            let candidate = clamped_date(start.year(), month, day);
            if candidate >= start {
                candidate
            } else {
                clamped_date(start.year() + 1, month, day)
            }
        }
    }
}

/// Next occurrence strictly after `base`.
pub fn next_occurrence_after(rule: &ScheduleRule, base: NaiveDate) -> NaiveDate {
    match *rule {
        ScheduleRule::Daily => base + Days::new(1),
        ScheduleRule::Weekly { day_of_week } => {
            let delta =
                (u32::from(day_of_week) + 7 - base.weekday().num_days_from_monday()) % 7;
            // 同じ曜日なら丸 1 週間進める
            let delta = if delta == 0 { 7 } else { u64::from(delta) };
            base + Days::new(delta)
        }
        ScheduleRule::Monthly { day_of_month } => {
            let (year, month) = next_month(base.year(), base.month());
            clamped_date(year, month, day_of_month)
        }
        ScheduleRule::Yearly { month, day } => clamped_date(base.year() + 1, month, day),
    }
}

/// Next occurrence for a payment: strictly after its last_executed date, or
/// after start_date if it never executed.
pub fn next_execution(payment: &RecurringPayment) -> NaiveDate {
    let base = payment
        .last_executed
        .map(|ts| ts.date_naive())
        .unwrap_or(payment.start_date);
    next_occurrence_after(&payment.rule, base)
}

/// Is this payment due on `today`?
///
/// True iff the payment is active, its next_execution is on/before `today`,
/// and `today` has not passed its end_date.
pub fn should_execute(payment: &RecurringPayment, today: NaiveDate) -> bool {
    payment.status == PaymentStatus::Active
        && payment.next_execution <= today
        && payment.end_date.is_none_or(|end| today <= end)
}

/// Day-of-month with clamp: a day past the end of the month becomes the last
/// day of that month (documented policy, not an error).
fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| last_day_of_month(year, month))
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = next_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("first of month is always valid")
        .pred_opt()
        .expect("month start has a predecessor")
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}
