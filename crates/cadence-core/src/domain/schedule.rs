//! ScheduleRule - 繰り返しルールの型付き表現
//!
//! 元設計では schedule_type + 無型の schedule_config マップでしたが、
//! ここでは schedule_type ごとに必要なフィールドだけを持つ tagged union
//! にします。形の不一致はデシリアライズ時点で弾かれます。

use serde::{Deserialize, Serialize};

use super::errors::CadenceError;

/// A recurrence rule: when does a payment repeat.
///
/// Serialized adjacently tagged so the wire shape keeps the original
/// `schedule_type` / `schedule_config` split:
///
/// ```json
/// { "schedule_type": "weekly", "schedule_config": { "day_of_week": 2 } }
/// ```
///
/// A config missing a required field (e.g. weekly without `day_of_week`)
/// fails to deserialize, so invalid shapes never reach execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "schedule_type",
    content = "schedule_config",
    rename_all = "snake_case"
)]
pub enum ScheduleRule {
    /// Every day. No config.
    Daily,

    /// Once a week on a fixed weekday.
    ///
    /// `day_of_week`: 0 = Monday .. 6 = Sunday (chrono's
    /// `num_days_from_monday` convention).
    Weekly { day_of_week: u8 },

    /// Once a month on a fixed day. Days past the end of a month clamp to
    /// the last day of that month (Jan 31 -> Feb 29/28).
    Monthly { day_of_month: u32 },

    /// Once a year on a fixed month/day, with the same clamp policy
    /// (Feb 29 -> Feb 28 in non-leap years).
    Yearly { month: u32, day: u32 },
}

impl ScheduleRule {
    /// Range-check the config fields.
    ///
    /// Deserialization already rejects missing/mistyped fields; this catches
    /// out-of-range values (day_of_week 9, month 13, ...). Called at
    /// create/update time, never deferred to execution.
    pub fn validate(&self) -> Result<(), CadenceError> {
        match *self {
            ScheduleRule::Daily => Ok(()),
            ScheduleRule::Weekly { day_of_week } => {
                if day_of_week > 6 {
                    return Err(CadenceError::InvalidSchedule(format!(
                        "day_of_week must be 0..=6, got {day_of_week}"
                    )));
                }
                Ok(())
            }
            ScheduleRule::Monthly { day_of_month } => {
                if !(1..=31).contains(&day_of_month) {
                    return Err(CadenceError::InvalidSchedule(format!(
                        "day_of_month must be 1..=31, got {day_of_month}"
                    )));
                }
                Ok(())
            }
            ScheduleRule::Yearly { month, day } => {
                if !(1..=12).contains(&month) {
                    return Err(CadenceError::InvalidSchedule(format!(
                        "month must be 1..=12, got {month}"
                    )));
                }
                if !(1..=31).contains(&day) {
                    return Err(CadenceError::InvalidSchedule(format!(
                        "day must be 1..=31, got {day}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Human-readable label for logs and views.
    pub fn label(&self) -> &'static str {
        match self {
            ScheduleRule::Daily => "daily",
            ScheduleRule::Weekly { .. } => "weekly",
            ScheduleRule::Monthly { .. } => "monthly",
            ScheduleRule::Yearly { .. } => "yearly",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn wire_shape_keeps_type_and_config_split() {
        let rule = ScheduleRule::Weekly { day_of_week: 2 };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "schedule_type": "weekly",
                "schedule_config": { "day_of_week": 2 }
            })
        );
    }

    #[test]
    fn weekly_config_missing_day_of_week_is_rejected_at_the_boundary() {
        let raw = serde_json::json!({
            "schedule_type": "weekly",
            "schedule_config": {}
        });
        let parsed: Result<ScheduleRule, _> = serde_json::from_value(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn daily_needs_no_config() {
        let raw = serde_json::json!({ "schedule_type": "daily" });
        let parsed: ScheduleRule = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed, ScheduleRule::Daily);
    }

    #[rstest]
    #[case::weekly_out_of_range(ScheduleRule::Weekly { day_of_week: 7 })]
    #[case::monthly_zero(ScheduleRule::Monthly { day_of_month: 0 })]
    #[case::monthly_too_big(ScheduleRule::Monthly { day_of_month: 32 })]
    #[case::yearly_month_13(ScheduleRule::Yearly { month: 13, day: 1 })]
    #[case::yearly_day_zero(ScheduleRule::Yearly { month: 1, day: 0 })]
    fn out_of_range_configs_fail_validation(#[case] rule: ScheduleRule) {
        assert!(rule.validate().is_err());
    }

    #[rstest]
    #[case::daily(ScheduleRule::Daily)]
    #[case::weekly(ScheduleRule::Weekly { day_of_week: 6 })]
    #[case::monthly(ScheduleRule::Monthly { day_of_month: 31 })]
    #[case::yearly(ScheduleRule::Yearly { month: 2, day: 29 })]
    fn in_range_configs_pass_validation(#[case] rule: ScheduleRule) {
        assert!(rule.validate().is_ok());
    }
}
