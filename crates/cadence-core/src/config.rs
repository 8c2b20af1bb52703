//! Engine configuration.
//!
//! Plain structs with defaults and `with_*` setters; deserializable so a
//! host process can load them from its own config file.

use chrono::NaiveTime;
use serde::Deserialize;
use std::time::Duration;

use crate::impls::retry::RetryPolicy;

/// Scheduler settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Daily fire time, UTC.
    pub fire_at: NaiveTime,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            // 02:00 UTC: past midnight in most ledger-relevant timezones
            fire_at: NaiveTime::from_hms_opt(2, 0, 0).expect("02:00:00 is a valid time"),
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn with_fire_at(mut self, fire_at: NaiveTime) -> Self {
        self.fire_at = fire_at;
        self
    }
}

/// Settings for the HTTP category/ledger clients.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub category_base_url: String,
    pub ledger_base_url: String,
    /// Shared internal-service credential, sent as `x-internal-token`.
    pub internal_token: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            category_base_url: "http://localhost:8081".to_string(),
            ledger_base_url: "http://localhost:8082".to_string(),
            internal_token: String::new(),
            request_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn with_endpoints(
        mut self,
        category_base_url: impl Into<String>,
        ledger_base_url: impl Into<String>,
    ) -> Self {
        self.category_base_url = category_base_url.into();
        self.ledger_base_url = ledger_base_url.into();
        self
    }

    #[must_use]
    pub fn with_internal_token(mut self, token: impl Into<String>) -> Self {
        self.internal_token = token.into();
        self
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub http: HttpConfig,
}
