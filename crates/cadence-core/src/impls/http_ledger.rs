//! HTTP implementation of the ledger port.
//!
//! Creates expense/income records through the ledger service's internal
//! endpoints. Same credential header and retry discipline as the category
//! client; POSTs are retried only on transport errors and 5xx, relying on
//! the store-level (payment, date) uniqueness to keep occurrences single.

use async_trait::async_trait;
use serde::Deserialize;
use ulid::Ulid;

use crate::config::HttpConfig;
use crate::domain::{CadenceError, LedgerEntryId};
use crate::impls::http_category::INTERNAL_TOKEN_HEADER;
use crate::impls::retry::RetryPolicy;
use crate::ports::{LedgerPort, NewLedgerEntry};

#[derive(Debug, Deserialize)]
struct CreatedEntry {
    id: Ulid,
}

pub struct HttpLedgerClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl HttpLedgerClient {
    pub fn new(config: &HttpConfig) -> Result<Self, CadenceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CadenceError::ExternalService(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.ledger_base_url.trim_end_matches('/').to_string(),
            token: config.internal_token.clone(),
            retry: config.retry.clone(),
        })
    }

    async fn create(
        &self,
        path: &str,
        entry: &NewLedgerEntry,
    ) -> Result<LedgerEntryId, CadenceError> {
        let url = format!("{}{path}", self.base_url);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let failure = match self.create_once(&url, entry).await {
                Ok(id) => return Ok(id),
                Err(failure) => failure,
            };
            match failure {
                CreateFailure::Permanent(msg) => {
                    return Err(CadenceError::ExternalService(msg));
                }
                CreateFailure::Transient(msg) => {
                    if !self.retry.allows_retry(attempts) {
                        return Err(CadenceError::ExternalService(msg));
                    }
                    let delay = self.retry.next_delay(attempts);
                    tracing::warn!(
                        url = %url,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %msg,
                        "ledger create failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn create_once(
        &self,
        url: &str,
        entry: &NewLedgerEntry,
    ) -> Result<LedgerEntryId, CreateFailure> {
        let response = self
            .http
            .post(url)
            .header(INTERNAL_TOKEN_HEADER, &self.token)
            .json(entry)
            .send()
            .await
            .map_err(|e| CreateFailure::Transient(format!("ledger request: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(CreateFailure::Transient(format!(
                "ledger service returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(CreateFailure::Permanent(format!(
                "ledger service returned {status}"
            )));
        }

        let created: CreatedEntry = response
            .json()
            .await
            .map_err(|e| CreateFailure::Permanent(format!("ledger response decode: {e}")))?;
        Ok(LedgerEntryId::from_ulid(created.id))
    }
}

enum CreateFailure {
    Transient(String),
    Permanent(String),
}

#[async_trait]
impl LedgerPort for HttpLedgerClient {
    async fn create_expense(&self, entry: &NewLedgerEntry) -> Result<LedgerEntryId, CadenceError> {
        self.create("/internal/expenses", entry).await
    }

    async fn create_income(&self, entry: &NewLedgerEntry) -> Result<LedgerEntryId, CadenceError> {
        self.create("/internal/incomes", entry).await
    }
}
