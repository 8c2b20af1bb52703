//! HTTP implementation of the category port.
//!
//! Talks to the category service's internal endpoint, authenticated with the
//! shared internal-service token (not end-user auth). Transport errors and
//! 5xx responses are retried with backoff before surfacing; 404/403 are
//! definitive answers and never retried.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::HttpConfig;
use crate::domain::{CadenceError, CategoryId, UserId};
use crate::impls::retry::RetryPolicy;
use crate::ports::{CategoryCheck, CategoryPort};

/// Header carrying the internal-service credential.
pub(crate) const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

pub struct HttpCategoryClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl HttpCategoryClient {
    pub fn new(config: &HttpConfig) -> Result<Self, CadenceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CadenceError::ExternalService(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.category_base_url.trim_end_matches('/').to_string(),
            token: config.internal_token.clone(),
            retry: config.retry.clone(),
        })
    }

    async fn check_once(
        &self,
        category: CategoryId,
        user: UserId,
    ) -> Result<CategoryCheck, CheckFailure> {
        let url = format!("{}/internal/categories/{}", self.base_url, category.as_ulid());
        let response = self
            .http
            .get(&url)
            .header(INTERNAL_TOKEN_HEADER, &self.token)
            .query(&[("user_id", user.as_ulid().to_string())])
            .send()
            .await
            .map_err(|e| CheckFailure::Transient(format!("category request: {e}")))?;

        match response.status() {
            StatusCode::OK => Ok(CategoryCheck::Found),
            StatusCode::NOT_FOUND => Ok(CategoryCheck::NotFound),
            StatusCode::FORBIDDEN => Ok(CategoryCheck::Forbidden),
            status if status.is_server_error() => Err(CheckFailure::Transient(format!(
                "category service returned {status}"
            ))),
            status => Err(CheckFailure::Permanent(format!(
                "category service returned {status}"
            ))),
        }
    }
}

enum CheckFailure {
    Transient(String),
    Permanent(String),
}

#[async_trait]
impl CategoryPort for HttpCategoryClient {
    async fn check(
        &self,
        category: CategoryId,
        user: UserId,
    ) -> Result<CategoryCheck, CadenceError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.check_once(category, user).await {
                Ok(answer) => return Ok(answer),
                Err(CheckFailure::Permanent(msg)) => {
                    return Err(CadenceError::ExternalService(msg));
                }
                Err(CheckFailure::Transient(msg)) => {
                    if !self.retry.allows_retry(attempts) {
                        return Err(CadenceError::ExternalService(msg));
                    }
                    let delay = self.retry.next_delay(attempts);
                    tracing::warn!(
                        %category,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %msg,
                        "category check failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_http::{CannedServer, config_for, response};
    use rstest::rstest;
    use ulid::Ulid;

    fn ids() -> (CategoryId, UserId) {
        (
            CategoryId::from_ulid(Ulid::from_parts(30, 1)),
            UserId::from_ulid(Ulid::from_parts(20, 1)),
        )
    }

    #[rstest]
    #[case::found("200 OK", CategoryCheck::Found)]
    #[case::not_found("404 Not Found", CategoryCheck::NotFound)]
    #[case::forbidden("403 Forbidden", CategoryCheck::Forbidden)]
    #[tokio::test]
    async fn definitive_statuses_map_without_retry(
        #[case] status: &str,
        #[case] expected: CategoryCheck,
    ) {
        let server = CannedServer::start(vec![response(status, "{}")]).await;
        let client = HttpCategoryClient::new(&config_for(&server.base_url)).unwrap();
        let (category, user) = ids();

        let answer = client.check(category, user).await.unwrap();
        assert_eq!(answer, expected);

        let requests = server.requests().await;
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("GET /internal/categories/"));
        assert!(
            requests[0]
                .to_ascii_lowercase()
                .contains("x-internal-token: sekrit")
        );
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_an_answer() {
        let server = CannedServer::start(vec![
            response("500 Internal Server Error", "{}"),
            response("200 OK", "{}"),
        ])
        .await;
        let client = HttpCategoryClient::new(&config_for(&server.base_url)).unwrap();
        let (category, user) = ids();

        let answer = client.check(category, user).await.unwrap();
        assert_eq!(answer, CategoryCheck::Found);
        assert_eq!(server.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn other_client_errors_fail_without_retry() {
        let server = CannedServer::start(vec![response("401 Unauthorized", "{}")]).await;
        let client = HttpCategoryClient::new(&config_for(&server.base_url)).unwrap();
        let (category, user) = ids();

        let err = client.check(category, user).await.unwrap_err();
        // リトライ予算は残っているが、4xx は確定失敗として即返る
        assert!(err.to_string().contains("401"), "{err}");
        assert_eq!(server.requests().await.len(), 1);
    }
}
