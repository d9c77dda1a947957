//! toncenter v2 REST client.
//!
//! Only `getTransactions` is used. Every response is wrapped in an
//! `{ok, result}` envelope; an `ok: false` body is a transport failure
//! even when the HTTP status is 200.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::debug;
use url::Url;

use super::dto::parse_transactions;
use super::settings::ToncenterConfig;
use crate::adapter::outbound::http::{should_retry, should_retry_status, HttpConfig};
use crate::domain::{NormalizedAddress, TransactionRecord};
use crate::error::{Result, TransportError};
use crate::port::outbound::fetcher::TransactionFetcher;

const API_KEY_HEADER: &str = "X-API-Key";

/// HTTP client for the toncenter API.
pub struct ToncenterClient {
    http: HttpClient,
    api_url: String,
    api_key: Option<String>,
    archival: bool,
    retry: HttpConfig,
}

impl ToncenterClient {
    /// Create a client with default timeouts and a single attempt.
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            api_url: api_url.into(),
            api_key: None,
            archival: false,
            retry: HttpConfig {
                retry_max_attempts: 1,
                retry_backoff_ms: 0,
                ..HttpConfig::default()
            },
        }
    }

    #[must_use]
    pub fn from_config(config: &ToncenterConfig) -> Self {
        Self {
            http: config.http.build_client(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            archival: config.archival,
            retry: config.http.clone(),
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn transactions_url(&self, address: &NormalizedAddress, limit: usize) -> Result<Url> {
        let base = format!("{}/getTransactions", self.api_url.trim_end_matches('/'));
        let url = Url::parse_with_params(
            &base,
            &[
                ("address", address.as_str()),
                ("limit", &limit.to_string()),
                ("archival", if self.archival { "true" } else { "false" }),
            ],
        )?;
        Ok(url)
    }

    async fn get_with_retry(&self, url: Url) -> Result<String> {
        let mut attempt = 0;
        let max_attempts = self.retry.max_attempts();

        loop {
            attempt += 1;
            let mut request = self.http.get(url.clone());
            if let Some(key) = &self.api_key {
                request = request.header(API_KEY_HEADER, key);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    if attempt >= max_attempts || !should_retry(&err) {
                        return Err(err.into());
                    }
                    self.retry.backoff(attempt, &err).await;
                    continue;
                }
            };

            let status = response.status();
            if should_retry_status(status) {
                if attempt >= max_attempts {
                    return Err(TransportError::Unavailable {
                        status: status.as_u16(),
                    }
                    .into());
                }
                self.retry.backoff(attempt, &status).await;
                continue;
            }

            // 4xx bodies still carry the envelope with the error message.
            return Ok(response.text().await?);
        }
    }
}

#[async_trait]
impl TransactionFetcher for ToncenterClient {
    async fn fetch_recent(
        &self,
        address: &NormalizedAddress,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let url = self.transactions_url(address, limit)?;
        debug!(address = %address, limit, "Fetching transactions");
        let body = self.get_with_retry(url).await?;
        let records = parse_transactions(&body)?;
        debug!(count = records.len(), "Fetched transactions");
        Ok(records)
    }

    fn source_name(&self) -> &'static str {
        "toncenter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::normalize;
    use crate::error::Error;
    use crate::testkit::http::{StubResponse, StubServer};

    fn wallet() -> NormalizedAddress {
        normalize(&format!("0:{}", "11".repeat(32))).unwrap()
    }

    const ONE_TX: &str = r#"{"ok": true, "result": [
        {"utime": 1700000000,
         "transaction_id": {"lt": "1", "hash": "h1"},
         "in_msg": {"source": "0:2222222222222222222222222222222222222222222222222222222222222222",
                    "value": "1000000000", "message": ""}}
    ]}"#;

    #[test]
    fn url_carries_query_parameters() {
        let client = ToncenterClient::new("https://toncenter.com/api/v2/");
        let url = client.transactions_url(&wallet(), 10).unwrap();
        assert_eq!(url.path(), "/api/v2/getTransactions");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("address".into(), wallet().to_string())));
        assert!(query.contains(&("limit".into(), "10".into())));
        assert!(query.contains(&("archival".into(), "false".into())));
    }

    #[tokio::test]
    async fn fetches_and_sends_api_key() {
        let server = StubServer::start(vec![StubResponse::json(200, ONE_TX)]).await;
        let client = ToncenterClient::new(server.url()).with_api_key("k-123");

        let records = client.fetch_recent(&wallet(), 5).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hash.as_str(), "h1");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].to_ascii_lowercase().contains("x-api-key: k-123"));
        assert!(requests[0].starts_with("GET /getTransactions?"));
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let server = StubServer::start(vec![
            StubResponse::json(503, "{}"),
            StubResponse::json(200, ONE_TX),
        ])
        .await;
        let config = ToncenterConfig {
            api_url: server.url(),
            http: HttpConfig {
                retry_max_attempts: 2,
                retry_backoff_ms: 0,
                ..HttpConfig::default()
            },
            ..ToncenterConfig::default()
        };
        let client = ToncenterClient::from_config(&config);

        let records = client.fetch_recent(&wallet(), 5).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn exhausted_server_errors_are_unavailable() {
        let server = StubServer::start(vec![StubResponse::json(502, "bad gateway")]).await;
        let client = ToncenterClient::new(server.url());

        let err = client.fetch_recent(&wallet(), 5).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::Unavailable { status: 502 })
        ));
    }

    #[tokio::test]
    async fn not_ok_body_is_transport_error() {
        let server = StubServer::start(vec![StubResponse::json(
            401,
            r#"{"ok": false, "error": "API key does not exist", "code": 401}"#,
        )])
        .await;
        let client = ToncenterClient::new(server.url());

        let err = client.fetch_recent(&wallet(), 5).await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("API key does not exist"));
    }
}
