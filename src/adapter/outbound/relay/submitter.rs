//! Jetton transfers through the HTTP relay.
//!
//! The relay owns message encoding, seqno handling and broadcast. We send a
//! signed JSON description of the transfer and get back an external
//! reference, or a refusal.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::settings::RelayConfig;
use super::signer::OperatorKey;
use crate::adapter::outbound::http::{should_retry, HttpConfig};
use crate::domain::NormalizedAddress;
use crate::error::{Error, Result, TransportError};
use crate::port::outbound::submitter::{PayoutRequest, PayoutSubmitter, SubmissionReceipt};

const TRANSFERS_PATH: &str = "/v1/transfers";
const PUBLIC_KEY_HEADER: &str = "X-Public-Key";
const SIGNATURE_HEADER: &str = "X-Signature";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Body posted to the relay.
#[derive(Debug, Serialize)]
struct TransferBody<'a> {
    wallet: &'a str,
    destination: &'a str,
    token_contract: &'a str,
    /// Minor units, as a string to survive JSON number limits.
    amount: String,
    forward_fee: String,
    deposit_hash: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    memo: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    ok: bool,
    #[serde(default)]
    transfer_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// [`PayoutSubmitter`] backed by the transfer relay.
pub struct RelaySubmitter {
    http: HttpClient,
    url: String,
    wallet: NormalizedAddress,
    key: OperatorKey,
    retry: HttpConfig,
}

impl RelaySubmitter {
    #[must_use]
    pub fn from_config(config: &RelayConfig, wallet: NormalizedAddress, key: OperatorKey) -> Self {
        Self {
            http: config.http.build_client(),
            url: format!("{}{TRANSFERS_PATH}", config.url.trim_end_matches('/')),
            wallet,
            key,
            retry: config.http.clone(),
        }
    }

    fn body(&self, request: &PayoutRequest) -> Result<Vec<u8>> {
        let body = TransferBody {
            wallet: self.wallet.as_str(),
            destination: request.destination.as_str(),
            token_contract: request.token_contract.as_str(),
            amount: request.amount.minor().to_string(),
            forward_fee: request.forward_fee.to_string(),
            deposit_hash: request.deposit.as_str(),
            memo: request.memo.as_deref(),
        };
        Ok(serde_json::to_vec(&body)?)
    }

    async fn post_with_retry(&self, request: &PayoutRequest, body: Vec<u8>) -> Result<(u16, String)> {
        let signature = self.key.sign(&body);
        let mut attempt = 0;
        let max_attempts = self.retry.max_attempts();

        loop {
            attempt += 1;
            let response = self
                .http
                .post(&self.url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .header(PUBLIC_KEY_HEADER, self.key.public_key_hex())
                .header(SIGNATURE_HEADER, &signature)
                .header(IDEMPOTENCY_HEADER, request.deposit.as_str())
                .body(body.clone())
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status().as_u16();
                    return Ok((status, response.text().await?));
                }
                Err(err) => {
                    // The idempotency key lets the relay drop a duplicate.
                    if attempt >= max_attempts || !should_retry(&err) {
                        return Err(err.into());
                    }
                    self.retry.backoff(attempt, &err).await;
                }
            }
        }
    }
}

/// Map a relay reply to a receipt or the appropriate failure kind.
fn interpret(status: u16, body: &str) -> Result<SubmissionReceipt> {
    if status >= 500 {
        return Err(TransportError::Unavailable { status }.into());
    }

    let parsed: Option<TransferResponse> = serde_json::from_str(body).ok();
    if (400..500).contains(&status) {
        let reason = parsed
            .and_then(|r| r.error)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(Error::RejectedByNetwork(reason));
    }

    let Some(parsed) = parsed else {
        return Err(TransportError::Malformed(format!("relay body: {body}")).into());
    };
    if !parsed.ok {
        return Err(Error::RejectedByNetwork(
            parsed.error.unwrap_or_else(|| "relay refused transfer".into()),
        ));
    }
    parsed
        .transfer_id
        .map(|external_ref| SubmissionReceipt { external_ref })
        .ok_or_else(|| TransportError::Malformed("relay accepted without transfer_id".into()).into())
}

#[async_trait]
impl PayoutSubmitter for RelaySubmitter {
    async fn submit(&self, request: &PayoutRequest) -> Result<SubmissionReceipt> {
        debug!(
            hash = %request.deposit,
            destination = %request.destination,
            amount = %request.amount,
            "Submitting transfer to relay"
        );
        let body = self.body(request)?;
        let (status, text) = self.post_with_retry(request, body).await?;
        let receipt = interpret(status, &text)?;
        info!(
            hash = %request.deposit,
            external_ref = %receipt.external_ref,
            "Relay accepted transfer"
        );
        Ok(receipt)
    }

    fn submitter_name(&self) -> &'static str {
        "relay"
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    use super::*;
    use crate::domain::{normalize, TokenAmount, TxHash};
    use crate::testkit::http::{StubResponse, StubServer};

    const SECRET: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    fn addr(byte: &str) -> NormalizedAddress {
        normalize(&format!("0:{}", byte.repeat(32))).unwrap()
    }

    fn request() -> PayoutRequest {
        PayoutRequest {
            deposit: TxHash::from("h1"),
            destination: addr("22"),
            amount: TokenAmount::from_minor(20_000_000_000_000, 9),
            token_contract: addr("33"),
            forward_fee: 50_000_000,
            memo: Some("deposit h1".into()),
        }
    }

    fn submitter(url: String) -> RelaySubmitter {
        let config = RelayConfig {
            url,
            http: HttpConfig {
                retry_max_attempts: 1,
                retry_backoff_ms: 0,
                ..HttpConfig::default()
            },
        };
        RelaySubmitter::from_config(&config, addr("11"), OperatorKey::from_hex(SECRET).unwrap())
    }

    #[test]
    fn interpret_classifies_replies() {
        let ok = interpret(200, r#"{"ok": true, "transfer_id": "t-1"}"#).unwrap();
        assert_eq!(ok.external_ref, "t-1");

        assert!(matches!(
            interpret(200, r#"{"ok": false, "error": "insufficient balance"}"#),
            Err(Error::RejectedByNetwork(reason)) if reason == "insufficient balance"
        ));
        assert!(matches!(
            interpret(422, "not json"),
            Err(Error::RejectedByNetwork(reason)) if reason == "HTTP 422"
        ));
        assert!(interpret(503, "").unwrap_err().is_transport());
        assert!(interpret(200, "<html>").unwrap_err().is_transport());
        assert!(interpret(200, r#"{"ok": true}"#).unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn posts_signed_body_and_returns_receipt() {
        let server = StubServer::start(vec![StubResponse::json(
            200,
            r#"{"ok": true, "transfer_id": "relay-7"}"#,
        )])
        .await;
        let submitter = submitter(server.url());

        let receipt = submitter.submit(&request()).await.unwrap();
        assert_eq!(receipt.external_ref, "relay-7");

        let raw = server.requests().remove(0);
        assert!(raw.starts_with("POST /v1/transfers"));
        let lower = raw.to_ascii_lowercase();
        assert!(lower.contains("idempotency-key: h1"));

        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["amount"], "20000000000000");
        assert_eq!(json["forward_fee"], "50000000");
        assert_eq!(json["destination"], addr("22").as_str());
        assert_eq!(json["deposit_hash"], "h1");

        let key = OperatorKey::from_hex(SECRET).unwrap();
        let expected = key.sign(body.as_bytes());
        assert!(BASE64.decode(&expected).is_ok());
        assert!(raw.contains(&expected));
    }

    #[tokio::test]
    async fn client_errors_are_rejections() {
        let server = StubServer::start(vec![StubResponse::json(
            400,
            r#"{"ok": false, "error": "destination is not a wallet"}"#,
        )])
        .await;
        let err = submitter(server.url()).submit(&request()).await.unwrap_err();
        assert!(matches!(err, Error::RejectedByNetwork(_)));
    }

    #[tokio::test]
    async fn server_errors_are_transport() {
        let server = StubServer::start(vec![StubResponse::json(500, "")]).await;
        let err = submitter(server.url()).submit(&request()).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn unreachable_relay_is_transport() {
        let server = StubServer::start(Vec::new()).await;
        let url = server.url();
        drop(server);
        let err = submitter(url).submit(&request()).await.unwrap_err();
        assert!(err.is_transport());
    }
}
