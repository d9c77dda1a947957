//! toncenter v2 response types.

use chrono::DateTime;
use serde::Deserialize;

use crate::domain::{TransactionRecord, TxHash};
use crate::error::TransportError;

/// Envelope wrapping every toncenter v2 response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, turning `ok: false` into a transport error.
    pub fn into_result(self) -> Result<T, TransportError> {
        if !self.ok {
            return Err(TransportError::NotOk {
                code: self.code,
                message: self.error.unwrap_or_else(|| "no error message".into()),
            });
        }
        self.result
            .ok_or_else(|| TransportError::Malformed("ok response without result".into()))
    }
}

/// `raw.transaction` as returned by `getTransactions`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub utime: i64,
    pub transaction_id: RawTransactionId,
    #[serde(default)]
    pub in_msg: Option<RawMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTransactionId {
    pub lt: String,
    pub hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TryFrom<RawTransaction> for TransactionRecord {
    type Error = TransportError;

    fn try_from(tx: RawTransaction) -> Result<Self, Self::Error> {
        let lt = tx.transaction_id.lt.parse().map_err(|_| {
            TransportError::Malformed(format!("transaction lt '{}'", tx.transaction_id.lt))
        })?;
        let timestamp = DateTime::from_timestamp(tx.utime, 0)
            .ok_or_else(|| TransportError::Malformed(format!("transaction utime {}", tx.utime)))?;
        let (source, value, comment) = match tx.in_msg {
            Some(msg) => (non_empty(msg.source), msg.value, non_empty(msg.message)),
            None => (None, None, None),
        };

        Ok(Self {
            hash: TxHash::new(tx.transaction_id.hash),
            lt,
            source,
            value,
            timestamp,
            comment,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Decode a `getTransactions` body into records.
///
/// # Errors
///
/// Returns [`TransportError::Malformed`] for undecodable bodies and
/// [`TransportError::NotOk`] for `ok: false` envelopes.
pub fn parse_transactions(body: &str) -> Result<Vec<TransactionRecord>, TransportError> {
    let envelope: Envelope<Vec<RawTransaction>> =
        serde_json::from_str(body).map_err(|e| TransportError::Malformed(e.to_string()))?;
    envelope
        .into_result()?
        .into_iter()
        .map(TransactionRecord::try_from)
        .collect()
}
