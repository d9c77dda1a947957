//! Transaction records as delivered by the transaction source.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction hash - newtype for type safety.
///
/// Unique within the source's retention window and used as the settlement
/// ledger key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TxHash {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for TxHash {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One transaction touching the watched account.
///
/// Immutable and discarded after the cycle that fetched it. `source` and
/// `value` are kept exactly as the upstream API reported them; deciding
/// whether they are usable is the deposit filter's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub hash: TxHash,
    /// Logical time of the transaction.
    pub lt: u64,
    /// Sender of the inbound message, absent for external messages.
    pub source: Option<String>,
    /// Inbound value in nanotons as a decimal string.
    pub value: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Text comment attached to the inbound message.
    pub comment: Option<String>,
}
