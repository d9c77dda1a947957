//! Builders for domain primitives used across tests.

use chrono::{DateTime, Utc};

use crate::domain::{normalize, NormalizedAddress, TransactionRecord, TxHash};

/// Raw form of the watched wallet used in tests.
pub const WALLET_RAW: &str = "0:1111111111111111111111111111111111111111111111111111111111111111";
/// Raw form of a depositor.
pub const SENDER_RAW: &str = "0:2222222222222222222222222222222222222222222222222222222222222222";
/// Raw form of a second depositor.
pub const OTHER_SENDER_RAW: &str =
    "0:4444444444444444444444444444444444444444444444444444444444444444";
/// Raw form of the output-token contract.
pub const TOKEN_RAW: &str = "0:3333333333333333333333333333333333333333333333333333333333333333";

/// Normalized watched wallet.
pub fn wallet() -> NormalizedAddress {
    address(WALLET_RAW)
}

/// Normalized output-token contract.
pub fn token_contract() -> NormalizedAddress {
    address(TOKEN_RAW)
}

/// Normalize an address that is known to be valid.
///
/// # Panics
///
/// Panics if `raw` does not parse.
pub fn address(raw: &str) -> NormalizedAddress {
    normalize(raw).unwrap_or_else(|err| panic!("test address {raw}: {err}"))
}

/// A record with full control over the optional fields.
pub fn record(hash: &str, source: Option<&str>, value: Option<&str>) -> TransactionRecord {
    TransactionRecord {
        hash: TxHash::from(hash),
        lt: 1,
        source: source.map(str::to_string),
        value: value.map(str::to_string),
        timestamp: timestamp(1_700_000_000),
        comment: None,
    }
}

/// An inbound transfer of `value` nanotons from `source`.
pub fn deposit_record(hash: &str, source: &str, value: &str) -> TransactionRecord {
    record(hash, Some(source), Some(value))
}

/// # Panics
///
/// Panics on out-of-range seconds.
pub fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(|| panic!("timestamp {secs}"))
}
