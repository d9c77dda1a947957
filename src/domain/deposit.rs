//! Deposit classification.
//!
//! Decides which fetched transactions are creditable deposits. The rules
//! run in a fixed order and the first failing rule names the rejection:
//!
//! 1. the inbound value must be present and a positive integer
//! 2. the sender must parse as an account address
//! 3. the sender must not be the watched wallet itself
//!
//! Everything that survives becomes a [`Deposit`] with its amount converted
//! from nanotons to TON.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::address::{normalize, NormalizedAddress};
use super::transaction::{TransactionRecord, TxHash};

/// Number of decimal places between nanotons and TON.
pub const TON_DECIMALS: u32 = 9;

/// A creditable inbound transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deposit {
    pub hash: TxHash,
    pub sender: NormalizedAddress,
    /// Amount received in nanotons; always positive.
    pub value: u64,
    /// Amount received in TON.
    pub ton_amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub comment: Option<String>,
}

/// Why a record is not a deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    MissingValue,
    InvalidValue { value: String },
    NonPositiveValue { value: String },
    InvalidSender { source: Option<String>, detail: String },
    SelfTransfer,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValue => write!(f, "no inbound value"),
            Self::InvalidValue { value } => write!(f, "value '{value}' is not an integer"),
            Self::NonPositiveValue { value } => write!(f, "value {value} is not positive"),
            Self::InvalidSender { source: None, .. } => write!(f, "no sender"),
            Self::InvalidSender {
                source: Some(source),
                detail,
            } => write!(f, "sender '{source}' is invalid: {detail}"),
            Self::SelfTransfer => write!(f, "sent from the watched wallet"),
        }
    }
}

/// Outcome of classifying one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Deposit(Deposit),
    Rejected(RejectReason),
}

impl Classification {
    #[must_use]
    pub const fn is_deposit(&self) -> bool {
        matches!(self, Self::Deposit(_))
    }
}

/// Classify a fetched record against the watched wallet.
#[must_use]
pub fn classify(tx: &TransactionRecord, watched: &NormalizedAddress) -> Classification {
    let value = match parse_value(tx.value.as_deref()) {
        Ok(value) => value,
        Err(reason) => return Classification::Rejected(reason),
    };

    let sender = match tx.source.as_deref().map(normalize) {
        Some(Ok(sender)) => sender,
        Some(Err(err)) => {
            return Classification::Rejected(RejectReason::InvalidSender {
                source: tx.source.clone(),
                detail: err.to_string(),
            })
        }
        None => {
            return Classification::Rejected(RejectReason::InvalidSender {
                source: None,
                detail: "external message".into(),
            })
        }
    };

    if &sender == watched {
        return Classification::Rejected(RejectReason::SelfTransfer);
    }

    Classification::Deposit(Deposit {
        hash: tx.hash.clone(),
        sender,
        value,
        ton_amount: nano_to_ton(value),
        timestamp: tx.timestamp,
        comment: tx.comment.clone(),
    })
}

fn parse_value(raw: Option<&str>) -> Result<u64, RejectReason> {
    let raw = raw.map(str::trim).ok_or(RejectReason::MissingValue)?;
    if raw.is_empty() {
        return Err(RejectReason::MissingValue);
    }
    let parsed: i128 = raw.parse().map_err(|_| RejectReason::InvalidValue {
        value: raw.to_string(),
    })?;
    if parsed <= 0 {
        return Err(RejectReason::NonPositiveValue {
            value: raw.to_string(),
        });
    }
    u64::try_from(parsed).map_err(|_| RejectReason::InvalidValue {
        value: raw.to_string(),
    })
}

/// Exact nanoton to TON conversion.
#[must_use]
pub fn nano_to_ton(value: u64) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(value), TON_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn watched() -> NormalizedAddress {
        normalize(&format!("0:{}", "11".repeat(32))).unwrap()
    }

    fn sender_raw() -> String {
        format!("0:{}", "22".repeat(32))
    }

    fn record(source: Option<&str>, value: Option<&str>) -> TransactionRecord {
        TransactionRecord {
            hash: TxHash::from("h1"),
            lt: 1,
            source: source.map(str::to_string),
            value: value.map(str::to_string),
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            comment: None,
        }
    }

    #[test]
    fn accepts_plain_deposit() {
        let sender = sender_raw();
        let result = classify(&record(Some(&sender), Some("1000000000")), &watched());

        let Classification::Deposit(deposit) = result else {
            panic!("expected deposit");
        };
        assert_eq!(deposit.sender, normalize(&sender).unwrap());
        assert_eq!(deposit.value, 1_000_000_000);
        assert_eq!(deposit.ton_amount, dec!(1.0));
    }

    #[test]
    fn converts_fractional_amounts_exactly() {
        let sender = sender_raw();
        let Classification::Deposit(deposit) =
            classify(&record(Some(&sender), Some("1")), &watched())
        else {
            panic!("expected deposit");
        };
        assert_eq!(deposit.ton_amount, dec!(0.000000001));
    }

    #[test]
    fn rejects_missing_or_empty_value() {
        let sender = sender_raw();
        assert_eq!(
            classify(&record(Some(&sender), None), &watched()),
            Classification::Rejected(RejectReason::MissingValue)
        );
        assert_eq!(
            classify(&record(Some(&sender), Some("  ")), &watched()),
            Classification::Rejected(RejectReason::MissingValue)
        );
    }

    #[test]
    fn rejects_zero_negative_and_non_integer_values() {
        let sender = sender_raw();
        for value in ["0", "-1", "-1000000000"] {
            let result = classify(&record(Some(&sender), Some(value)), &watched());
            assert!(
                matches!(
                    result,
                    Classification::Rejected(RejectReason::NonPositiveValue { .. })
                ),
                "{value}: {result:?}"
            );
        }
        for value in ["1.5", "abc", "1e9", "99999999999999999999999"] {
            let result = classify(&record(Some(&sender), Some(value)), &watched());
            assert!(
                matches!(
                    result,
                    Classification::Rejected(RejectReason::InvalidValue { .. })
                ),
                "{value}: {result:?}"
            );
        }
    }

    #[test]
    fn value_is_checked_before_sender() {
        let result = classify(&record(Some("garbage"), Some("0")), &watched());
        assert!(matches!(
            result,
            Classification::Rejected(RejectReason::NonPositiveValue { .. })
        ));
    }

    #[test]
    fn rejects_unparseable_or_missing_sender() {
        let result = classify(&record(Some("garbage"), Some("5")), &watched());
        assert!(matches!(
            result,
            Classification::Rejected(RejectReason::InvalidSender { source: Some(_), .. })
        ));

        let result = classify(&record(None, Some("5")), &watched());
        assert!(matches!(
            result,
            Classification::Rejected(RejectReason::InvalidSender { source: None, .. })
        ));
    }

    #[test]
    fn rejects_self_transfer_in_any_spelling() {
        let watched = watched();
        let raw = format!("0:{}", "11".repeat(32));
        let non_bounceable = crate::domain::address::friendly_with_tag(&raw, 0x51);

        for spelling in [raw.as_str(), watched.as_str(), non_bounceable.as_str()] {
            assert_eq!(
                classify(&record(Some(spelling), Some("1000")), &watched),
                Classification::Rejected(RejectReason::SelfTransfer),
                "{spelling}"
            );
        }
    }

    #[test]
    fn reject_reasons_read_well_in_logs() {
        assert_eq!(RejectReason::MissingValue.to_string(), "no inbound value");
        assert_eq!(
            RejectReason::NonPositiveValue { value: "0".into() }.to_string(),
            "value 0 is not positive"
        );
        assert_eq!(
            RejectReason::SelfTransfer.to_string(),
            "sent from the watched wallet"
        );
    }
}
