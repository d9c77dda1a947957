//! Settlement entries and their lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::address::NormalizedAddress;
use super::deposit::Deposit;
use super::payout::TokenAmount;
use super::transaction::TxHash;

/// Payout state of one deposit.
///
/// ```text
/// (unseen) -> Reserved -> Settled
///                 |
///                 +-> Failed   -> Reserved   (next cycle)
///                 +-> Rejected -> Failed     (operator release)
/// ```
///
/// Stale `Reserved` entries are recovered to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementState {
    /// Payout in flight.
    Reserved,
    /// Payout confirmed by the submitter.
    Settled,
    /// Attempt errored before reaching the network; retried next cycle.
    Failed,
    /// Network refused the transfer; held for operator review.
    Rejected,
}

impl SettlementState {
    pub const ALL: [Self; 4] = [Self::Reserved, Self::Settled, Self::Failed, Self::Rejected];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Settled => "settled",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }

    /// Whether a new reservation may claim an entry in this state.
    #[must_use]
    pub const fn is_reservable(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Whether `self -> next` is a legal ledger transition.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Reserved, Self::Settled | Self::Failed | Self::Rejected)
                | (Self::Failed, Self::Reserved)
                | (Self::Rejected, Self::Failed)
        )
    }
}

impl fmt::Display for SettlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettlementState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown settlement state '{s}'"))
    }
}

/// What a reservation records about the deposit it claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub hash: TxHash,
    pub sender: NormalizedAddress,
    pub ton_amount: Decimal,
    pub payout: TokenAmount,
}

impl Claim {
    #[must_use]
    pub fn new(deposit: &Deposit, payout: TokenAmount) -> Self {
        Self {
            hash: deposit.hash.clone(),
            sender: deposit.sender.clone(),
            ton_amount: deposit.ton_amount,
            payout,
        }
    }
}

/// Ledger row for one deposit hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementEntry {
    pub hash: TxHash,
    pub state: SettlementState,
    pub sender: String,
    pub ton_amount: Decimal,
    /// Payout in output-token minor units.
    pub payout_minor: u128,
    pub attempts: u32,
    pub external_ref: Option<String>,
    pub last_error: Option<String>,
    pub reserved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_failed_entries_are_reservable_again() {
        assert!(SettlementState::Failed.is_reservable());
        assert!(!SettlementState::Reserved.is_reservable());
        assert!(!SettlementState::Settled.is_reservable());
        assert!(!SettlementState::Rejected.is_reservable());
    }

    #[test]
    fn settled_is_terminal() {
        for next in SettlementState::ALL {
            assert!(!SettlementState::Settled.can_transition_to(next));
        }
    }

    #[test]
    fn reserved_moves_to_every_outcome() {
        assert!(SettlementState::Reserved.can_transition_to(SettlementState::Settled));
        assert!(SettlementState::Reserved.can_transition_to(SettlementState::Failed));
        assert!(SettlementState::Reserved.can_transition_to(SettlementState::Rejected));
        assert!(!SettlementState::Reserved.can_transition_to(SettlementState::Reserved));
        assert!(!SettlementState::Failed.can_transition_to(SettlementState::Settled));
    }

    #[test]
    fn state_parses_case_insensitively() {
        assert_eq!("Settled".parse::<SettlementState>(), Ok(SettlementState::Settled));
        assert_eq!(" failed ".parse::<SettlementState>(), Ok(SettlementState::Failed));
        assert!("done".parse::<SettlementState>().is_err());
        for state in SettlementState::ALL {
            assert_eq!(state.as_str().parse::<SettlementState>(), Ok(state));
        }
    }
}
