//! Per-cycle outcome summary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{NormalizedAddress, RejectReason, SettlementState, TokenAmount, TxHash};

/// What happened to one fetched transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Not a creditable deposit.
    Ignored { reason: RejectReason },
    /// Already reserved, settled or held for review.
    Skipped { state: Option<SettlementState> },
    /// Dry run: what would have been paid.
    Previewed {
        sender: NormalizedAddress,
        ton_amount: Decimal,
        payout: TokenAmount,
    },
    Settled {
        sender: NormalizedAddress,
        ton_amount: Decimal,
        payout: TokenAmount,
        external_ref: String,
    },
    /// Retryable on a later cycle.
    Failed { error: String },
    /// Refused by the network; held until released by an operator.
    Rejected { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositOutcome {
    pub hash: TxHash,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Summary of one fetch-classify-settle cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Correlates the cycle's log lines with its report.
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Stale reservations reverted before fetching.
    pub recovered: usize,
    pub fetched: usize,
    /// Set when the fetch itself failed; the cycle then has no outcomes.
    pub fetch_error: Option<String>,
    pub outcomes: Vec<DepositOutcome>,
}

impl CycleReport {
    pub(crate) fn new(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            cycle_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            dry_run,
            recovered: 0,
            fetched: 0,
            fetch_error: None,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, hash: TxHash, outcome: Outcome) {
        self.outcomes.push(DepositOutcome { hash, outcome });
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }

    #[must_use]
    pub fn ignored(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Ignored { .. }))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    #[must_use]
    pub fn previewed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Previewed { .. }))
    }

    #[must_use]
    pub fn settled(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Settled { .. }))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    #[must_use]
    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Rejected { .. }))
    }

    /// The fetch failed or at least one payout did not go through.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.fetch_error.is_some() || self.failed() > 0 || self.rejected() > 0
    }

    /// Outcome for a hash, if the cycle saw it.
    #[must_use]
    pub fn outcome(&self, hash: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.hash.as_str() == hash)
            .map(|o| &o.outcome)
    }
}
