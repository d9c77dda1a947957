//! One settlement cycle.
//!
//! ```text
//! recover_stale -> fetch -> classify -> reserve -> submit -> settle
//!                                          |          |
//!                                        skip     fail / reject
//! ```
//!
//! Deposits are handled one at a time and independently. A reservation is
//! only attempted after the fetch has returned, and a payout is only
//! submitted after its reservation succeeded.
//!
//! The one exception to deposit independence is a transfer the ledger cannot
//! record: the cycle stops with [`Error::Unrecorded`] because the entry stays
//! `reserved` and stale recovery would otherwise make it payable again.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};

use super::report::{CycleReport, Outcome};
use crate::domain::{
    classify, payout_for, Claim, Classification, Deposit, NormalizedAddress, Rate, TokenAmount,
};
use crate::error::{Error, Result};
use crate::port::{
    PayoutRequest, PayoutSubmitter, SettlementLedger, SubmissionReceipt, TransactionFetcher,
};

/// Attempts at recording a confirmed transfer before the cycle is halted.
const RECORD_ATTEMPTS: u32 = 3;
/// Pause before the second attempt; doubles for each further one.
const RECORD_BACKOFF: std::time::Duration = std::time::Duration::from_millis(200);

/// Fixed inputs for every cycle of a run.
#[derive(Debug, Clone)]
pub struct SettlementSettings {
    /// Wallet being watched for deposits.
    pub watched: NormalizedAddress,
    /// Output-token contract.
    pub token_contract: NormalizedAddress,
    pub rate: Rate,
    pub token_decimals: u32,
    /// Nanotons attached to each outbound transfer.
    pub forward_fee: u64,
    /// How many recent transactions to fetch.
    pub limit: usize,
    /// Reservations older than this are reverted to failed.
    pub reservation_timeout: Duration,
    /// Prefix for the transfer memo; the deposit hash is appended.
    pub memo_prefix: Option<String>,
    pub dry_run: bool,
}

/// Runs settlement cycles against one ledger.
pub struct Settler<L> {
    fetcher: Arc<dyn TransactionFetcher>,
    ledger: Arc<L>,
    submitter: Arc<dyn PayoutSubmitter>,
    settings: SettlementSettings,
}

impl<L: SettlementLedger> Settler<L> {
    pub fn new(
        fetcher: Arc<dyn TransactionFetcher>,
        ledger: Arc<L>,
        submitter: Arc<dyn PayoutSubmitter>,
        settings: SettlementSettings,
    ) -> Self {
        Self {
            fetcher,
            ledger,
            submitter,
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &SettlementSettings {
        &self.settings
    }

    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Run one cycle.
    ///
    /// A failed fetch is recorded in the report rather than returned, so the
    /// caller sees a cycle with zero records.
    ///
    /// # Errors
    ///
    /// Returns an error if stale-reservation recovery fails, which means the
    /// ledger itself is unusable, or [`Error::Unrecorded`] if a sent transfer
    /// could not be recorded. Deposits after the unrecorded one are left for
    /// a later run.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::new(self.settings.dry_run);

        if !self.settings.dry_run {
            report.recovered = self
                .ledger
                .recover_stale(self.settings.reservation_timeout)
                .await?;
            if report.recovered > 0 {
                warn!(count = report.recovered, "Reverted stale reservations to failed");
            }
        }

        let records = match self
            .fetcher
            .fetch_recent(&self.settings.watched, self.settings.limit)
            .await
        {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    cycle = %report.cycle_id,
                    source = self.fetcher.source_name(),
                    reason = %err,
                    "Fetch failed, skipping cycle"
                );
                report.fetch_error = Some(err.to_string());
                report.finished_at = Utc::now();
                return Ok(report);
            }
        };
        report.fetched = records.len();
        debug!(count = records.len(), "Fetched transactions");

        for tx in &records {
            let outcome = match classify(tx, &self.settings.watched) {
                Classification::Rejected(reason) => {
                    debug!(hash = %tx.hash, reason = %reason, "Not a deposit");
                    Outcome::Ignored { reason }
                }
                Classification::Deposit(deposit) => self.settle(&deposit).await?,
            };
            report.push(tx.hash.clone(), outcome);
        }

        report.finished_at = Utc::now();
        info!(
            cycle = %report.cycle_id,
            fetched = report.fetched,
            ignored = report.ignored(),
            skipped = report.skipped(),
            settled = report.settled(),
            failed = report.failed(),
            rejected = report.rejected(),
            dry_run = report.dry_run,
            "Cycle complete"
        );
        Ok(report)
    }

    async fn settle(&self, deposit: &Deposit) -> Result<Outcome> {
        let hash = &deposit.hash;
        let sender = &deposit.sender;

        let payout = match payout_for(deposit.value, self.settings.rate, self.settings.token_decimals) {
            Ok(payout) => payout,
            Err(err) => {
                warn!(hash = %hash, sender = %sender, reason = %err, "Payout computation failed");
                return Ok(Outcome::Failed {
                    error: err.to_string(),
                });
            }
        };

        if self.settings.dry_run {
            return Ok(self.preview(deposit, payout).await);
        }

        match self.ledger.reserve(&Claim::new(deposit, payout)).await {
            Ok(true) => {}
            Ok(false) => {
                let state = self.ledger.get(hash).await.ok().flatten().map(|e| e.state);
                debug!(hash = %hash, state = ?state, "Already handled, skipping");
                return Ok(Outcome::Skipped { state });
            }
            Err(err) => {
                warn!(hash = %hash, sender = %sender, reason = %err, "Reservation failed");
                return Ok(Outcome::Failed {
                    error: err.to_string(),
                });
            }
        }

        let request = PayoutRequest {
            deposit: hash.clone(),
            destination: sender.clone(),
            amount: payout,
            token_contract: self.settings.token_contract.clone(),
            forward_fee: self.settings.forward_fee,
            memo: Some(match &self.settings.memo_prefix {
                Some(prefix) => format!("{prefix} {hash}"),
                None => hash.to_string(),
            }),
        };

        match self.submitter.submit(&request).await {
            Ok(receipt) => {
                self.record_settled(deposit, &receipt).await?;
                info!(
                    hash = %hash,
                    sender = %sender,
                    ton = %deposit.ton_amount,
                    payout = %payout,
                    external_ref = %receipt.external_ref,
                    "Deposit settled"
                );
                Ok(Outcome::Settled {
                    sender: sender.clone(),
                    ton_amount: deposit.ton_amount,
                    payout,
                    external_ref: receipt.external_ref,
                })
            }
            Err(Error::RejectedByNetwork(reason)) => {
                warn!(hash = %hash, sender = %sender, reason = %reason, "Transfer rejected");
                if let Err(err) = self.ledger.mark_rejected(hash, &reason).await {
                    error!(hash = %hash, reason = %err, "Failed to record rejection");
                }
                Ok(Outcome::Rejected { error: reason })
            }
            Err(err) => {
                warn!(hash = %hash, sender = %sender, reason = %err, "Transfer failed, will retry");
                let reason = err.to_string();
                if let Err(err) = self.ledger.mark_failed(hash, &reason).await {
                    error!(hash = %hash, reason = %err, "Failed to record failure");
                }
                Ok(Outcome::Failed { error: reason })
            }
        }
    }

    /// Dry-run view of a deposit: what a live cycle would do with it, read
    /// from the ledger without claiming anything.
    async fn preview(&self, deposit: &Deposit, payout: TokenAmount) -> Outcome {
        let hash = &deposit.hash;
        match self.ledger.get(hash).await {
            Ok(Some(entry)) if !entry.state.is_reservable() => {
                debug!(hash = %hash, state = %entry.state, "Already handled, skipping");
                return Outcome::Skipped {
                    state: Some(entry.state),
                };
            }
            Ok(_) => {}
            Err(err) => {
                warn!(hash = %hash, sender = %deposit.sender, reason = %err, "Ledger lookup failed");
                return Outcome::Failed {
                    error: err.to_string(),
                };
            }
        }

        info!(
            hash = %hash,
            sender = %deposit.sender,
            ton = %deposit.ton_amount,
            payout = %payout,
            "Dry-run: would pay deposit"
        );
        Outcome::Previewed {
            sender: deposit.sender.clone(),
            ton_amount: deposit.ton_amount,
            payout,
        }
    }

    /// `reserved -> settled` for a confirmed transfer, retried with backoff.
    async fn record_settled(&self, deposit: &Deposit, receipt: &SubmissionReceipt) -> Result<()> {
        let hash = &deposit.hash;
        let mut delay = RECORD_BACKOFF;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.ledger.mark_settled(hash, &receipt.external_ref).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            if attempt >= RECORD_ATTEMPTS {
                error!(
                    hash = %hash,
                    sender = %deposit.sender,
                    external_ref = %receipt.external_ref,
                    reason = %err,
                    "Transfer sent but not recorded, halting settlement"
                );
                return Err(Error::Unrecorded {
                    hash: hash.to_string(),
                    external_ref: receipt.external_ref.clone(),
                    reason: err.to_string(),
                });
            }
            warn!(
                hash = %hash,
                external_ref = %receipt.external_ref,
                attempt,
                reason = %err,
                "Recording settlement failed, retrying"
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }
}
