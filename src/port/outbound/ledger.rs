//! Settlement ledger port.
//!
//! The ledger is the only durable state in the system and the single source
//! of truth for "has this deposit been paid". Transaction sources are
//! re-polled from scratch every cycle, so losing ledger state means paying
//! the whole polling window again.

use std::future::Future;

use chrono::Duration;

use crate::domain::{Claim, SettlementEntry, SettlementState, TxHash};
use crate::error::Result;

/// Selection for [`SettlementLedger::list`].
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub state: Option<SettlementState>,
    pub limit: Option<usize>,
}

/// Storage operations for settlement entries.
pub trait SettlementLedger: Send + Sync {
    /// Atomically claim a deposit for payout.
    ///
    /// Succeeds for unseen and `failed` hashes; returns `false` without
    /// side effects for `reserved`, `settled` and `rejected` ones. Of two
    /// concurrent callers for the same hash exactly one sees `true`.
    fn reserve(&self, claim: &Claim) -> impl Future<Output = Result<bool>> + Send;

    /// `reserved -> settled`, recording the submitter's reference.
    fn mark_settled(
        &self,
        hash: &TxHash,
        external_ref: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// `reserved -> failed`; the next cycle may reserve it again.
    fn mark_failed(&self, hash: &TxHash, reason: &str) -> impl Future<Output = Result<()>> + Send;

    /// `reserved -> rejected`; excluded from retries until released.
    fn mark_rejected(&self, hash: &TxHash, reason: &str)
        -> impl Future<Output = Result<()>> + Send;

    /// `rejected -> failed` after operator review.
    fn release(&self, hash: &TxHash) -> impl Future<Output = Result<()>> + Send;

    /// Revert reservations older than `older_than` to `failed`. Returns the
    /// number of entries recovered.
    fn recover_stale(&self, older_than: Duration) -> impl Future<Output = Result<usize>> + Send;

    fn get(&self, hash: &TxHash) -> impl Future<Output = Result<Option<SettlementEntry>>> + Send;

    /// Entries ordered by most recent update first.
    fn list(&self, filter: &LedgerFilter)
        -> impl Future<Output = Result<Vec<SettlementEntry>>> + Send;
}
