//! Test doubles for the settlement ports.
//!
//! - [`ScriptedFetcher`] - Returns queued batches (or errors) in order, then
//!   empty batches.
//! - [`RecordingSubmitter`] - Records every request and fails on chosen
//!   call numbers.
//! - [`FlakyLedger`] - In-memory ledger whose `mark_settled` fails a set
//!   number of times.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use parking_lot::Mutex;

use super::domain::token_contract;
use crate::adapter::outbound::memory::MemoryLedger;
use crate::application::settlement::SettlementSettings;
use crate::domain::{Claim, NormalizedAddress, Rate, SettlementEntry, TransactionRecord, TxHash};
use crate::error::{Error, Result, TransportError};
use crate::port::{
    LedgerFilter, PayoutRequest, PayoutSubmitter, SettlementLedger, SubmissionReceipt,
    TransactionFetcher,
};

/// Settings with the default rate, 9 token decimals and no dry run.
pub fn settings(watched: NormalizedAddress) -> SettlementSettings {
    SettlementSettings {
        watched,
        token_contract: token_contract(),
        rate: Rate::default(),
        token_decimals: 9,
        forward_fee: 50_000_000,
        limit: 10,
        reservation_timeout: Duration::minutes(10),
        memo_prefix: None,
        dry_run: false,
    }
}

enum Scripted {
    Batch(Vec<TransactionRecord>),
    Error(String),
}

/// A fetcher that replays queued responses.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicU32,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch(self, batch: Vec<TransactionRecord>) -> Self {
        self.script.lock().push_back(Scripted::Batch(batch));
        self
    }

    /// Queue an `ok: false` style failure.
    pub fn with_error(self, message: &str) -> Self {
        self.script
            .lock()
            .push_back(Scripted::Error(message.to_string()));
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionFetcher for ScriptedFetcher {
    async fn fetch_recent(
        &self,
        _address: &NormalizedAddress,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().pop_front() {
            Some(Scripted::Batch(mut batch)) => {
                batch.truncate(limit);
                Ok(batch)
            }
            Some(Scripted::Error(message)) => Err(TransportError::NotOk {
                code: None,
                message,
            }
            .into()),
            None => Ok(Vec::new()),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A submitter that records requests and fails on chosen calls.
///
/// Call numbers are 1-based and count every `submit`.
#[derive(Default)]
pub struct RecordingSubmitter {
    requests: Mutex<Vec<PayoutRequest>>,
    transport_failures: HashSet<u32>,
    rejections: HashSet<u32>,
    calls: AtomicU32,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given calls with a transport error.
    pub fn fail_transport_on(mut self, calls: &[u32]) -> Self {
        self.transport_failures.extend(calls);
        self
    }

    /// Fail the given calls with a network rejection.
    pub fn reject_on(mut self, calls: &[u32]) -> Self {
        self.rejections.extend(calls);
        self
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<PayoutRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PayoutSubmitter for RecordingSubmitter {
    async fn submit(&self, request: &PayoutRequest) -> Result<SubmissionReceipt> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request.clone());

        if self.transport_failures.contains(&call) {
            return Err(TransportError::Unavailable { status: 503 }.into());
        }
        if self.rejections.contains(&call) {
            return Err(Error::RejectedByNetwork("bounced".into()));
        }
        Ok(SubmissionReceipt {
            external_ref: format!("transfer-{}", request.deposit),
        })
    }

    fn submitter_name(&self) -> &'static str {
        "recording"
    }
}

/// A ledger whose first `n` calls to `mark_settled` fail with a database
/// error. Everything else is delegated to a [`MemoryLedger`].
pub struct FlakyLedger {
    inner: MemoryLedger,
    settle_failures: AtomicU32,
}

impl FlakyLedger {
    pub fn failing_settles(times: u32) -> Self {
        Self {
            inner: MemoryLedger::new(),
            settle_failures: AtomicU32::new(times),
        }
    }
}

impl SettlementLedger for FlakyLedger {
    async fn reserve(&self, claim: &Claim) -> Result<bool> {
        self.inner.reserve(claim).await
    }

    async fn mark_settled(&self, hash: &TxHash, external_ref: &str) -> Result<()> {
        let refused = self
            .settle_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(Error::Database("database is locked".into()));
        }
        self.inner.mark_settled(hash, external_ref).await
    }

    async fn mark_failed(&self, hash: &TxHash, reason: &str) -> Result<()> {
        self.inner.mark_failed(hash, reason).await
    }

    async fn mark_rejected(&self, hash: &TxHash, reason: &str) -> Result<()> {
        self.inner.mark_rejected(hash, reason).await
    }

    async fn release(&self, hash: &TxHash) -> Result<()> {
        self.inner.release(hash).await
    }

    async fn recover_stale(&self, older_than: Duration) -> Result<usize> {
        self.inner.recover_stale(older_than).await
    }

    async fn get(&self, hash: &TxHash) -> Result<Option<SettlementEntry>> {
        self.inner.get(hash).await
    }

    async fn list(&self, filter: &LedgerFilter) -> Result<Vec<SettlementEntry>> {
        self.inner.list(filter).await
    }
}
