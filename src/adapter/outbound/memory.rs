//! In-process settlement ledger.
//!
//! Holds entries in a mutex-guarded map. State is lost on exit, so this
//! backs dry runs and tests; production runs use the SQLite ledger.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use parking_lot::Mutex;

use crate::domain::{Claim, SettlementEntry, SettlementState, TxHash};
use crate::error::{LedgerError, Result};
use crate::port::outbound::ledger::{LedgerFilter, SettlementLedger};

#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<HashMap<TxHash, SettlementEntry>>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn transition(
        &self,
        hash: &TxHash,
        only_from: Option<SettlementState>,
        next: SettlementState,
        apply: impl FnOnce(&mut SettlementEntry),
    ) -> Result<()> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(hash).ok_or_else(|| LedgerError::UnknownHash {
            hash: hash.to_string(),
        })?;
        if only_from.is_some_and(|only| only != entry.state) || !entry.state.can_transition_to(next)
        {
            return Err(LedgerError::InvalidTransition {
                hash: hash.to_string(),
                from: entry.state,
                to: next,
            }
            .into());
        }
        entry.state = next;
        entry.updated_at = Utc::now();
        apply(entry);
        Ok(())
    }
}

impl SettlementLedger for MemoryLedger {
    async fn reserve(&self, claim: &Claim) -> Result<bool> {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        match entries.get_mut(&claim.hash) {
            Some(entry) if entry.state.is_reservable() => {
                entry.state = SettlementState::Reserved;
                entry.attempts += 1;
                entry.reserved_at = Some(now);
                entry.updated_at = now;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                entries.insert(
                    claim.hash.clone(),
                    SettlementEntry {
                        hash: claim.hash.clone(),
                        state: SettlementState::Reserved,
                        sender: claim.sender.to_string(),
                        ton_amount: claim.ton_amount,
                        payout_minor: claim.payout.minor(),
                        attempts: 1,
                        external_ref: None,
                        last_error: None,
                        reserved_at: Some(now),
                        created_at: now,
                        updated_at: now,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn mark_settled(&self, hash: &TxHash, external_ref: &str) -> Result<()> {
        self.transition(hash, None, SettlementState::Settled, |entry| {
            entry.external_ref = Some(external_ref.to_string());
            entry.last_error = None;
        })
    }

    async fn mark_failed(&self, hash: &TxHash, reason: &str) -> Result<()> {
        self.transition(hash, None, SettlementState::Failed, |entry| {
            entry.last_error = Some(reason.to_string());
        })
    }

    async fn mark_rejected(&self, hash: &TxHash, reason: &str) -> Result<()> {
        self.transition(hash, None, SettlementState::Rejected, |entry| {
            entry.last_error = Some(reason.to_string());
        })
    }

    async fn release(&self, hash: &TxHash) -> Result<()> {
        self.transition(
            hash,
            Some(SettlementState::Rejected),
            SettlementState::Failed,
            |_| {},
        )
    }

    async fn recover_stale(&self, older_than: Duration) -> Result<usize> {
        let now = Utc::now();
        let cutoff = now - older_than;
        let mut recovered = 0;
        for entry in self.entries.lock().values_mut() {
            let stale = entry.state == SettlementState::Reserved
                && entry.reserved_at.is_some_and(|at| at <= cutoff);
            if stale {
                entry.state = SettlementState::Failed;
                entry.last_error = Some("reservation expired".into());
                entry.updated_at = now;
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    async fn get(&self, hash: &TxHash) -> Result<Option<SettlementEntry>> {
        Ok(self.entries.lock().get(hash).cloned())
    }

    async fn list(&self, filter: &LedgerFilter) -> Result<Vec<SettlementEntry>> {
        let mut entries: Vec<SettlementEntry> = self
            .entries
            .lock()
            .values()
            .filter(|entry| filter.state.map_or(true, |state| entry.state == state))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(limit) = filter.limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{normalize, TokenAmount};
    use crate::error::Error;
    use rust_decimal_macros::dec;

    fn claim(hash: &str) -> Claim {
        Claim {
            hash: TxHash::from(hash),
            sender: normalize(&format!("0:{}", "22".repeat(32))).unwrap(),
            ton_amount: dec!(1),
            payout: TokenAmount::from_minor(20_000_000_000_000, 9),
        }
    }

    #[tokio::test]
    async fn reserve_is_a_one_shot_gate() {
        let ledger = MemoryLedger::new();
        assert!(ledger.reserve(&claim("h1")).await.unwrap());
        assert!(!ledger.reserve(&claim("h1")).await.unwrap());

        ledger.mark_settled(&"h1".into(), "ref-1").await.unwrap();
        assert!(!ledger.reserve(&claim("h1")).await.unwrap());

        let entry = ledger.get(&"h1".into()).await.unwrap().unwrap();
        assert_eq!(entry.state, SettlementState::Settled);
        assert_eq!(entry.external_ref.as_deref(), Some("ref-1"));
        assert_eq!(entry.attempts, 1);
    }

    #[tokio::test]
    async fn failed_entries_can_be_reserved_again() {
        let ledger = MemoryLedger::new();
        ledger.reserve(&claim("h1")).await.unwrap();
        ledger.mark_failed(&"h1".into(), "timeout").await.unwrap();

        assert!(ledger.reserve(&claim("h1")).await.unwrap());
        let entry = ledger.get(&"h1".into()).await.unwrap().unwrap();
        assert_eq!(entry.state, SettlementState::Reserved);
        assert_eq!(entry.attempts, 2);
    }

    #[tokio::test]
    async fn rejected_entries_wait_for_release() {
        let ledger = MemoryLedger::new();
        ledger.reserve(&claim("h1")).await.unwrap();
        ledger.mark_rejected(&"h1".into(), "bounced").await.unwrap();
        assert!(!ledger.reserve(&claim("h1")).await.unwrap());

        ledger.release(&"h1".into()).await.unwrap();
        assert!(ledger.reserve(&claim("h1")).await.unwrap());
    }

    #[tokio::test]
    async fn settling_an_unreserved_hash_is_an_error() {
        let ledger = MemoryLedger::new();
        let err = ledger.mark_settled(&"nope".into(), "ref").await.unwrap_err();
        assert!(matches!(err, Error::Ledger(LedgerError::UnknownHash { .. })));

        ledger.reserve(&claim("h1")).await.unwrap();
        let err = ledger.release(&"h1".into()).await.unwrap_err();
        assert!(matches!(err, Error::Ledger(LedgerError::InvalidTransition { .. })));

        ledger.mark_settled(&"h1".into(), "ref").await.unwrap();
        let err = ledger.mark_failed(&"h1".into(), "late").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::InvalidTransition {
                from: SettlementState::Settled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn stale_reservations_become_retryable() {
        let ledger = MemoryLedger::new();
        ledger.reserve(&claim("old")).await.unwrap();
        ledger.reserve(&claim("fresh")).await.unwrap();
        ledger.entries.lock().get_mut(&TxHash::from("old")).unwrap().reserved_at =
            Some(Utc::now() - Duration::minutes(30));

        let recovered = ledger.recover_stale(Duration::minutes(10)).await.unwrap();
        assert_eq!(recovered, 1);

        let old = ledger.get(&"old".into()).await.unwrap().unwrap();
        assert_eq!(old.state, SettlementState::Failed);
        let fresh = ledger.get(&"fresh".into()).await.unwrap().unwrap();
        assert_eq!(fresh.state, SettlementState::Reserved);
    }

    #[tokio::test]
    async fn concurrent_reservers_have_one_winner() {
        let ledger = Arc::new(MemoryLedger::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.reserve(&claim("contended")).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn list_filters_by_state() {
        let ledger = MemoryLedger::new();
        for hash in ["a", "b", "c"] {
            ledger.reserve(&claim(hash)).await.unwrap();
        }
        ledger.mark_settled(&"a".into(), "ref").await.unwrap();

        let settled = ledger
            .list(&LedgerFilter {
                state: Some(SettlementState::Settled),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].hash.as_str(), "a");

        let limited = ledger
            .list(&LedgerFilter {
                state: None,
                limit: Some(2),
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
    }
}
