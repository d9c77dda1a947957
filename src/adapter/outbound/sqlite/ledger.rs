//! SQLite settlement ledger implementation.
//!
//! Every state change runs inside an `IMMEDIATE` transaction: SQLite takes
//! the write lock before the current state is read, so two processes
//! sharing the ledger file cannot both observe an unreserved hash.

use std::str::FromStr;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::database::connection::DbPool;
use super::database::model::SettlementRow;
use super::database::schema::settlements;
use crate::domain::{Claim, SettlementEntry, SettlementState, TxHash};
use crate::error::{Error, LedgerError, Result};
use crate::port::outbound::ledger::{LedgerFilter, SettlementLedger};

/// SQLite-backed settlement ledger.
pub struct SqliteLedger {
    /// Database connection pool.
    pool: DbPool,
}

impl SqliteLedger {
    /// Create a new SQLite ledger with the given (migrated) connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>>
    {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    fn transition(
        &self,
        hash: &TxHash,
        only_from: Option<SettlementState>,
        next: SettlementState,
        external_ref: Option<&str>,
        last_error: Option<&str>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            let current: String = settlements::table
                .find(hash.as_str())
                .select(settlements::state)
                .first(conn)
                .optional()?
                .ok_or_else(|| LedgerError::UnknownHash {
                    hash: hash.to_string(),
                })?;
            let from = parse_state(hash, &current)?;
            if only_from.is_some_and(|only| only != from) || !from.can_transition_to(next) {
                return Err(LedgerError::InvalidTransition {
                    hash: hash.to_string(),
                    from,
                    to: next,
                }
                .into());
            }

            diesel::update(settlements::table.find(hash.as_str()))
                .set((
                    settlements::state.eq(next.as_str()),
                    settlements::updated_at.eq(timestamp(Utc::now())),
                ))
                .execute(conn)?;
            if let Some(external_ref) = external_ref {
                diesel::update(settlements::table.find(hash.as_str()))
                    .set((
                        settlements::external_ref.eq(Some(external_ref)),
                        settlements::last_error.eq(None::<String>),
                    ))
                    .execute(conn)?;
            }
            if let Some(last_error) = last_error {
                diesel::update(settlements::table.find(hash.as_str()))
                    .set(settlements::last_error.eq(Some(last_error)))
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    fn to_row(claim: &Claim, now: &str) -> SettlementRow {
        SettlementRow {
            hash: claim.hash.to_string(),
            state: SettlementState::Reserved.as_str().to_string(),
            sender: claim.sender.to_string(),
            ton_amount: claim.ton_amount.to_string(),
            payout_minor: claim.payout.minor().to_string(),
            attempts: 1,
            external_ref: None,
            last_error: None,
            reserved_at: Some(now.to_string()),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    fn from_row(row: SettlementRow) -> Result<SettlementEntry> {
        let hash = TxHash::from(row.hash);
        let corrupt = |reason: String| -> Error {
            LedgerError::Corrupt {
                hash: hash.to_string(),
                reason,
            }
            .into()
        };

        let state = parse_state(&hash, &row.state)?;
        let ton_amount = Decimal::from_str(&row.ton_amount)
            .map_err(|e| corrupt(format!("ton_amount: {e}")))?;
        let payout_minor: u128 = row
            .payout_minor
            .parse()
            .map_err(|e| corrupt(format!("payout_minor: {e}")))?;
        let attempts =
            u32::try_from(row.attempts).map_err(|e| corrupt(format!("attempts: {e}")))?;
        let reserved_at = row
            .reserved_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(&corrupt)?;
        let created_at = parse_timestamp(&row.created_at).map_err(&corrupt)?;
        let updated_at = parse_timestamp(&row.updated_at).map_err(&corrupt)?;

        Ok(SettlementEntry {
            hash,
            state,
            sender: row.sender,
            ton_amount,
            payout_minor,
            attempts,
            external_ref: row.external_ref,
            last_error: row.last_error,
            reserved_at,
            created_at,
            updated_at,
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| format!("timestamp '{raw}': {e}"))
}

fn parse_state(hash: &TxHash, raw: &str) -> Result<SettlementState> {
    SettlementState::from_str(raw).map_err(|reason| {
        LedgerError::Corrupt {
            hash: hash.to_string(),
            reason,
        }
        .into()
    })
}

impl SettlementLedger for SqliteLedger {
    async fn reserve(&self, claim: &Claim) -> Result<bool> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            let now = timestamp(Utc::now());
            let current: Option<String> = settlements::table
                .find(claim.hash.as_str())
                .select(settlements::state)
                .first(conn)
                .optional()?;

            match current {
                None => {
                    diesel::insert_into(settlements::table)
                        .values(&Self::to_row(claim, &now))
                        .execute(conn)?;
                    Ok(true)
                }
                Some(state) if parse_state(&claim.hash, &state)?.is_reservable() => {
                    diesel::update(settlements::table.find(claim.hash.as_str()))
                        .set((
                            settlements::state.eq(SettlementState::Reserved.as_str()),
                            settlements::attempts.eq(settlements::attempts + 1),
                            settlements::payout_minor.eq(claim.payout.minor().to_string()),
                            settlements::reserved_at.eq(Some(&now)),
                            settlements::updated_at.eq(&now),
                        ))
                        .execute(conn)?;
                    Ok(true)
                }
                Some(_) => Ok(false),
            }
        })
    }

    async fn mark_settled(&self, hash: &TxHash, external_ref: &str) -> Result<()> {
        self.transition(
            hash,
            None,
            SettlementState::Settled,
            Some(external_ref),
            None,
        )
    }

    async fn mark_failed(&self, hash: &TxHash, reason: &str) -> Result<()> {
        self.transition(hash, None, SettlementState::Failed, None, Some(reason))
    }

    async fn mark_rejected(&self, hash: &TxHash, reason: &str) -> Result<()> {
        self.transition(hash, None, SettlementState::Rejected, None, Some(reason))
    }

    async fn release(&self, hash: &TxHash) -> Result<()> {
        self.transition(
            hash,
            Some(SettlementState::Rejected),
            SettlementState::Failed,
            None,
            None,
        )
    }

    async fn recover_stale(&self, older_than: Duration) -> Result<usize> {
        let mut conn = self.conn()?;
        let now = Utc::now();
        let cutoff = timestamp(now - older_than);

        let recovered = diesel::update(
            settlements::table
                .filter(settlements::state.eq(SettlementState::Reserved.as_str()))
                .filter(settlements::reserved_at.le(cutoff)),
        )
        .set((
            settlements::state.eq(SettlementState::Failed.as_str()),
            settlements::last_error.eq(Some("reservation expired")),
            settlements::updated_at.eq(timestamp(now)),
        ))
        .execute(&mut conn)?;

        Ok(recovered)
    }

    async fn get(&self, hash: &TxHash) -> Result<Option<SettlementEntry>> {
        let mut conn = self.conn()?;
        let row: Option<SettlementRow> = settlements::table
            .find(hash.as_str())
            .select(SettlementRow::as_select())
            .first(&mut conn)
            .optional()?;

        row.map(Self::from_row).transpose()
    }

    async fn list(&self, filter: &LedgerFilter) -> Result<Vec<SettlementEntry>> {
        let mut conn = self.conn()?;
        let mut query = settlements::table
            .select(SettlementRow::as_select())
            .order(settlements::updated_at.desc())
            .into_boxed();
        if let Some(state) = filter.state {
            query = query.filter(settlements::state.eq(state.as_str()));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows: Vec<SettlementRow> = query.load(&mut conn)?;
        rows.into_iter().map(Self::from_row).collect()
    }
}
