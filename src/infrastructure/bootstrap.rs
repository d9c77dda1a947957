//! Infrastructure bootstrap helpers for runtime wiring.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::relay::{OperatorKey, RelaySubmitter};
use crate::adapter::outbound::sqlite::{open, open_read_only, SqliteLedger};
use crate::adapter::outbound::toncenter::ToncenterClient;
use crate::application::settlement::Settler;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::{DisabledSubmitter, PayoutSubmitter, SettlementLedger, TransactionFetcher};

/// Open (creating and migrating if needed) the configured ledger file.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated.
pub fn open_ledger(config: &Config) -> Result<SqliteLedger> {
    open_ledger_at(&config.database)
}

/// Open the ledger file at `database`.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated.
pub fn open_ledger_at(database: &str) -> Result<SqliteLedger> {
    let pool = open(database)?;
    info!(database, "Ledger opened");
    Ok(SqliteLedger::new(pool))
}

/// Read-only view of the ledger at `database` for dry runs.
///
/// Returns `None` when the file does not exist yet, in which case every
/// deposit is unseen.
///
/// # Errors
///
/// Returns an error if an existing file cannot be opened.
pub fn open_ledger_read_only(database: &str) -> Result<Option<SqliteLedger>> {
    let path = Path::new(database);
    if !path.exists() {
        info!(database, "No ledger file yet, every deposit is unseen");
        return Ok(None);
    }
    let pool = open_read_only(path)?;
    info!(database, "Ledger opened read-only");
    Ok(Some(SqliteLedger::new(pool)))
}

pub(crate) fn build_fetcher(config: &Config) -> Arc<dyn TransactionFetcher> {
    Arc::new(ToncenterClient::from_config(&config.toncenter))
}

/// Build the relay submitter from the operator credential.
///
/// # Errors
///
/// Returns an error if no credential is configured or the key is malformed.
pub(crate) fn build_submitter(config: &Config) -> Result<Arc<dyn PayoutSubmitter>> {
    let key = OperatorKey::from_credential(config.credential()?)?;
    info!(public_key = %key.public_key_hex(), relay = %config.relay.url, "Operator key loaded");
    Ok(Arc::new(RelaySubmitter::from_config(
        &config.relay,
        config.watched_address()?,
        key,
    )))
}

/// Settler that pays deposits and records them in the SQLite ledger.
///
/// # Errors
///
/// Returns an error if the credential, addresses or ledger are unusable.
pub fn live_settler(config: &Config) -> Result<Settler<SqliteLedger>> {
    let submitter = build_submitter(config)?;
    let ledger = open_ledger(config)?;
    Ok(Settler::new(
        build_fetcher(config),
        Arc::new(ledger),
        submitter,
        config.settlement_settings(false)?,
    ))
}

/// Settler that only classifies and prices; nothing is written or sent.
///
/// `ledger` is consulted so deposits that are already handled are reported
/// as skipped rather than payable.
///
/// # Errors
///
/// Returns an error if a configured address does not normalize.
pub fn dry_run_settler<L: SettlementLedger>(config: &Config, ledger: L) -> Result<Settler<L>> {
    Ok(Settler::new(
        build_fetcher(config),
        Arc::new(ledger),
        Arc::new(DisabledSubmitter),
        config.settlement_settings(true)?,
    ))
}
