//! Handlers for `tonsettle ledger`.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::command::{
    LedgerCommand, LedgerHashArgs, LedgerListArgs, LedgerRecoverArgs, LedgerSettleArgs,
    SourceArgs, MAX_OLDER_THAN_SECS,
};
use crate::adapter::inbound::cli::{output, source};
use crate::adapter::outbound::sqlite::SqliteLedger;
use crate::domain::{SettlementEntry, TxHash};
use crate::error::{Error, LedgerError, Result};
use crate::infrastructure::bootstrap::open_ledger_at;
use crate::infrastructure::config::settlement::PollConfig;
use crate::port::{LedgerFilter, SettlementLedger};

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Hash")]
    hash: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "TON")]
    ton_amount: String,
    #[tabled(rename = "Payout")]
    payout: String,
    #[tabled(rename = "Attempts")]
    attempts: u32,
    #[tabled(rename = "Updated")]
    updated_at: String,
}

impl From<&SettlementEntry> for EntryRow {
    fn from(entry: &SettlementEntry) -> Self {
        Self {
            hash: short_hash(entry.hash.as_str()),
            state: entry.state.to_string(),
            ton_amount: entry.ton_amount.to_string(),
            payout: entry.payout_minor.to_string(),
            attempts: entry.attempts,
            updated_at: format_time(entry.updated_at),
        }
    }
}

fn short_hash(hash: &str) -> String {
    if hash.chars().count() <= 16 {
        return hash.to_string();
    }
    let head: String = hash.chars().take(12).collect();
    format!("{head}…")
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn open(source_args: &SourceArgs) -> Result<SqliteLedger> {
    let path = source::ledger_path(source_args)?;
    open_ledger_at(&path.to_string_lossy())
}

/// Dispatch a ledger subcommand.
pub async fn execute(command: &LedgerCommand) -> Result<()> {
    match command {
        LedgerCommand::List(args) => list(args).await,
        LedgerCommand::Show(args) => show(args).await,
        LedgerCommand::Release(args) => release(args).await,
        LedgerCommand::Recover(args) => recover(args).await,
        LedgerCommand::Settle(args) => settle(args).await,
    }
}

async fn list(args: &LedgerListArgs) -> Result<()> {
    let ledger = open(&args.source)?;
    let filter = LedgerFilter {
        state: args.state,
        limit: Some(args.limit),
    };
    let entries = ledger.list(&filter).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "ledger.list",
            "entries": entries,
        }));
        return Ok(());
    }

    if entries.is_empty() {
        match args.state {
            Some(state) => output::field("Entries", format!("none in state {state}")),
            None => output::field("Entries", "none"),
        }
        return Ok(());
    }

    let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    output::lines(&table.to_string());

    if output::verbosity() == 0 {
        output::hint(&format!(
            "run {} for full details",
            output::highlight("tonsettle ledger show <hash>")
        ));
    }
    Ok(())
}

async fn show(args: &LedgerHashArgs) -> Result<()> {
    let ledger = open(&args.source)?;
    let hash = TxHash::new(args.hash.trim());
    let entry = ledger.get(&hash).await?.ok_or_else(|| {
        Error::Ledger(LedgerError::UnknownHash {
            hash: hash.to_string(),
        })
    })?;

    if output::is_json() {
        output::json_output(json!({
            "command": "ledger.show",
            "entry": entry,
        }));
        return Ok(());
    }

    print_entry(&entry);
    Ok(())
}

fn print_entry(entry: &SettlementEntry) {
    output::section("Settlement entry");
    output::field("Hash", &entry.hash);
    output::field("State", output::highlight(entry.state));
    output::field("Sender", &entry.sender);
    output::field("TON", entry.ton_amount);
    output::field("Payout", entry.payout_minor);
    output::field("Attempts", entry.attempts);
    if let Some(reference) = &entry.external_ref {
        output::field("Reference", reference);
    }
    if let Some(error) = &entry.last_error {
        output::field("Last error", error);
    }
    if let Some(reserved_at) = entry.reserved_at {
        output::field("Reserved", format_time(reserved_at));
    }
    output::field("Created", format_time(entry.created_at));
    output::field("Updated", format_time(entry.updated_at));
}

async fn release(args: &LedgerHashArgs) -> Result<()> {
    let ledger = open(&args.source)?;
    let hash = TxHash::new(args.hash.trim());
    ledger.release(&hash).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "ledger.release",
            "hash": hash,
            "state": "failed",
        }));
        return Ok(());
    }

    output::success(&format!("Released {hash}; the next cycle will retry it"));
    Ok(())
}

async fn settle(args: &LedgerSettleArgs) -> Result<()> {
    let ledger = open(&args.source)?;
    let hash = TxHash::new(args.hash.trim());
    let external_ref = args.external_ref.trim();
    ledger.mark_settled(&hash, external_ref).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "ledger.settle",
            "hash": hash,
            "external_ref": external_ref,
            "state": "settled",
        }));
        return Ok(());
    }

    output::success(&format!("Recorded {hash} as settled ({external_ref})"));
    Ok(())
}

async fn recover(args: &LedgerRecoverArgs) -> Result<()> {
    let secs = match args.older_than {
        Some(secs) => secs,
        None if args.source.database.is_some() => PollConfig::default().reservation_timeout_secs,
        None => source::load_config(&args.source)?
            .poll
            .reservation_timeout_secs,
    };
    let capped = secs.min(MAX_OLDER_THAN_SECS);
    let older_than = Duration::seconds(i64::try_from(capped).unwrap_or_default());

    let ledger = open(&args.source)?;
    let recovered = ledger.recover_stale(older_than).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "ledger.recover",
            "older_than_secs": secs,
            "recovered": recovered,
        }));
        return Ok(());
    }

    if recovered == 0 {
        output::field("Recovered", format!("none older than {secs}s"));
    } else {
        output::success(&format!("Recovered {recovered} stale reservation(s)"));
    }
    Ok(())
}
