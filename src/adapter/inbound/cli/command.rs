//! Command-line interface definitions.
//!
//! Defines the CLI structure for tonsettle using `clap`: running settlement
//! cycles, inspecting and repairing the ledger, and validating configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::SettlementState;

/// Upper bound for `ledger recover --older-than` (one year).
pub const MAX_OLDER_THAN_SECS: u64 = 365 * 86_400;

/// TON deposit watcher and fixed-rate jetton settlement CLI
#[derive(Parser, Debug)]
#[command(name = "tonsettle")]
#[command(version)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the tonsettle CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, classify and settle deposits (once, or repeatedly with --watch)
    Run(RunArgs),

    /// Inspect and repair the settlement ledger
    #[command(subcommand)]
    Ledger(LedgerCommand),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Where configuration and the ledger come from.
///
/// Without `--config`, `~/.tonsettle/config.toml` is used when it exists;
/// otherwise everything comes from the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Path to the configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite ledger (overrides config and TONSETTLE_DATABASE).
    #[arg(long)]
    pub database: Option<PathBuf>,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Keep polling until interrupted.
    #[arg(long)]
    pub watch: bool,

    /// Seconds between cycles in watch mode (overrides config).
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Classify and price deposits without reserving or paying.
    #[arg(long)]
    pub dry_run: bool,

    /// Number of recent transactions to fetch per cycle (1-100).
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Log level filter (overrides config; RUST_LOG still wins).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

/// Subcommands for `tonsettle ledger`.
#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// List settlement entries, most recently updated first.
    List(LedgerListArgs),
    /// Show one entry in full.
    Show(LedgerHashArgs),
    /// Move a rejected entry back to failed so the next cycle retries it.
    Release(LedgerHashArgs),
    /// Revert stale reservations to failed.
    Recover(LedgerRecoverArgs),
    /// Record a transfer that was sent while the ledger could not be updated.
    Settle(LedgerSettleArgs),
}

/// Arguments for `tonsettle ledger list`.
#[derive(Parser, Debug)]
pub struct LedgerListArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only entries in this state (reserved, settled, failed, rejected).
    #[arg(long)]
    pub state: Option<SettlementState>,

    /// Maximum number of entries to show.
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

/// Arguments for ledger commands addressing a single entry.
#[derive(Parser, Debug)]
pub struct LedgerHashArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Deposit transaction hash.
    pub hash: String,
}

/// Arguments for `tonsettle ledger settle`.
#[derive(Parser, Debug)]
pub struct LedgerSettleArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Deposit transaction hash (must be reserved).
    pub hash: String,

    /// Reference the relay returned for the transfer.
    #[arg(long = "ref", value_name = "REF")]
    pub external_ref: String,
}

/// Arguments for `tonsettle ledger recover`.
#[derive(Parser, Debug)]
pub struct LedgerRecoverArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Reservation age in seconds (defaults to the configured timeout).
    #[arg(
        long,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(0..=MAX_OLDER_THAN_SECS)
    )]
    pub older_than: Option<u64>,
}

/// Subcommands for `tonsettle check`.
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration and report what a run would use.
    Config(ConfigPathArg),
}

/// Shared argument struct for commands that only need a configuration path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "tonsettle",
            "--json",
            "run",
            "--watch",
            "--interval",
            "15",
            "--dry-run",
            "--limit",
            "25",
            "--database",
            "/tmp/ledger.db",
        ])
        .unwrap();

        assert!(cli.json);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(args.watch);
        assert!(args.dry_run);
        assert_eq!(args.interval, Some(15));
        assert_eq!(args.limit, Some(25));
        assert_eq!(args.source.database, Some(PathBuf::from("/tmp/ledger.db")));
        assert_eq!(args.source.config, None);
    }

    #[test]
    fn parses_ledger_state_filter() {
        let cli =
            Cli::try_parse_from(["tonsettle", "ledger", "list", "--state", "rejected"]).unwrap();
        let Commands::Ledger(LedgerCommand::List(args)) = cli.command else {
            panic!("expected ledger list");
        };
        assert_eq!(args.state, Some(SettlementState::Rejected));
        assert_eq!(args.limit, 50);
    }

    #[test]
    fn rejects_unknown_state() {
        assert!(Cli::try_parse_from(["tonsettle", "ledger", "list", "--state", "paid"]).is_err());
    }

    #[test]
    fn recover_age_is_bounded() {
        let cli =
            Cli::try_parse_from(["tonsettle", "ledger", "recover", "--older-than", "0"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ledger(LedgerCommand::Recover(LedgerRecoverArgs { older_than: Some(0), .. }))
        ));
        assert!(Cli::try_parse_from([
            "tonsettle",
            "ledger",
            "recover",
            "--older-than",
            "99999999999",
        ])
        .is_err());
    }

    #[test]
    fn settle_requires_reference() {
        assert!(Cli::try_parse_from(["tonsettle", "ledger", "settle", "h1"]).is_err());
        let cli = Cli::try_parse_from(["tonsettle", "ledger", "settle", "h1", "--ref", "msg-7"])
            .unwrap();
        let Commands::Ledger(LedgerCommand::Settle(args)) = cli.command else {
            panic!("expected ledger settle");
        };
        assert_eq!(args.hash, "h1");
        assert_eq!(args.external_ref, "msg-7");
    }

    #[test]
    fn release_requires_hash() {
        assert!(Cli::try_parse_from(["tonsettle", "ledger", "release"]).is_err());
        let cli = Cli::try_parse_from(["tonsettle", "ledger", "release", "abc"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ledger(LedgerCommand::Release(LedgerHashArgs { ref hash, .. })) if hash == "abc"
        ));
    }
}
