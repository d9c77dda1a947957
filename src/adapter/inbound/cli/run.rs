//! Handler for the `run` command.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::adapter::inbound::cli::command::RunArgs;
use crate::adapter::inbound::cli::{output, source};
use crate::adapter::outbound::memory::MemoryLedger;
use crate::application::settlement::{CycleReport, Outcome, Settler};
use crate::error::{ConfigError, Result};
use crate::infrastructure::bootstrap::{dry_run_settler, live_settler, open_ledger_read_only};
use crate::infrastructure::config::settings::Config;
use crate::port::SettlementLedger;

/// Execute the run command.
///
/// Returns `false` when a one-shot cycle finished with failures. Watch mode
/// returns `true` after Ctrl-C, or the error of a cycle that halted
/// settlement.
pub async fn execute(args: &RunArgs) -> Result<bool> {
    let config = prepare_config(args)?;
    config.logging.init();

    print_startup(&config, args);

    let interval = Duration::from_secs(config.poll.interval_secs);
    if args.dry_run {
        match open_ledger_read_only(&config.database)? {
            Some(ledger) => drive(dry_run_settler(&config, ledger)?, args.watch, interval).await,
            None => {
                drive(dry_run_settler(&config, MemoryLedger::new())?, args.watch, interval).await
            }
        }
    } else {
        drive(live_settler(&config)?, args.watch, interval).await
    }
}

/// Configuration with command-line overrides applied.
fn prepare_config(args: &RunArgs) -> Result<Config> {
    let mut config = source::load_config(&args.source)?;

    if let Some(limit) = args.limit {
        config.set_poll_limit(limit)?;
    }
    if let Some(interval) = args.interval {
        if interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "--interval",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        config.poll.interval_secs = interval;
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    Ok(config)
}

async fn drive<L: SettlementLedger + 'static>(
    settler: Settler<L>,
    watch: bool,
    interval: Duration,
) -> Result<bool> {
    if !watch {
        let report = settler.run_cycle().await?;
        print_report(&report)?;
        return Ok(!report.has_failures());
    }

    info!(interval_secs = interval.as_secs(), "Watching for deposits");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // A cycle in progress finishes before shutdown is noticed.
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                match settler.run_cycle().await {
                    Ok(report) => print_report(&report)?,
                    Err(e) if e.halts_settlement() => return Err(e),
                    Err(e) => error!(error = %e, "Settlement cycle failed"),
                }
            }
        }
    }

    Ok(true)
}

fn print_startup(config: &Config, args: &RunArgs) {
    if output::is_json() || output::is_quiet() {
        return;
    }

    output::header(env!("CARGO_PKG_VERSION"));
    if let Some(wallet) = &config.wallet.address {
        output::field("Wallet", wallet);
    }
    output::field("Rate", config.payout.rate.value());
    output::field("Limit", config.poll.limit);
    output::field("Database", &config.database);
    if args.watch {
        output::field("Interval", format!("{}s", config.poll.interval_secs));
    }
    if output::verbosity() > 0 {
        output::field("Toncenter", &config.toncenter.api_url);
        output::field("Relay", &config.relay.url);
    }

    if args.dry_run {
        output::warning("Dry-run mode enabled - the ledger is only read, nothing is paid");
    }
}

fn print_report(report: &CycleReport) -> Result<()> {
    if output::is_json() {
        output::json_output(serde_json::to_value(report)?);
        return Ok(());
    }

    output::section(&format!(
        "Cycle {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S")
    ));

    if let Some(error) = &report.fetch_error {
        output::error(&format!("Fetch failed: {error}"));
        return Ok(());
    }
    if report.recovered > 0 {
        output::warning(&format!(
            "Recovered {} stale reservation(s)",
            report.recovered
        ));
    }

    for entry in &report.outcomes {
        let hash = entry.hash.as_str();
        match &entry.outcome {
            Outcome::Ignored { reason } => {
                if output::verbosity() > 0 {
                    output::outcome("ignored", hash, &reason.to_string());
                }
            }
            Outcome::Skipped { state } => {
                let message = state.map_or_else(
                    || "already claimed".to_string(),
                    |state| format!("already {state}"),
                );
                output::outcome("skipped", hash, &message);
            }
            Outcome::Previewed {
                sender,
                ton_amount,
                payout,
            } => output::outcome(
                "preview",
                hash,
                &format!("{ton_amount} TON from {sender} -> {payout}"),
            ),
            Outcome::Settled {
                sender,
                ton_amount,
                payout,
                external_ref,
            } => output::outcome(
                "settled",
                hash,
                &format!(
                    "{ton_amount} TON from {sender} -> {payout} {}",
                    output::muted(format!("({external_ref})"))
                ),
            ),
            Outcome::Failed { error } => output::outcome("failed", hash, error),
            Outcome::Rejected { error } => output::outcome("rejected", hash, error),
        }
    }

    output::field(
        "Summary",
        format!(
            "{} fetched, {} settled, {} previewed, {} skipped, {} ignored, {} failed, {} rejected",
            report.fetched,
            report.settled(),
            report.previewed(),
            report.skipped(),
            report.ignored(),
            report.failed(),
            report.rejected(),
        ),
    );
    Ok(())
}
