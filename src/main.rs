use std::process::ExitCode;

use clap::Parser;
use tonsettle::adapter::inbound::cli::command::{CheckCommand, Cli, Commands};
use tonsettle::adapter::inbound::cli::diagnostic::CliDiagnostic;
use tonsettle::adapter::inbound::cli::output::{self, OutputConfig};
use tonsettle::adapter::inbound::cli::{check, ledger, run};
use tonsettle::error::Error;
use tonsettle::infrastructure::config::logging::LoggingConfig;

/// Exit code for configuration errors, before any work is done.
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet, cli.verbose));

    let result = match &cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Ledger(command) => {
            init_command_logging(cli.verbose);
            ledger::execute(command).await.map(|()| true)
        }
        Commands::Check(CheckCommand::Config(args)) => {
            init_command_logging(cli.verbose);
            check::config::execute_config(args.config.as_deref()).map(|()| true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            report(&err);
            if err.is_fatal() {
                ExitCode::from(EXIT_CONFIG)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Logging for short-lived commands: quiet unless asked.
fn init_command_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    LoggingConfig {
        level: level.to_string(),
        ..LoggingConfig::default()
    }
    .init();
}

fn report(err: &Error) {
    if output::is_json() {
        output::error(&err.to_string());
        return;
    }
    let diagnostic = miette::Report::new(CliDiagnostic::from(err));
    eprintln!("{diagnostic:?}");
}
