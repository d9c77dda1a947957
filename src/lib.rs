//! tonsettle - TON deposit watcher with fixed-rate jetton settlement.
//!
//! Polls a watched TON wallet through toncenter, classifies inbound
//! transfers into creditable deposits, and pays each deposit exactly once
//! with an output token at a fixed rate. Payouts go through a signing HTTP
//! relay; a durable SQLite ledger keyed by transaction hash makes repeated
//! polling of the same window safe.
//!
//! # Architecture
//!
//! - [`domain`] - Addresses, transaction records, deposits, payout math and
//!   the settlement state machine. No I/O.
//! - [`port`] - Traits the settlement cycle depends on: fetcher, ledger,
//!   submitter.
//! - [`adapter`] - Toncenter client, transfer relay, SQLite and in-memory
//!   ledgers, and the operator CLI.
//! - [`application`] - The fetch, classify, reserve, pay, settle cycle.
//! - [`infrastructure`] - Configuration, logging and runtime wiring.
//!
//! # Example
//!
//! ```no_run
//! use tonsettle::infrastructure::bootstrap::live_settler;
//! use tonsettle::infrastructure::config::settings::Config;
//!
//! # async fn example() -> tonsettle::error::Result<()> {
//! let config = Config::from_env()?;
//! let settler = live_settler(&config)?;
//! let report = settler.run_cycle().await?;
//! println!("settled {}", report.settled());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

/// Test doubles and builders shared by unit and integration tests.
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
