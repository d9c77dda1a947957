//! Deposit settlement use case.
//!
//! - [`service`]: the [`Settler`] running fetch, classify and payout cycles
//! - [`report`]: the [`CycleReport`] each cycle produces

pub mod report;
pub mod service;

pub use report::{CycleReport, DepositOutcome, Outcome};
pub use service::{SettlementSettings, Settler};
