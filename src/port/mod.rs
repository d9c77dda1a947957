//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │  (settlement cycle)     │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     │                         │                             │
//!     ▼                         ▼                             ▼
//! ┌───────────┐          ┌─────────────┐              ┌───────────┐
//! │ Toncenter │          │   Ledger    │              │   Relay   │
//! │  Adapter  │          │   Adapter   │              │  Adapter  │
//! └───────────┘          └─────────────┘              └───────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`TransactionFetcher`] - Recent transactions of the watched wallet
//! - [`SettlementLedger`] - Durable idempotence record
//! - [`PayoutSubmitter`] - Outbound token transfers

pub mod outbound;

pub use outbound::fetcher::TransactionFetcher;
pub use outbound::ledger::{LedgerFilter, SettlementLedger};
pub use outbound::submitter::{DisabledSubmitter, PayoutRequest, PayoutSubmitter, SubmissionReceipt};
