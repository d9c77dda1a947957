//! Chain-agnostic settlement domain: addresses, deposits, payouts and the
//! settlement lifecycle. Nothing in here performs I/O.

pub mod address;
pub mod deposit;
pub mod payout;
pub mod settlement;
pub mod transaction;

pub use address::{normalize, NormalizedAddress};
pub use deposit::{classify, nano_to_ton, Classification, Deposit, RejectReason, TON_DECIMALS};
pub use payout::{compute_payout, payout_for, to_minor_units, Rate, TokenAmount};
pub use settlement::{Claim, SettlementEntry, SettlementState};
pub use transaction::{TransactionRecord, TxHash};
