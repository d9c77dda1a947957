//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`settlement`] - Scripted [`TransactionFetcher`](crate::port::TransactionFetcher)
//!   and recording [`PayoutSubmitter`](crate::port::PayoutSubmitter) doubles.
//! - [`domain`] - Builders for transaction records and addresses.
//! - [`http`] - Loopback HTTP server with canned responses.

pub mod domain;
pub mod http;
pub mod settlement;
