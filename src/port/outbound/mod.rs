//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the settlement loop's infrastructure
//! dependencies: the chain API, the ledger store and the transfer relay.

pub mod fetcher;
pub mod ledger;
pub mod submitter;
