//! Outbound jetton transfers via the signing relay.

mod settings;
mod signer;
mod submitter;

pub use settings::RelayConfig;
pub use signer::{OperatorKey, SigningCredential};
pub use submitter::RelaySubmitter;
