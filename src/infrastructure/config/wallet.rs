//! Watched wallet and operator key.

use serde::Deserialize;

use crate::adapter::outbound::relay::SigningCredential;

/// Wallet configuration.
/// Key material is loaded from `WALLET_MNEMONIC` or `WALLET_PRIVATE_KEY` at runtime (never from config file).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    /// Wallet watched for deposits and paying out. Overridden by `WALLET_ADDRESS`.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(skip)]
    pub credential: Option<SigningCredential>,
}
