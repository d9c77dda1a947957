//! Payout and polling settings.

use serde::Deserialize;

use crate::domain::{Rate, TON_DECIMALS};

/// Output token and conversion.
#[derive(Debug, Clone, Deserialize)]
pub struct PayoutConfig {
    /// Jetton master contract of the output token. Overridden by `CDT_CONTRACT`.
    #[serde(default)]
    pub token_contract: Option<String>,
    /// Output tokens per TON. Overridden by `FIXED_RATE`.
    #[serde(default)]
    pub rate: Rate,
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,
    /// Nanotons attached to each transfer for forwarding fees.
    #[serde(default = "default_forward_fee_nano")]
    pub forward_fee_nano: u64,
    #[serde(default)]
    pub memo_prefix: Option<String>,
}

const fn default_token_decimals() -> u32 {
    TON_DECIMALS
}

const fn default_forward_fee_nano() -> u64 {
    50_000_000
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            token_contract: None,
            rate: Rate::default(),
            token_decimals: default_token_decimals(),
            forward_fee_nano: default_forward_fee_nano(),
            memo_prefix: None,
        }
    }
}

/// Polling cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Transactions fetched per cycle. Overridden by `POLL_LIMIT`.
    #[serde(default = "default_poll_limit")]
    pub limit: usize,
    /// Seconds between cycles in watch mode.
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    /// Seconds after which an unfinished reservation is reverted to failed.
    #[serde(default = "default_reservation_timeout_secs")]
    pub reservation_timeout_secs: u64,
}

const fn default_poll_limit() -> usize {
    10
}

const fn default_poll_interval_secs() -> u64 {
    30
}

const fn default_reservation_timeout_secs() -> u64 {
    600
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            limit: default_poll_limit(),
            interval_secs: default_poll_interval_secs(),
            reservation_timeout_secs: default_reservation_timeout_secs(),
        }
    }
}
