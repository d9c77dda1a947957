//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from an optional TOML file, then environment
//! variables override it. Secrets (`TONCENTER_API_KEY`, `WALLET_MNEMONIC`,
//! `WALLET_PRIVATE_KEY`) are only ever read from the environment.
//!
//! # Example
//!
//! ```no_run
//! use tonsettle::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.logging.init();
//!     Ok(())
//! }
//! ```

use std::path::Path;
use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use super::logging::LoggingConfig;
use super::settlement::{PayoutConfig, PollConfig};
use super::wallet::WalletConfig;
use crate::adapter::outbound::relay::{RelayConfig, SigningCredential};
use crate::adapter::outbound::toncenter::ToncenterConfig;
use crate::application::settlement::SettlementSettings;
use crate::domain::{normalize, NormalizedAddress, Rate};
use crate::error::{ConfigError, Result};

/// Largest batch toncenter returns for `getTransactions`.
pub const MAX_POLL_LIMIT: usize = 100;

/// A reservation older than a week is certainly abandoned.
const MAX_RESERVATION_TIMEOUT_SECS: u64 = 7 * 86_400;

/// Most token decimals a payout can be computed with.
const MAX_TOKEN_DECIMALS: u32 = 18;

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`], from the environment alone
/// with [`Config::from_env`], or parse directly with [`Config::parse_toml`].
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Watched wallet and operator key.
    #[serde(default)]
    pub wallet: WalletConfig,
    /// Output token, rate and transfer fee.
    #[serde(default)]
    pub payout: PayoutConfig,
    /// Batch size and cadence.
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub toncenter: ToncenterConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    /// Path to the SQLite ledger. Overridden by `TONSETTLE_DATABASE`.
    ///
    /// Defaults to "tonsettle.db" in the current directory.
    #[serde(default = "default_database_path")]
    pub database: String,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_database_path() -> String {
    "tonsettle.db".to_string()
}

impl Config {
    /// Parse configuration from TOML content and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed, an environment value does
    /// not parse, or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        Self::parse_with_env(content, |key| std::env::var(key).ok())
    }

    /// Parse configuration with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Config::parse_toml`].
    pub fn parse_with_env(content: &str, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Configuration from defaults and the environment only.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or invalid.
    pub fn from_env() -> Result<Self> {
        Self::parse_toml("")
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = var("TONCENTER_API_KEY") {
            self.toncenter.api_key = Some(key);
        }
        if let Some(address) = var("WALLET_ADDRESS") {
            self.wallet.address = Some(address);
        }
        self.wallet.credential = match (var("WALLET_MNEMONIC"), var("WALLET_PRIVATE_KEY")) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidValue {
                    field: "WALLET_MNEMONIC",
                    reason: "set either WALLET_MNEMONIC or WALLET_PRIVATE_KEY, not both".into(),
                }
                .into())
            }
            (Some(phrase), None) => Some(SigningCredential::Mnemonic(phrase)),
            (None, Some(key)) => Some(SigningCredential::PrivateKey(key)),
            (None, None) => None,
        };
        if let Some(contract) = var("CDT_CONTRACT") {
            self.payout.token_contract = Some(contract);
        }
        if let Some(rate) = var("FIXED_RATE") {
            self.payout.rate = parse_rate(&rate)?;
        }
        if let Some(limit) = var("POLL_LIMIT") {
            self.poll.limit = limit.parse().map_err(|_| ConfigError::InvalidValue {
                field: "POLL_LIMIT",
                reason: format!("'{limit}' is not a whole number"),
            })?;
        }
        if let Some(url) = var("RELAY_URL") {
            self.relay.url = url;
        }
        if let Some(database) = var("TONSETTLE_DATABASE") {
            self.database = database;
        }
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Checks that all required fields are present and values are within
    /// acceptable ranges. The signing credential is checked separately by
    /// [`Config::credential`] since dry runs and ledger commands do not need it.
    fn validate(&self) -> Result<()> {
        self.watched_address()?;
        self.token_contract()?;

        if !(1..=MAX_POLL_LIMIT).contains(&self.poll.limit) {
            return Err(ConfigError::InvalidValue {
                field: "poll.limit",
                reason: format!("must be between 1 and {MAX_POLL_LIMIT}"),
            }
            .into());
        }
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll.interval_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if !(1..=MAX_RESERVATION_TIMEOUT_SECS).contains(&self.poll.reservation_timeout_secs) {
            return Err(ConfigError::InvalidValue {
                field: "poll.reservation_timeout_secs",
                reason: format!("must be between 1 and {MAX_RESERVATION_TIMEOUT_SECS}"),
            }
            .into());
        }
        if self.payout.token_decimals > MAX_TOKEN_DECIMALS {
            return Err(ConfigError::InvalidValue {
                field: "payout.token_decimals",
                reason: format!("must be at most {MAX_TOKEN_DECIMALS}"),
            }
            .into());
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "database" }.into());
        }
        if !self.logging.is_known_format() {
            return Err(ConfigError::InvalidValue {
                field: "logging.format",
                reason: format!("'{}' is not one of pretty, json", self.logging.format),
            }
            .into());
        }
        check_url("toncenter.api_url", &self.toncenter.api_url)?;
        check_url("relay.url", &self.relay.url)?;
        Ok(())
    }

    /// Override the batch size, e.g. from the command line.
    ///
    /// # Errors
    ///
    /// Returns a config error if `limit` is outside `1..=100`.
    pub fn set_poll_limit(&mut self, limit: usize) -> Result<()> {
        if !(1..=MAX_POLL_LIMIT).contains(&limit) {
            return Err(ConfigError::InvalidValue {
                field: "--limit",
                reason: format!("must be between 1 and {MAX_POLL_LIMIT}"),
            }
            .into());
        }
        self.poll.limit = limit;
        Ok(())
    }

    /// The watched wallet, normalized.
    ///
    /// # Errors
    ///
    /// Returns a config error if the address is missing or unparseable.
    pub fn watched_address(&self) -> Result<NormalizedAddress> {
        required_address("WALLET_ADDRESS", self.wallet.address.as_deref())
    }

    /// The output-token contract, normalized.
    ///
    /// # Errors
    ///
    /// Returns a config error if the address is missing or unparseable.
    pub fn token_contract(&self) -> Result<NormalizedAddress> {
        required_address("CDT_CONTRACT", self.payout.token_contract.as_deref())
    }

    /// The operator key source; required for live runs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when neither variable is set.
    pub fn credential(&self) -> Result<&SigningCredential> {
        self.wallet.credential.as_ref().ok_or_else(|| {
            ConfigError::MissingField {
                field: "WALLET_MNEMONIC or WALLET_PRIVATE_KEY",
            }
            .into()
        })
    }

    #[must_use]
    pub fn reservation_timeout(&self) -> Duration {
        let secs = self
            .poll
            .reservation_timeout_secs
            .min(MAX_RESERVATION_TIMEOUT_SECS);
        Duration::seconds(i64::try_from(secs).unwrap_or(0))
    }

    /// Per-run settlement inputs.
    ///
    /// # Errors
    ///
    /// Returns a config error if an address does not normalize.
    pub fn settlement_settings(&self, dry_run: bool) -> Result<SettlementSettings> {
        Ok(SettlementSettings {
            watched: self.watched_address()?,
            token_contract: self.token_contract()?,
            rate: self.payout.rate,
            token_decimals: self.payout.token_decimals,
            forward_fee: self.payout.forward_fee_nano,
            limit: self.poll.limit,
            reservation_timeout: self.reservation_timeout(),
            memo_prefix: self.payout.memo_prefix.clone(),
            dry_run,
        })
    }
}

fn required_address(field: &'static str, value: Option<&str>) -> Result<NormalizedAddress> {
    let raw = value.ok_or(ConfigError::MissingField { field })?;
    normalize(raw).map_err(|err| {
        ConfigError::InvalidValue {
            field,
            reason: err.to_string(),
        }
        .into()
    })
}

fn parse_rate(raw: &str) -> Result<Rate> {
    let value = Decimal::from_str(raw).map_err(|e| ConfigError::InvalidValue {
        field: "FIXED_RATE",
        reason: format!("'{raw}': {e}"),
    })?;
    Rate::new(value).ok_or_else(|| {
        ConfigError::InvalidValue {
            field: "FIXED_RATE",
            reason: format!("must be positive, got {raw}"),
        }
        .into()
    })
}

fn check_url(field: &'static str, raw: &str) -> Result<()> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        field,
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::Error;

    const WALLET: &str = "0:1111111111111111111111111111111111111111111111111111111111111111";
    const TOKEN: &str = "0:3333333333333333333333333333333333333333333333333333333333333333";

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn base_env() -> Vec<(&'static str, &'static str)> {
        vec![("WALLET_ADDRESS", WALLET), ("CDT_CONTRACT", TOKEN)]
    }

    fn parse(content: &str, extra: &[(&'static str, &'static str)]) -> Result<Config> {
        let mut pairs = base_env();
        pairs.extend_from_slice(extra);
        Config::parse_with_env(content, env(&pairs))
    }

    fn invalid_field(err: Error) -> &'static str {
        match err {
            Error::Config(ConfigError::InvalidValue { field, .. })
            | Error::Config(ConfigError::MissingField { field }) => field,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_from_env_only() {
        let config = parse("", &[]).unwrap();
        assert_eq!(config.poll.limit, 10);
        assert_eq!(config.payout.rate.value(), dec!(20000));
        assert_eq!(config.payout.forward_fee_nano, 50_000_000);
        assert_eq!(config.toncenter.api_url, "https://toncenter.com/api/v2");
        assert_eq!(config.database, "tonsettle.db");
        assert_eq!(config.reservation_timeout(), Duration::seconds(600));
        assert!(config.wallet.credential.is_none());
        assert!(config.credential().is_err());
    }

    #[test]
    fn file_values_are_read() {
        let config = parse(
            r#"
            database = "/var/lib/tonsettle/ledger.db"

            [payout]
            rate = "1500.5"
            token_decimals = 6
            memo_prefix = "swap"

            [poll]
            limit = 50
            interval_secs = 5

            [toncenter]
            api_url = "https://testnet.toncenter.com/api/v2"

            [toncenter.http]
            retry_max_attempts = 5

            [logging]
            level = "debug"
            format = "json"
            "#,
            &[],
        )
        .unwrap();
        assert_eq!(config.payout.rate.value(), dec!(1500.5));
        assert_eq!(config.payout.token_decimals, 6);
        assert_eq!(config.poll.limit, 50);
        assert_eq!(config.toncenter.http.retry_max_attempts, 5);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.database, "/var/lib/tonsettle/ledger.db");
    }

    #[test]
    fn environment_overrides_file() {
        let config = parse(
            r#"
            [payout]
            rate = 100
            [poll]
            limit = 20
            "#,
            &[
                ("FIXED_RATE", "25000"),
                ("POLL_LIMIT", "100"),
                ("RELAY_URL", "https://relay.example.com"),
                ("TONSETTLE_DATABASE", "other.db"),
                ("TONCENTER_API_KEY", "key"),
                ("WALLET_PRIVATE_KEY", "00"),
            ],
        )
        .unwrap();
        assert_eq!(config.payout.rate.value(), dec!(25000));
        assert_eq!(config.poll.limit, 100);
        assert_eq!(config.relay.url, "https://relay.example.com");
        assert_eq!(config.database, "other.db");
        assert_eq!(config.toncenter.api_key.as_deref(), Some("key"));
        assert_eq!(
            config.credential().unwrap(),
            &SigningCredential::PrivateKey("00".into())
        );
    }

    #[test]
    fn secrets_in_file_are_ignored() {
        let config = parse(
            r#"
            [toncenter]
            api_key = "leaked"
            "#,
            &[],
        )
        .unwrap();
        assert!(config.toncenter.api_key.is_none());
    }

    #[test]
    fn missing_wallet_is_reported() {
        let err = Config::parse_with_env("", env(&[("CDT_CONTRACT", TOKEN)])).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(invalid_field(err), "WALLET_ADDRESS");
    }

    #[test]
    fn bad_addresses_are_config_errors() {
        let err = Config::parse_with_env(
            "",
            env(&[("WALLET_ADDRESS", "not-an-address"), ("CDT_CONTRACT", TOKEN)]),
        )
        .unwrap_err();
        assert_eq!(invalid_field(err), "WALLET_ADDRESS");
    }

    #[test]
    fn poll_limit_bounds() {
        assert_eq!(invalid_field(parse("", &[("POLL_LIMIT", "0")]).unwrap_err()), "poll.limit");
        assert_eq!(invalid_field(parse("", &[("POLL_LIMIT", "101")]).unwrap_err()), "poll.limit");
        assert_eq!(invalid_field(parse("", &[("POLL_LIMIT", "ten")]).unwrap_err()), "POLL_LIMIT");
        assert!(parse("", &[("POLL_LIMIT", "1")]).is_ok());
    }

    #[test]
    fn rate_must_be_positive() {
        assert_eq!(invalid_field(parse("", &[("FIXED_RATE", "0")]).unwrap_err()), "FIXED_RATE");
        assert_eq!(invalid_field(parse("", &[("FIXED_RATE", "-3")]).unwrap_err()), "FIXED_RATE");
        assert_eq!(invalid_field(parse("", &[("FIXED_RATE", "abc")]).unwrap_err()), "FIXED_RATE");
        assert!(matches!(
            parse("[payout]\nrate = \"0\"", &[]),
            Err(Error::Config(ConfigError::Parse(_)))
        ));
    }

    #[test]
    fn both_key_sources_conflict() {
        let err = parse(
            "",
            &[("WALLET_MNEMONIC", "a b c"), ("WALLET_PRIVATE_KEY", "00")],
        )
        .unwrap_err();
        assert_eq!(invalid_field(err), "WALLET_MNEMONIC");
    }

    #[test]
    fn blank_variables_count_as_unset() {
        let config = parse("", &[("FIXED_RATE", "  "), ("WALLET_MNEMONIC", "")]).unwrap();
        assert_eq!(config.payout.rate, Rate::default());
        assert!(config.wallet.credential.is_none());
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let err = parse("[logging]\nformat = \"xml\"", &[]).unwrap_err();
        assert_eq!(invalid_field(err), "logging.format");
    }

    #[test]
    fn settlement_settings_carry_normalized_addresses() {
        let config = parse("", &[]).unwrap();
        let settings = config.settlement_settings(true).unwrap();
        assert_eq!(settings.watched, normalize(WALLET).unwrap());
        assert_eq!(settings.token_contract, normalize(TOKEN).unwrap());
        assert_eq!(settings.limit, 10);
        assert!(settings.dry_run);
    }
}
