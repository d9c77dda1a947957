use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::command::SourceArgs;
use crate::adapter::inbound::cli::{output, paths, source};
use crate::adapter::outbound::relay::SigningCredential;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Validate configuration without fetching or paying anything.
pub fn execute_config(config_path: Option<&Path>) -> Result<()> {
    let source_args = SourceArgs {
        config: config_path.map(Path::to_path_buf),
        database: None,
    };
    let config = source::load_config(&source_args)?;
    let origin = paths::resolve_config(config_path)
        .map_or_else(|| "environment".to_string(), |p| p.display().to_string());
    let key = key_source(&config);

    if output::is_json() {
        output::json_output(json!({
            "command": "check.config",
            "valid": true,
            "source": origin,
            "wallet": config.watched_address()?,
            "token_contract": config.token_contract()?,
            "rate": config.payout.rate.value(),
            "poll_limit": config.poll.limit,
            "database": config.database,
            "relay": config.relay.url,
            "toncenter_api_key": config.toncenter.api_key.is_some(),
            "signing_key": key,
        }));
        return Ok(());
    }

    output::section("Configuration Check");
    output::field("Config", &origin);
    output::success("Configuration is valid");

    output::section("Summary");
    output::field("Wallet", config.watched_address()?);
    output::field("Token", config.token_contract()?);
    output::field("Rate", config.payout.rate.value());
    output::field("Poll limit", config.poll.limit);
    output::field("Database", &config.database);
    output::field("Relay", &config.relay.url);
    if output::verbosity() > 0 {
        output::field("Toncenter", &config.toncenter.api_url);
        output::field("Fee (nano)", config.payout.forward_fee_nano);
    }

    if config.toncenter.api_key.is_some() {
        output::success("Toncenter API key detected");
    } else {
        output::warning("TONCENTER_API_KEY not set; requests will be rate limited");
    }

    match key {
        Some(kind) => output::success(&format!("Signing key detected ({kind})")),
        None => {
            output::warning("No signing key configured; only --dry-run is possible");
            output::hint("set WALLET_MNEMONIC or WALLET_PRIVATE_KEY");
        }
    }

    Ok(())
}

fn key_source(config: &Config) -> Option<&'static str> {
    config.credential().ok().map(|credential| match credential {
        SigningCredential::Mnemonic(_) => "mnemonic",
        SigningCredential::PrivateKey(_) => "private key",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::{TOKEN_RAW, WALLET_RAW};

    fn config_with(env: &[(&str, &str)]) -> Config {
        let env: Vec<(String, String)> = env
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::parse_with_env("", |key: &str| {
            env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    const ADDRESSES: [(&str, &str); 2] = [("WALLET_ADDRESS", WALLET_RAW), ("CDT_CONTRACT", TOKEN_RAW)];

    #[test]
    fn reports_key_kind_without_exposing_it() {
        assert_eq!(key_source(&config_with(&ADDRESSES)), None);

        let mut env = ADDRESSES.to_vec();
        env.push(("WALLET_PRIVATE_KEY", "ab"));
        assert_eq!(key_source(&config_with(&env)), Some("private key"));
    }
}
