//! Miette-based error diagnostics for CLI error presentation.
//!
//! Converts crate errors into diagnostics with a stable code and, where the
//! fix is predictable, a help line.

use std::fmt::Display;

use miette::Diagnostic;
use thiserror::Error;

use crate::error::{ConfigError, Error, LedgerError, TransportError};

/// A command failure as shown to the operator.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CliDiagnostic {
    /// Human-readable error message.
    pub message: String,

    /// Stable diagnostic code, e.g. `tonsettle::config`.
    pub code: &'static str,

    /// Optional help text with suggestions for fixing the error.
    pub help: Option<String>,
}

impl Diagnostic for CliDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.help
            .as_ref()
            .map(|help| Box::new(help) as Box<dyn Display + 'a>)
    }
}

impl CliDiagnostic {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            help: None,
        }
    }

    /// Add a help suggestion to the error.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl From<&Error> for CliDiagnostic {
    fn from(err: &Error) -> Self {
        let message = err.to_string();
        match err {
            Error::Config(ConfigError::MissingField { field }) => {
                Self::new("tonsettle::config", message)
                    .with_help(format!("set {field} in the environment or .env file"))
            }
            Error::Config(ConfigError::ReadFile(_)) => Self::new("tonsettle::config", message)
                .with_help("pass --config with an existing file, or omit it to use the environment"),
            Error::Config(_) => Self::new("tonsettle::config", message),
            Error::Transport(TransportError::Unavailable { .. } | TransportError::Http(_)) => {
                Self::new("tonsettle::transport", message)
                    .with_help("check network access and the toncenter/relay URLs")
            }
            Error::Transport(_) | Error::RejectedByNetwork(_) => {
                Self::new("tonsettle::transport", message)
            }
            Error::Ledger(LedgerError::UnknownHash { .. }) => Self::new("tonsettle::ledger", message)
                .with_help("run `tonsettle ledger list` to see known hashes"),
            Error::Ledger(LedgerError::InvalidTransition { .. }) => {
                Self::new("tonsettle::ledger", message)
                    .with_help("release takes a rejected entry; settle takes a reserved one")
            }
            Error::Unrecorded {
                hash, external_ref, ..
            } => Self::new("tonsettle::unrecorded", message).with_help(format!(
                "confirm {external_ref} with the relay, then run \
                 `tonsettle ledger settle {hash} --ref {external_ref}` before the next run"
            )),
            Error::Ledger(_) | Error::Database(_) | Error::Connection(_) => {
                Self::new("tonsettle::ledger", message)
            }
            Error::Signing(_) => Self::new("tonsettle::signing", message)
                .with_help("WALLET_PRIVATE_KEY takes hex; WALLET_MNEMONIC takes 24 words"),
            _ => Self::new("tonsettle::error", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_suggests_env() {
        let err: Error = ConfigError::MissingField {
            field: "WALLET_ADDRESS",
        }
        .into();
        let diagnostic = CliDiagnostic::from(&err);
        assert_eq!(diagnostic.code, "tonsettle::config");
        assert!(diagnostic
            .help
            .as_deref()
            .is_some_and(|help| help.contains("WALLET_ADDRESS")));
    }

    #[test]
    fn unrecorded_transfer_names_the_reconciling_command() {
        let err = Error::Unrecorded {
            hash: "h1".into(),
            external_ref: "transfer-h1".into(),
            reason: "database is locked".into(),
        };
        let diagnostic = CliDiagnostic::from(&err);
        assert_eq!(diagnostic.code, "tonsettle::unrecorded");
        assert!(diagnostic
            .help
            .as_deref()
            .is_some_and(|help| help.contains("tonsettle ledger settle h1 --ref transfer-h1")));
    }

    #[test]
    fn unknown_hash_points_at_list() {
        let err = Error::Ledger(LedgerError::UnknownHash { hash: "h1".into() });
        let diagnostic = CliDiagnostic::from(&err);
        assert_eq!(diagnostic.code, "tonsettle::ledger");
        assert!(diagnostic.message.contains("h1"));
    }
}
