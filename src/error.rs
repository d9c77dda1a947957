use thiserror::Error;

use crate::domain::settlement::SettlementState;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Failures talking to the transaction source or the transfer relay.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("upstream returned not-ok response (code {code:?}): {message}")]
    NotOk { code: Option<i64>, message: String },

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("upstream unavailable: HTTP {status}")]
    Unavailable { status: u16 },
}

/// Settlement ledger errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("no settlement entry for {hash}")]
    UnknownHash { hash: String },

    #[error("cannot move {hash} from {from} to {to}")]
    InvalidTransition {
        hash: String,
        from: SettlementState,
        to: SettlementState,
    },

    #[error("corrupt ledger row for {hash}: {reason}")]
    Corrupt { hash: String, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("transfer rejected by network: {0}")]
    RejectedByNetwork(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("payout computation failed: {0}")]
    Payout(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    /// A confirmed transfer the ledger could not record. Recovery would
    /// treat the entry as unpaid, so settlement must stop until an operator
    /// records it.
    #[error("transfer {external_ref} for {hash} was sent but not recorded: {reason}")]
    Unrecorded {
        hash: String,
        external_ref: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Only configuration problems stop the process; everything else is
    /// reported and retried on a later cycle.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// True when no further cycle may run before operator intervention.
    #[must_use]
    pub const fn halts_settlement(&self) -> bool {
        matches!(self, Self::Unrecorded { .. })
    }

    /// True for failures where the counterpart never received the request.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(TransportError::Http(err))
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Self::Database(err.to_string())
    }
}
