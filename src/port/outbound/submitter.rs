//! Payout submission port.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{NormalizedAddress, TokenAmount, TxHash};
use crate::error::Result;

/// Everything the transfer collaborator needs to pay one deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutRequest {
    /// Deposit being paid; doubles as the transfer memo.
    pub deposit: TxHash,
    pub destination: NormalizedAddress,
    pub amount: TokenAmount,
    /// Output-token (jetton master) contract.
    pub token_contract: NormalizedAddress,
    /// TON attached to the transfer for fees, in nanotons.
    pub forward_fee: u64,
    pub memo: Option<String>,
}

/// Proof that a transfer was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    /// Reference assigned by the collaborator (message hash, job id, ...).
    pub external_ref: String,
}

/// Sends output-token transfers.
///
/// # Errors
///
/// Implementations return [`Error::Transport`](crate::error::Error::Transport)
/// when the request could not be delivered and
/// [`Error::RejectedByNetwork`](crate::error::Error::RejectedByNetwork) when
/// it was delivered and refused.
#[async_trait]
pub trait PayoutSubmitter: Send + Sync {
    async fn submit(&self, request: &PayoutRequest) -> Result<SubmissionReceipt>;

    fn submitter_name(&self) -> &'static str;
}

/// Submitter for runs that must never transfer (dry runs).
pub struct DisabledSubmitter;

#[async_trait]
impl PayoutSubmitter for DisabledSubmitter {
    async fn submit(&self, request: &PayoutRequest) -> Result<SubmissionReceipt> {
        tracing::warn!(hash = %request.deposit, "Transfer attempted with submission disabled");
        Err(crate::error::Error::Payout("submission disabled".into()))
    }

    fn submitter_name(&self) -> &'static str {
        "disabled"
    }
}
