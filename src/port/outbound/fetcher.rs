//! Transaction source port.

use async_trait::async_trait;

use crate::domain::{NormalizedAddress, TransactionRecord};
use crate::error::Result;

/// Source of recent transactions for an account.
#[async_trait]
pub trait TransactionFetcher: Send + Sync {
    /// Fetch up to `limit` of the most recent transactions, newest first.
    ///
    /// A "not ok" or malformed upstream response is reported as
    /// [`Error::Transport`](crate::error::Error::Transport); the caller
    /// treats it as an empty batch for the cycle.
    async fn fetch_recent(
        &self,
        address: &NormalizedAddress,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>>;

    /// Name of the upstream for logging.
    fn source_name(&self) -> &'static str;
}
