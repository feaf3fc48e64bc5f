use std::time::Duration;

use confidential_nft_primitives::{BlockNumber, Ledger, TxHash, TxStatus};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::{Failure, PendingTransaction};

/// Where a finalized transaction landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reference {
    pub tx_hash: TxHash,
    pub block: BlockNumber,
}

/// Polls the ledger until a transaction is final.
///
/// Dropping the returned future stops the local wait only. The transaction
/// stays submitted.
pub struct ConfirmationTracker<'a, L> {
    ledger: &'a L,
    poll_interval: Duration,
}

impl<'a, L: Ledger> ConfirmationTracker<'a, L> {
    pub fn new(ledger: &'a L, poll_interval: Duration) -> Self {
        ConfirmationTracker {
            ledger,
            poll_interval,
        }
    }

    /// # Errors
    /// * `Failure::ExecutionReverted` - the ledger reverted the transaction
    /// * `Failure::SubmissionRejected` - the ledger dropped it without executing
    /// * `Failure::ConfirmationTimedOut` - not final within `wait`
    pub async fn wait_for_finality(
        &self,
        mut pending: PendingTransaction,
        wait: Duration,
    ) -> Result<Reference, Failure> {
        let tx = pending.tx_hash;
        let polled = timeout(wait, self.poll(&mut pending)).await;
        match polled {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(tx = %tx, status = ?pending.status, "gave up waiting for finality");
                Err(Failure::ConfirmationTimedOut { tx, waited: wait })
            }
        }
    }

    async fn poll(&self, pending: &mut PendingTransaction) -> Result<Reference, Failure> {
        loop {
            match self.ledger.transaction_status(&pending.tx_hash).await {
                Ok(status) => {
                    if status != pending.status {
                        debug!(tx = %pending.tx_hash, from = ?pending.status, to = ?status, "status");
                        pending.status = status;
                    }
                    match &pending.status {
                        TxStatus::Finalized { block } => {
                            return Ok(Reference {
                                tx_hash: pending.tx_hash,
                                block: *block,
                            });
                        }
                        TxStatus::Reverted { reason } => {
                            return Err(Failure::ExecutionReverted(reason.clone()));
                        }
                        TxStatus::Dropped { reason } => {
                            return Err(Failure::SubmissionRejected(format!("dropped: {reason}")));
                        }
                        TxStatus::Pending | TxStatus::Included { .. } => {}
                    }
                }
                // transient; the deadline bounds how long we keep trying
                Err(e) => warn!(tx = %pending.tx_hash, error = %e, "status query failed"),
            }
            sleep(self.poll_interval).await;
        }
    }
}
