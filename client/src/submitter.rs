use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
    time::{Duration, SystemTime},
};

use confidential_nft_primitives::{
    Address, CiphertextHandle, Ledger, LedgerError, StateChangingRequest, Submission, TxHash,
    TxStatus,
};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::Failure;

/// Handles this client has already handed to the ledger.
///
/// Entries are never evicted: the set grows by one handle per mint and two per
/// transfer for as long as the registry lives. A registry that is dropped or
/// replaced forgets its handles, and from then on the ledger's own reuse check
/// is what refuses a replay.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    consumed: Mutex<HashSet<CiphertextHandle>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks every handle consumed, or none of them if any already was.
    pub fn consume(&self, handles: &[CiphertextHandle]) -> bool {
        let mut consumed = self.consumed.lock().unwrap_or_else(PoisonError::into_inner);
        if handles.iter().any(|h| consumed.contains(h)) {
            return false;
        }
        consumed.extend(handles.iter().copied());
        true
    }

    pub fn len(&self) -> usize {
        self.consumed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A request the ledger accepted and the tracker now owns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    pub tx_hash: TxHash,
    pub submitted_at: SystemTime,
    pub status: TxStatus,
}

pub struct ClaimSubmitter<'a, L> {
    ledger: &'a L,
    registry: &'a HandleRegistry,
    contract: Address,
    timeout: Duration,
}

impl<'a, L: Ledger> ClaimSubmitter<'a, L> {
    pub fn new(
        ledger: &'a L,
        registry: &'a HandleRegistry,
        contract: Address,
        timeout: Duration,
    ) -> Self {
        ClaimSubmitter {
            ledger,
            registry,
            contract,
            timeout,
        }
    }

    /// Deliver `request` as one atomic ledger call.
    ///
    /// Handles are burned before the call goes out, so a timed-out or
    /// cancelled submission cannot be replayed from this client.
    pub async fn submit(
        &self,
        submitter: Address,
        request: StateChangingRequest,
    ) -> Result<PendingTransaction, Failure> {
        if !self.registry.consume(&request.handles()) {
            warn!(kind = %request.kind(), "refusing to resubmit consumed handles");
            return Err(Failure::SubmissionRejected(
                "ciphertext handles were already submitted".into(),
            ));
        }

        let submission = Submission {
            contract: self.contract,
            submitter,
            request,
        };
        let submitted_at = SystemTime::now();
        debug!(kind = %submission.request.kind(), "submitting");

        match timeout(self.timeout, self.ledger.execute_state_change(&submission)).await {
            Err(_) => Err(Failure::SubmissionTimedOut(self.timeout)),
            Ok(Err(e)) => Err(classify(e)),
            Ok(Ok(tx_hash)) => {
                debug!(tx = %tx_hash, "accepted");
                Ok(PendingTransaction {
                    tx_hash,
                    submitted_at,
                    status: TxStatus::Pending,
                })
            }
        }
    }
}

fn classify(e: LedgerError) -> Failure {
    match e {
        LedgerError::Rejected(reason) => Failure::SubmissionRejected(reason),
        LedgerError::Reverted(reason) => Failure::ExecutionReverted(reason),
        LedgerError::Unavailable(reason) => {
            Failure::SubmissionRejected(format!("ledger unavailable: {reason}"))
        }
    }
}
