use core::fmt;
use std::time::Duration;

use confidential_nft_primitives::{EncodingError, TxHash, ValidationError};
use thiserror::Error;

/// Orchestrator entry point a failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Mint,
    Transfer,
    View,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Mint => "mint",
            Operation::Transfer => "transfer",
            Operation::View => "view",
        })
    }
}

/// Classified reason an operation did not complete. Nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
    #[error("encoding failed: {0}")]
    EncodingFailed(#[from] EncodingError),
    /// Refused before execution. Includes locally detected handle reuse and
    /// transactions the ledger dropped.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),
    #[error("execution reverted: {0}")]
    ExecutionReverted(String),
    /// The ledger did not answer in time. The transaction may still execute.
    #[error("submission timed out after {0:?}")]
    SubmissionTimedOut(Duration),
    #[error("transaction {tx} not finalized within {waited:?}")]
    ConfirmationTimedOut { tx: TxHash, waited: Duration },
    #[error("query {query} failed: {reason}")]
    QueryFailed { query: &'static str, reason: String },
}

/// Fieldless mirror of [`Failure`] for matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ValidationFailed,
    EncodingFailed,
    SubmissionRejected,
    ExecutionReverted,
    SubmissionTimedOut,
    ConfirmationTimedOut,
    QueryFailed,
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::ValidationFailed(_) => FailureKind::ValidationFailed,
            Failure::EncodingFailed(_) => FailureKind::EncodingFailed,
            Failure::SubmissionRejected(_) => FailureKind::SubmissionRejected,
            Failure::ExecutionReverted(_) => FailureKind::ExecutionReverted,
            Failure::SubmissionTimedOut(_) => FailureKind::SubmissionTimedOut,
            Failure::ConfirmationTimedOut { .. } => FailureKind::ConfirmationTimedOut,
            Failure::QueryFailed { .. } => FailureKind::QueryFailed,
        }
    }

    pub fn during(self, operation: Operation) -> ClientError {
        ClientError {
            operation,
            failure: self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {failure}")]
pub struct ClientError {
    pub operation: Operation,
    #[source]
    pub failure: Failure,
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        self.failure.kind()
    }
}
