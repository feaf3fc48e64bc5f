//! In-process development ledger.
//!
//! Executes a submission synchronously when it arrives and puts it in the
//! next block. Blocks are produced every `block_time` on the tokio clock; a
//! transaction is final `finality_depth` blocks after inclusion.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use confidential_nft_primitives::{
    Address, BlockNumber, Ledger, LedgerError, MetadataReference, PublicQuery, QueryValue,
    StateChangingRequest, Submission, TokenId, TxHash, TxStatus,
};
use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT as G;
use curve25519_dalek::scalar::Scalar;
use parity_scale_codec::Encode;
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::{debug, info};
use zkhe_primitives::{Ciphertext, address_point, point_to_bytes};
use zkhe_verifier::verify_input_proof;

#[derive(Debug, Clone)]
struct TokenRecord {
    metadata: MetadataReference,
    public_owner: Address,
    encrypted_owner: Ciphertext,
}

#[derive(Debug)]
struct TxRecord {
    block: BlockNumber,
    outcome: Result<(), String>,
}

#[derive(Default)]
struct ChainState {
    tokens: BTreeMap<TokenId, TokenRecord>,
    used_handles: HashSet<[u8; 32]>,
    txs: HashMap<TxHash, TxRecord>,
    nonce: u64,
}

pub struct DevLedger {
    contract: Address,
    network_sk: Scalar,
    network_pk: [u8; 32],
    block_time: Duration,
    finality_depth: BlockNumber,
    genesis: Instant,
    state: Mutex<ChainState>,
}

impl DevLedger {
    pub fn new(contract: Address, network_sk: Scalar) -> Self {
        let network_pk = point_to_bytes(&(network_sk * G));
        DevLedger {
            contract,
            network_sk,
            network_pk,
            block_time: Duration::from_secs(6),
            finality_depth: 2,
            genesis: Instant::now(),
            state: Mutex::new(ChainState::default()),
        }
    }

    pub fn with_block_time(mut self, block_time: Duration) -> Self {
        self.block_time = block_time;
        self
    }

    pub fn network_pk(&self) -> [u8; 32] {
        self.network_pk
    }

    pub fn current_block(&self) -> BlockNumber {
        (self.genesis.elapsed().as_millis() / self.block_time.as_millis().max(1)) as BlockNumber
    }

    /// Whether the stored encrypted owner of `id` decrypts to `who`. Only the
    /// network can answer this.
    pub fn encrypted_owner_is(&self, id: TokenId, who: &Address) -> bool {
        self.state()
            .tokens
            .get(&id)
            .is_some_and(|t| self.decrypts_to(&t.encrypted_owner, who))
    }

    fn decrypts_to(&self, ct: &Ciphertext, who: &Address) -> bool {
        // D - sk·C = mG
        ct.D - self.network_sk * ct.C == address_point(who.as_bytes())
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn execute(&self, submission: &Submission) -> Result<TxHash, LedgerError> {
        if submission.contract != self.contract {
            return Err(LedgerError::Rejected("unknown contract".into()));
        }

        let handles: Vec<[u8; 32]> = submission.request.handles().iter().map(|h| h.0).collect();
        let cts = verify_input_proof(
            &self.network_pk,
            submission.contract.as_bytes(),
            submission.submitter.as_bytes(),
            &handles,
            submission.request.proof().as_bytes(),
        )
        .map_err(|e| LedgerError::Rejected(format!("invalid input proof: {e:?}")))?;

        let block = self.current_block() + 1;
        let mut state = self.state();
        if handles.iter().any(|h| state.used_handles.contains(h)) {
            return Err(LedgerError::Rejected(
                "ciphertext handle already used".into(),
            ));
        }

        let outcome = match &submission.request {
            StateChangingRequest::Mint { metadata, .. } => {
                let id = state.tokens.len() as TokenId + 1;
                state.tokens.insert(
                    id,
                    TokenRecord {
                        metadata: metadata.clone(),
                        public_owner: submission.submitter,
                        encrypted_owner: cts[0],
                    },
                );
                info!(token_id = id, block, "minted");
                Ok(())
            }
            StateChangingRequest::Transfer {
                token_id,
                public_recipient,
                ..
            } => {
                let Some(token) = state.tokens.get(token_id).cloned() else {
                    return Err(LedgerError::Rejected(format!(
                        "token {token_id} does not exist"
                    )));
                };
                if token.public_owner != submission.submitter {
                    Err("caller is not the owner".to_string())
                } else if !self.decrypts_to(&cts[0], &token.public_owner) {
                    Err("current owner claim does not match".to_string())
                } else {
                    state.tokens.insert(
                        *token_id,
                        TokenRecord {
                            public_owner: *public_recipient,
                            encrypted_owner: cts[1],
                            ..token
                        },
                    );
                    info!(token_id, block, "transferred");
                    Ok(())
                }
            }
        };
        state.used_handles.extend(handles);

        state.nonce += 1;
        let mut hasher = Sha256::new();
        hasher.update(submission.encode());
        hasher.update(state.nonce.to_le_bytes());
        let tx = TxHash(hasher.finalize().into());
        debug!(tx = %tx, block, reverted = outcome.is_err(), "executed");
        state.txs.insert(tx, TxRecord { block, outcome });
        Ok(tx)
    }

    fn status(&self, tx: &TxHash) -> Result<TxStatus, LedgerError> {
        let current = self.current_block();
        let state = self.state();
        let record = state
            .txs
            .get(tx)
            .ok_or_else(|| LedgerError::Rejected(format!("unknown transaction {tx}")))?;
        Ok(if current < record.block {
            TxStatus::Pending
        } else if current < record.block + self.finality_depth {
            TxStatus::Included {
                block: record.block,
            }
        } else {
            match &record.outcome {
                Ok(()) => TxStatus::Finalized {
                    block: record.block,
                },
                Err(reason) => TxStatus::Reverted {
                    reason: reason.clone(),
                },
            }
        })
    }

    fn answer(&self, query: PublicQuery) -> QueryValue {
        let state = self.state();
        match query {
            PublicQuery::TotalSupply => QueryValue::Count(state.tokens.len() as u64),
            PublicQuery::MetadataOf(id) => {
                QueryValue::Metadata(state.tokens.get(&id).map(|t| t.metadata.clone()))
            }
            PublicQuery::PublicOwnerOf(id) => {
                QueryValue::Owner(state.tokens.get(&id).map(|t| t.public_owner))
            }
        }
    }
}

impl Ledger for DevLedger {
    async fn execute_state_change(&self, submission: &Submission) -> Result<TxHash, LedgerError> {
        self.execute(submission)
    }

    async fn transaction_status(&self, tx: &TxHash) -> Result<TxStatus, LedgerError> {
        self.status(tx)
    }

    async fn query(&self, query: PublicQuery) -> Result<QueryValue, LedgerError> {
        Ok(self.answer(query))
    }
}
