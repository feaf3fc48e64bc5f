//! Scriptable collaborators for the orchestrator tests.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use confidential_nft_primitives::{
    Address, BlockNumber, CiphertextHandle, EncodingError, EncryptedInput, EncryptionBackend,
    InputBuilder, InputProof, Ledger, LedgerError, MetadataReference, PublicQuery, QueryValue,
    StateChangingRequest, Submission, TokenId, TxHash, TxStatus,
};
use tokio::time::{Instant, sleep};

pub const CONTRACT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const ALICE: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
pub const BOB: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";
pub const CAROL: &str = "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb";

pub fn addr(s: &str) -> Address {
    s.parse().expect("test address")
}

// ---------- Encryption backend ----------

/// Handles are `address(20) || batch(8) || index(1) || 0..`, so tests can
/// read back which identity sits where.
#[derive(Default)]
pub struct MockBackend {
    pub no_session: bool,
    /// Return one handle fewer than requested.
    pub short_batch: bool,
    builders: AtomicUsize,
    batches: Arc<Mutex<Vec<Vec<Address>>>>,
}

impl MockBackend {
    pub fn without_session() -> Self {
        MockBackend {
            no_session: true,
            ..Default::default()
        }
    }

    pub fn with_short_batch() -> Self {
        MockBackend {
            short_batch: true,
            ..Default::default()
        }
    }

    pub fn builder_calls(&self) -> usize {
        self.builders.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<Address>> {
        self.batches.lock().unwrap().clone()
    }
}

pub fn encoded_identity(handle: &CiphertextHandle) -> Address {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&handle.0[..20]);
    Address::from_bytes(bytes)
}

impl EncryptionBackend for MockBackend {
    type Builder = MockBuilder;

    fn new_input_builder(
        &self,
        _contract: &Address,
        _submitter: &Address,
    ) -> Result<MockBuilder, EncodingError> {
        let batch = self.builders.fetch_add(1, Ordering::SeqCst);
        if self.no_session {
            return Err(EncodingError::NoSession("wallet not connected".into()));
        }
        Ok(MockBuilder {
            batch: batch as u64,
            short: self.short_batch,
            values: Vec::new(),
            record: self.batches.clone(),
        })
    }
}

pub struct MockBuilder {
    batch: u64,
    short: bool,
    values: Vec<Address>,
    record: Arc<Mutex<Vec<Vec<Address>>>>,
}

impl InputBuilder for MockBuilder {
    fn add_identity(&mut self, value: &Address) {
        self.values.push(*value);
    }

    fn build(mut self) -> Result<EncryptedInput, EncodingError> {
        self.record.lock().unwrap().push(self.values.clone());
        if self.short {
            self.values.pop();
        }
        let handles = self
            .values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let mut h = [0u8; 32];
                h[..20].copy_from_slice(value.as_bytes());
                h[20..28].copy_from_slice(&self.batch.to_le_bytes());
                h[28] = index as u8;
                CiphertextHandle(h)
            })
            .collect();
        let proof = InputProof::new(self.batch.to_le_bytes().to_vec())?;
        Ok(EncryptedInput::new(handles, proof))
    }
}

// ---------- Ledger ----------

struct Token {
    metadata: MetadataReference,
    owner: Address,
    encrypted_owner: CiphertextHandle,
}

struct Tx {
    at: Instant,
    block: BlockNumber,
    outcome: Result<(), String>,
}

#[derive(Default)]
struct State {
    tokens: BTreeMap<TokenId, Token>,
    next_id: TokenId,
    used_handles: HashSet<CiphertextHandle>,
    txs: HashMap<TxHash, Tx>,
    submissions: Vec<Submission>,
    fail_next: Option<LedgerError>,
    failing_status_polls: usize,
    dropped: bool,
    failing_query: Option<&'static str>,
    misshapen_query: Option<&'static str>,
}

/// In-memory ledger on the tokio clock.
///
/// A submission executes when the call returns (after `submit_delay`). Its
/// status then reads `Pending` until `inclusion_delay`, `Included` until
/// `finality_delay`, then final.
pub struct MockLedger {
    pub submit_delay: Duration,
    pub inclusion_delay: Duration,
    pub finality_delay: Duration,
    state: Mutex<State>,
    status_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl Default for MockLedger {
    fn default() -> Self {
        MockLedger {
            submit_delay: Duration::from_millis(100),
            inclusion_delay: Duration::from_secs(2),
            finality_delay: Duration::from_secs(6),
            state: Mutex::new(State {
                next_id: 1,
                ..Default::default()
            }),
            status_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        }
    }
}

impl MockLedger {
    pub fn with_submit_delay(submit_delay: Duration) -> Self {
        MockLedger {
            submit_delay,
            ..Default::default()
        }
    }

    /// Every read named `query` (e.g. `"ownerOf"`) fails from now on.
    pub fn fail_query(&self, query: &'static str) {
        self.state.lock().unwrap().failing_query = Some(query);
    }

    /// Every read named `query` answers with a `Count` from now on.
    pub fn answer_wrong_shape(&self, query: &'static str) {
        self.state.lock().unwrap().misshapen_query = Some(query);
    }

    pub fn fail_next_submission(&self, e: LedgerError) {
        self.state.lock().unwrap().fail_next = Some(e);
    }

    pub fn fail_status_polls(&self, n: usize) {
        self.state.lock().unwrap().failing_status_polls = n;
    }

    pub fn drop_transactions(&self) {
        self.state.lock().unwrap().dropped = true;
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().unwrap().submissions.len()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn owner_of(&self, id: TokenId) -> Option<Address> {
        self.state.lock().unwrap().tokens.get(&id).map(|t| t.owner)
    }

    pub fn encrypted_owner_of(&self, id: TokenId) -> Option<CiphertextHandle> {
        self.state
            .lock()
            .unwrap()
            .tokens
            .get(&id)
            .map(|t| t.encrypted_owner)
    }

    pub fn supply(&self) -> usize {
        self.state.lock().unwrap().tokens.len()
    }

    fn execute(&self, submission: &Submission) -> Result<TxHash, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.submissions.push(submission.clone());
        if let Some(e) = state.fail_next.take() {
            return Err(e);
        }

        let handles = submission.request.handles();
        if handles.iter().any(|h| state.used_handles.contains(h)) {
            return Err(LedgerError::Rejected(
                "ciphertext handle already used".into(),
            ));
        }

        let outcome = match &submission.request {
            StateChangingRequest::Mint {
                metadata,
                owner_handle,
                ..
            } => {
                let id = state.next_id;
                state.next_id += 1;
                state.tokens.insert(
                    id,
                    Token {
                        metadata: metadata.clone(),
                        owner: submission.submitter,
                        encrypted_owner: *owner_handle,
                    },
                );
                Ok(())
            }
            StateChangingRequest::Transfer {
                token_id,
                public_recipient,
                new_owner_handle,
                ..
            } => {
                let Some(token) = state.tokens.get_mut(token_id) else {
                    return Err(LedgerError::Rejected(format!(
                        "token {token_id} does not exist"
                    )));
                };
                if token.owner != submission.submitter {
                    Err("caller is not the owner".to_string())
                } else {
                    token.owner = *public_recipient;
                    token.encrypted_owner = *new_owner_handle;
                    Ok(())
                }
            }
        };
        state.used_handles.extend(handles);

        let n = state.txs.len() as u64 + 1;
        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&n.to_le_bytes());
        let tx = TxHash(hash);
        state.txs.insert(
            tx,
            Tx {
                at: Instant::now(),
                block: n,
                outcome,
            },
        );
        Ok(tx)
    }

    fn status(&self, tx: &TxHash) -> Result<TxStatus, LedgerError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if state.failing_status_polls > 0 {
            state.failing_status_polls -= 1;
            return Err(LedgerError::Unavailable("node restarting".into()));
        }
        let dropped = state.dropped;
        let record = state
            .txs
            .get(tx)
            .ok_or_else(|| LedgerError::Rejected("unknown transaction".into()))?;
        if dropped {
            return Ok(TxStatus::Dropped {
                reason: "evicted from pool".into(),
            });
        }
        let age = record.at.elapsed();
        Ok(if age < self.inclusion_delay {
            TxStatus::Pending
        } else if age < self.finality_delay {
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

    fn answer(&self, query: PublicQuery) -> Result<QueryValue, LedgerError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.failing_query == Some(query.name()) {
            return Err(LedgerError::Unavailable("rpc timeout".into()));
        }
        if state.misshapen_query == Some(query.name()) {
            return Ok(QueryValue::Count(5));
        }
        Ok(match query {
            PublicQuery::TotalSupply => QueryValue::Count(state.tokens.len() as u64),
            PublicQuery::MetadataOf(id) => {
                QueryValue::Metadata(state.tokens.get(&id).map(|t| t.metadata.clone()))
            }
            PublicQuery::PublicOwnerOf(id) => {
                QueryValue::Owner(state.tokens.get(&id).map(|t| t.owner))
            }
        })
    }
}

impl Ledger for MockLedger {
    async fn execute_state_change(&self, submission: &Submission) -> Result<TxHash, LedgerError> {
        sleep(self.submit_delay).await;
        self.execute(submission)
    }

    async fn transaction_status(&self, tx: &TxHash) -> Result<TxStatus, LedgerError> {
        self.status(tx)
    }

    async fn query(&self, query: PublicQuery) -> Result<QueryValue, LedgerError> {
        self.answer(query)
    }
}
