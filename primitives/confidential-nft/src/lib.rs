//! Types and traits for confidential-owner collectibles.
//!
//! A token's existence, metadata and public owner-of-record are plaintext
//! ledger state. Its *confidential owner* only ever leaves the client as a
//! ciphertext handle plus an input proof produced by an [`EncryptionBackend`].
//! The ledger itself sits behind [`Ledger`].

mod address;

pub use address::{Address, ADDRESS_LEN};

use core::{fmt, future::Future};

use parity_scale_codec::{Decode, Encode, Input, MaxEncodedLen};
use scale_info::TypeInfo;
use thiserror::Error;

pub type TokenId = u64;
pub type Count = u64;
pub type BlockNumber = u64;

/// Maximum proof blob accepted alongside ciphertext handles.
pub const MAX_PROOF_LEN: usize = 8192;
/// Maximum metadata URI length in bytes.
pub const MAX_METADATA_LEN: usize = 2048;

/// Handles per operation, in submission order.
pub const MINT_HANDLES: usize = 1;
pub const TRANSFER_HANDLES: usize = 2;

/// Rejections raised before any cryptographic or network work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("address must be 40 hex digits, got {0}")]
    AddressLength(usize),
    #[error("address contains non-hex characters")]
    AddressNotHex,
    #[error("address checksum mismatch")]
    AddressChecksum,
    #[error("zero address is not allowed")]
    ZeroAddress,
    #[error("metadata reference is empty")]
    EmptyMetadata,
    #[error("metadata reference is {len} bytes, max {max}")]
    MetadataTooLong { len: usize, max: usize },
    #[error("token id {0} is invalid, ids start at 1")]
    InvalidTokenId(TokenId),
}

/// Public metadata URI of a token (e.g. `ipfs://…`).
#[derive(Clone, PartialEq, Eq, Hash, Encode, TypeInfo)]
pub struct MetadataReference(String);

impl MetadataReference {
    pub fn new(uri: &str) -> Result<Self, ValidationError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(ValidationError::EmptyMetadata);
        }
        if uri.len() > MAX_METADATA_LEN {
            return Err(ValidationError::MetadataTooLong {
                len: uri.len(),
                max: MAX_METADATA_LEN,
            });
        }
        Ok(MetadataReference(uri.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Only canonical references decode: already trimmed, non-empty and within
/// `MAX_METADATA_LEN`.
impl Decode for MetadataReference {
    fn decode<I: Input>(input: &mut I) -> Result<Self, parity_scale_codec::Error> {
        let raw = String::decode(input)?;
        match MetadataReference::new(&raw) {
            Ok(metadata) if metadata.0 == raw => Ok(metadata),
            _ => Err("invalid metadata reference".into()),
        }
    }
}

impl fmt::Display for MetadataReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MetadataReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetadataReference({:?})", self.0)
    }
}

impl PartialEq<&str> for MetadataReference {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

pub fn ensure_token_id(id: TokenId) -> Result<TokenId, ValidationError> {
    if id == 0 {
        Err(ValidationError::InvalidTokenId(id))
    } else {
        Ok(id)
    }
}

/// Opaque reference to one encrypted identity, scoped to the
/// `(contract, submitter)` pair it was produced for.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Encode, Decode, MaxEncodedLen, TypeInfo)]
pub struct CiphertextHandle(pub [u8; 32]);

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle(0x{})", hex::encode(self.0))
    }
}

/// Proof covering every handle of one encoding batch, in order.
#[derive(Clone, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct InputProof(Vec<u8>);

impl InputProof {
    pub fn new(bytes: Vec<u8>) -> Result<Self, EncodingError> {
        if bytes.is_empty() {
            return Err(EncodingError::Rejected("empty input proof".into()));
        }
        if bytes.len() > MAX_PROOF_LEN {
            return Err(EncodingError::Rejected(format!(
                "input proof is {} bytes, max {MAX_PROOF_LEN}",
                bytes.len()
            )));
        }
        Ok(InputProof(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for InputProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputProof({} bytes)", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// No key material to bind the batch to `(contract, submitter)`.
    #[error("no active encryption session: {0}")]
    NoSession(String),
    #[error("input rejected: {0}")]
    Rejected(String),
    #[error("batch has {got} handles, {kind} needs {expected}")]
    BatchShape {
        kind: OperationKind,
        expected: usize,
        got: usize,
    },
}

/// Output of one encoding batch. Deliberately not `Clone`: a batch turns into
/// exactly one request.
#[derive(Debug)]
pub struct EncryptedInput {
    handles: Vec<CiphertextHandle>,
    proof: InputProof,
}

impl EncryptedInput {
    pub fn new(handles: Vec<CiphertextHandle>, proof: InputProof) -> Self {
        EncryptedInput { handles, proof }
    }

    pub fn handles(&self) -> &[CiphertextHandle] {
        &self.handles
    }

    pub fn proof(&self) -> &InputProof {
        &self.proof
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn expect_shape(
        self,
        kind: OperationKind,
        expected: usize,
    ) -> Result<(Vec<CiphertextHandle>, InputProof), EncodingError> {
        if self.handles.len() != expected {
            return Err(EncodingError::BatchShape {
                kind,
                expected,
                got: self.handles.len(),
            });
        }
        Ok((self.handles, self.proof))
    }
}

/// Encryption/proof collaborator.
pub trait EncryptionBackend {
    type Builder: InputBuilder;

    /// Open a batch bound to `contract` and `submitter`.
    fn new_input_builder(
        &self,
        contract: &Address,
        submitter: &Address,
    ) -> Result<Self::Builder, EncodingError>;
}

pub trait InputBuilder {
    fn add_identity(&mut self, value: &Address);

    /// Encrypt everything added so far and prove it as one batch.
    fn build(self) -> Result<EncryptedInput, EncodingError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode, MaxEncodedLen, TypeInfo)]
pub enum OperationKind {
    Mint,
    Transfer,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Mint => f.write_str("mint"),
            OperationKind::Transfer => f.write_str("transfer"),
        }
    }
}

/// A state change carrying encrypted owner claims. Built only from a complete
/// [`EncryptedInput`] of the right arity.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub enum StateChangingRequest {
    Mint {
        metadata: MetadataReference,
        owner_handle: CiphertextHandle,
        proof: InputProof,
    },
    Transfer {
        token_id: TokenId,
        public_recipient: Address,
        current_owner_handle: CiphertextHandle,
        new_owner_handle: CiphertextHandle,
        proof: InputProof,
    },
}

impl StateChangingRequest {
    pub fn mint(metadata: MetadataReference, input: EncryptedInput) -> Result<Self, EncodingError> {
        let (handles, proof) = input.expect_shape(OperationKind::Mint, MINT_HANDLES)?;
        Ok(StateChangingRequest::Mint {
            metadata,
            owner_handle: handles[0],
            proof,
        })
    }

    /// `input` must hold `[current owner, new owner]` in that order.
    pub fn transfer(
        token_id: TokenId,
        public_recipient: Address,
        input: EncryptedInput,
    ) -> Result<Self, EncodingError> {
        let (handles, proof) = input.expect_shape(OperationKind::Transfer, TRANSFER_HANDLES)?;
        Ok(StateChangingRequest::Transfer {
            token_id,
            public_recipient,
            current_owner_handle: handles[0],
            new_owner_handle: handles[1],
            proof,
        })
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            StateChangingRequest::Mint { .. } => OperationKind::Mint,
            StateChangingRequest::Transfer { .. } => OperationKind::Transfer,
        }
    }

    /// Handles in the order the proof was generated over.
    pub fn handles(&self) -> Vec<CiphertextHandle> {
        match self {
            StateChangingRequest::Mint { owner_handle, .. } => vec![*owner_handle],
            StateChangingRequest::Transfer {
                current_owner_handle,
                new_owner_handle,
                ..
            } => vec![*current_owner_handle, *new_owner_handle],
        }
    }

    pub fn proof(&self) -> &InputProof {
        match self {
            StateChangingRequest::Mint { proof, .. } => proof,
            StateChangingRequest::Transfer { proof, .. } => proof,
        }
    }
}

/// What actually goes to the ledger: the request plus who sends it where.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct Submission {
    pub contract: Address,
    pub submitter: Address,
    pub request: StateChangingRequest,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Encode, Decode, MaxEncodedLen, TypeInfo)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

/// Ledger-reported lifecycle of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub enum TxStatus {
    /// Accepted by the network, not yet ordered.
    Pending,
    /// Ordered, not yet irreversible.
    Included { block: BlockNumber },
    Finalized { block: BlockNumber },
    /// Executed, but the operation's own precondition failed.
    Reverted { reason: String },
    /// Evicted without execution.
    Dropped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Refused before execution (bad proof, unknown token, reused handle, …).
    #[error("rejected: {0}")]
    Rejected(String),
    /// Executed and reverted synchronously.
    #[error("reverted: {0}")]
    Reverted(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub enum PublicQuery {
    TotalSupply,
    MetadataOf(TokenId),
    PublicOwnerOf(TokenId),
}

impl PublicQuery {
    pub fn name(&self) -> &'static str {
        match self {
            PublicQuery::TotalSupply => "totalSupply",
            PublicQuery::MetadataOf(_) => "tokenURI",
            PublicQuery::PublicOwnerOf(_) => "ownerOf",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub enum QueryValue {
    Count(Count),
    Metadata(Option<MetadataReference>),
    Owner(Option<Address>),
}

/// Ledger collaborator. Holds the **truth** for tokens, owners and supply.
pub trait Ledger {
    /// Deliver one submission for atomic execution.
    fn execute_state_change(
        &self,
        submission: &Submission,
    ) -> impl Future<Output = Result<TxHash, LedgerError>> + Send;

    /// Read-only; must never mutate ledger state.
    fn transaction_status(
        &self,
        tx: &TxHash,
    ) -> impl Future<Output = Result<TxStatus, LedgerError>> + Send;

    fn query(
        &self,
        query: PublicQuery,
    ) -> impl Future<Output = Result<QueryValue, LedgerError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parity_scale_codec::{Decode, Encode};

    fn batch(n: usize) -> EncryptedInput {
        let handles = (0..n).map(|i| CiphertextHandle([i as u8; 32])).collect();
        EncryptedInput::new(handles, InputProof::new(vec![1, 2, 3]).unwrap())
    }

    #[test]
    fn metadata_is_trimmed_and_bounded() {
        assert_eq!(
            MetadataReference::new("  ipfs://abc \n").unwrap(),
            "ipfs://abc"
        );
        assert_eq!(
            MetadataReference::new("   ").unwrap_err(),
            ValidationError::EmptyMetadata
        );
        let long = "x".repeat(MAX_METADATA_LEN + 1);
        assert_eq!(
            MetadataReference::new(&long).unwrap_err(),
            ValidationError::MetadataTooLong {
                len: MAX_METADATA_LEN + 1,
                max: MAX_METADATA_LEN
            }
        );
    }

    #[test]
    fn token_zero_is_invalid() {
        assert_eq!(ensure_token_id(0), Err(ValidationError::InvalidTokenId(0)));
        assert_eq!(ensure_token_id(1), Ok(1));
    }

    #[test]
    fn proof_bounds() {
        assert!(InputProof::new(vec![]).is_err());
        assert!(InputProof::new(vec![0; MAX_PROOF_LEN]).is_ok());
        assert!(InputProof::new(vec![0; MAX_PROOF_LEN + 1]).is_err());
    }

    #[test]
    fn requests_need_the_right_arity() {
        let meta = MetadataReference::new("ipfs://abc").unwrap();
        let err = StateChangingRequest::mint(meta.clone(), batch(2)).unwrap_err();
        assert_eq!(
            err,
            EncodingError::BatchShape {
                kind: OperationKind::Mint,
                expected: 1,
                got: 2
            }
        );
        assert!(StateChangingRequest::mint(meta, batch(1)).is_ok());

        let to = Address::from_bytes([9; 20]);
        assert!(StateChangingRequest::transfer(1, to, batch(1)).is_err());
        let req = StateChangingRequest::transfer(1, to, batch(2)).unwrap();
        assert_eq!(req.kind(), OperationKind::Transfer);
        // order preserved: [current, new]
        assert_eq!(
            req.handles(),
            vec![CiphertextHandle([0; 32]), CiphertextHandle([1; 32])]
        );
    }

    #[test]
    fn submission_is_scale_encodable() {
        let submission = Submission {
            contract: Address::from_bytes([1; 20]),
            submitter: Address::from_bytes([2; 20]),
            request: StateChangingRequest::mint(
                MetadataReference::new("ipfs://abc").unwrap(),
                batch(1),
            )
            .unwrap(),
        };
        let bytes = submission.encode();
        assert_eq!(Submission::decode(&mut &bytes[..]).unwrap(), submission);
    }

    #[test]
    fn decoded_metadata_is_validated() {
        let ok = MetadataReference::new("ipfs://abc").unwrap();
        assert_eq!(MetadataReference::decode(&mut &ok.encode()[..]).unwrap(), ok);

        for raw in ["", "   ", " ipfs://abc "] {
            let bytes = raw.to_string().encode();
            assert!(MetadataReference::decode(&mut &bytes[..]).is_err());
        }
        let long = "x".repeat(MAX_METADATA_LEN + 1).encode();
        assert!(MetadataReference::decode(&mut &long[..]).is_err());
    }
}
