//! # zkhe-prover: Encrypted Address Inputs
//!
//! This crate provides client-side generation of encrypted inputs: it
//! ElGamal-encrypts one or more 20-byte addresses under the network key and
//! proves, in a single Σ-proof, that every ciphertext of the batch is
//! well-formed. The batch is bound to the contract that will consume it and to
//! the account that submits it.
//!
//! ## Batch Protocol
//!
//! For each address `m` (as a scalar) with fresh randomness `k`:
//! - ciphertext `(C, D) = (kG, mG + k·PK)`
//! - handle = digest over `(contract, submitter, PK, index, C, D)`, see
//!   [`zkhe_primitives::derive_handle`]
//!
//! One challenge `c` is drawn from a transcript over the whole ordered batch,
//! then for each entry the prover answers `z_k = a_k + c·k`, `z_m = a_m + c·m`
//! for commitments `A1 = a_k·G`, `A2 = a_m·G + a_k·PK`. Reordering, dropping or
//! splicing handles from another batch invalidates the challenge.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use confidential_nft_primitives::{EncryptionBackend, InputBuilder};
//! use zkhe_prover::ZkheEncryptor;
//!
//! let encryptor = ZkheEncryptor::from_public_key_bytes(&network_pk_bytes)?;
//! let mut builder = encryptor.new_input_builder(&contract, &submitter)?;
//! builder.add_identity(&current_owner);
//! builder.add_identity(&new_owner);
//! let input = builder.build()?; // two handles, one proof
//! ```
//!
//! ## Proof Byte Layout
//! ```text
//! version(1) || count(1) || (C||D)(64) * count || (A1||A2||z_k||z_m)(128) * count
//! ```

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicU64, Ordering};

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT as G, ristretto::RistrettoPoint, scalar::Scalar,
    traits::IsIdentity,
};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

use confidential_nft_primitives::{
    Address, CiphertextHandle, EncodingError, EncryptedInput, EncryptionBackend, InputBuilder,
    InputProof,
};
use zkhe_primitives::{
    AddressBytes, Ciphertext, Handle, InputContext, MAX_BATCH, SigmaEntry, address_scalar,
    append_point, challenge_scalar as fs_chal, derive_handle, encode_input_proof, labels,
    new_transcript, point_from_bytes,
};

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("malformed input: {0}")]
    Malformed(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

/// Generate a random scalar with full 256-bit entropy.
fn random_scalar<R: RngCore>(rng: &mut R) -> Scalar {
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    Scalar::from_bytes_mod_order_wide(&bytes)
}

pub struct AddressInput {
    pub contract: AddressBytes,
    pub submitter: AddressBytes,

    /// Network (threshold) encryption key.
    pub network_pk: RistrettoPoint,

    /// Plaintext addresses, in the order their handles must appear on-chain.
    pub values: Vec<AddressBytes>,

    /// Deterministic RNG seed (tests).
    pub rng_seed: [u8; 32],
}

pub struct AddressInputOutput {
    pub handles: Vec<Handle>,
    pub input_proof: Vec<u8>,
    pub ciphertexts: Vec<[u8; 64]>,
}

/// Encrypt `inp.values` and prove the batch.
///
/// # Errors
/// * `ProverError::InvalidInput` - empty or oversized batch, zero contract,
///   submitter or value
/// * `ProverError::Malformed` - the network key is the identity point
pub fn prove_address_input(inp: &AddressInput) -> Result<AddressInputOutput, ProverError> {
    if inp.values.is_empty() {
        return Err(ProverError::InvalidInput("empty batch"));
    }
    if inp.values.len() > MAX_BATCH {
        return Err(ProverError::InvalidInput("batch exceeds MAX_BATCH values"));
    }
    if inp.contract == [0u8; 20] {
        return Err(ProverError::InvalidInput("zero contract address"));
    }
    if inp.submitter == [0u8; 20] {
        return Err(ProverError::InvalidInput("zero submitter address"));
    }
    if inp.values.iter().any(|v| v == &[0u8; 20]) {
        return Err(ProverError::InvalidInput("zero address value"));
    }
    if inp.network_pk.is_identity() {
        return Err(ProverError::Malformed("network key is the identity point"));
    }

    let ctx = InputContext {
        contract: inp.contract,
        submitter: inp.submitter,
        network_pk: inp.network_pk,
    };
    let pk = inp.network_pk;
    let mut rng = ChaCha20Rng::from_seed(inp.rng_seed);

    let n = inp.values.len();
    let mut witnesses = Vec::with_capacity(n);
    let mut cts = Vec::with_capacity(n);
    let mut handles = Vec::with_capacity(n);
    for (index, value) in inp.values.iter().enumerate() {
        let m = address_scalar(value);
        let k = random_scalar(&mut rng); // ElGamal randomness
        let ct = Ciphertext {
            C: k * G,
            D: m * G + k * pk,
        };
        handles.push(derive_handle(&ctx, index as u8, &ct));
        cts.push(ct);
        witnesses.push((k, m));
    }

    let mut t = new_transcript(&ctx, &handles, &cts);

    // Σ-commitments, all appended before the single challenge
    let mut blinds = Vec::with_capacity(n);
    let mut commitments = Vec::with_capacity(n);
    for _ in 0..n {
        let a_k = random_scalar(&mut rng);
        let a_m = random_scalar(&mut rng);
        let a1 = a_k * G;
        let a2 = a_m * G + a_k * pk;
        append_point(&mut t, b"A1", &a1);
        append_point(&mut t, b"A2", &a2);
        blinds.push((a_k, a_m));
        commitments.push((a1, a2));
    }

    let c = fs_chal(&mut t, labels::CHAL_INPUT);

    let sigmas: Vec<SigmaEntry> = witnesses
        .iter()
        .zip(&blinds)
        .zip(&commitments)
        .map(|(((k, m), (a_k, a_m)), (a1, a2))| SigmaEntry {
            A1: *a1,
            A2: *a2,
            z_k: a_k + c * k,
            z_m: a_m + c * m,
        })
        .collect();

    Ok(AddressInputOutput {
        input_proof: encode_input_proof(&cts, &sigmas),
        ciphertexts: cts.iter().map(Ciphertext::to_bytes).collect(),
        handles,
    })
}

// ========================= EncryptionBackend =========================

/// [`EncryptionBackend`] over [`prove_address_input`].
///
/// The loaded network key is the session: without it no batch can be bound.
pub struct ZkheEncryptor {
    network_pk: Option<RistrettoPoint>,
    seed: Option<[u8; 32]>,
    batches: AtomicU64,
}

impl ZkheEncryptor {
    pub fn new(network_pk: RistrettoPoint) -> Self {
        ZkheEncryptor {
            network_pk: Some(network_pk),
            seed: None,
            batches: AtomicU64::new(0),
        }
    }

    pub fn from_public_key_bytes(bytes: &[u8; 32]) -> Result<Self, ProverError> {
        let pk = point_from_bytes(bytes)
            .map_err(|_| ProverError::Malformed("network key is not a Ristretto point"))?;
        if pk.is_identity() {
            return Err(ProverError::Malformed("network key is the identity point"));
        }
        Ok(Self::new(pk))
    }

    /// No network key loaded; every builder request fails.
    pub fn detached() -> Self {
        ZkheEncryptor {
            network_pk: None,
            seed: None,
            batches: AtomicU64::new(0),
        }
    }

    /// Derive every batch seed from `seed` instead of the thread RNG.
    pub fn with_seed(mut self, seed: [u8; 32]) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn network_pk(&self) -> Option<&RistrettoPoint> {
        self.network_pk.as_ref()
    }

    fn next_seed(&self) -> [u8; 32] {
        let batch = self.batches.fetch_add(1, Ordering::Relaxed);
        match self.seed {
            Some(seed) => {
                let mut hasher = Sha256::new();
                hasher.update(seed);
                hasher.update(batch.to_le_bytes());
                hasher.finalize().into()
            }
            None => {
                let mut seed = [0u8; 32];
                rand::rng().fill_bytes(&mut seed);
                seed
            }
        }
    }
}

impl EncryptionBackend for ZkheEncryptor {
    type Builder = AddressInputBuilder;

    fn new_input_builder(
        &self,
        contract: &Address,
        submitter: &Address,
    ) -> Result<Self::Builder, EncodingError> {
        let network_pk = self
            .network_pk
            .ok_or_else(|| EncodingError::NoSession("network key not loaded".into()))?;
        if contract.is_zero() || submitter.is_zero() {
            return Err(EncodingError::NoSession(
                "cannot bind input to the zero address".into(),
            ));
        }
        Ok(AddressInputBuilder {
            input: AddressInput {
                contract: *contract.as_bytes(),
                submitter: *submitter.as_bytes(),
                network_pk,
                values: Vec::new(),
                rng_seed: self.next_seed(),
            },
        })
    }
}

pub struct AddressInputBuilder {
    input: AddressInput,
}

impl InputBuilder for AddressInputBuilder {
    fn add_identity(&mut self, value: &Address) {
        self.input.values.push(*value.as_bytes());
    }

    fn build(self) -> Result<EncryptedInput, EncodingError> {
        let out = prove_address_input(&self.input)
            .map_err(|e| EncodingError::Rejected(e.to_string()))?;
        let handles = out.handles.into_iter().map(CiphertextHandle).collect();
        Ok(EncryptedInput::new(handles, InputProof::new(out.input_proof)?))
    }
}
