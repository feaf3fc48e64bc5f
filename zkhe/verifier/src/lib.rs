//! no_std verifier for encrypted address inputs.
//!
//! The ledger side of `zkhe-prover`: given the handles a request carries and
//! the input proof attached to it, check that
//! 1) the proof decodes and covers exactly as many ciphertexts as there are handles,
//! 2) every handle was derived from its ciphertext for this contract and this
//!    submitter, at this position,
//! 3) the batch Σ-proof holds for every entry under the single batch challenge.
//!
//! On success the ciphertexts are returned in handle order so the caller can
//! store them as the encrypted owner.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;


use alloc::vec::Vec;

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT as G, ristretto::RistrettoPoint, traits::IsIdentity,
};
use zkhe_primitives::{
    append_point, challenge_scalar as fs_chal, derive_handle, handles_eq, labels,
    new_transcript, parse_input_proof, point_from_bytes, AddressBytes, Ciphertext, Handle,
    InputContext, PrimitiveError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// Network key does not decode, or is the identity.
    BadNetworkKey,
    /// Proof bytes do not parse.
    Malformed(PrimitiveError),
    /// Proof covers a different number of values than handles were supplied.
    CountMismatch { handles: usize, proof: usize },
    /// Handles are not the ones derived from the proof's ciphertexts for this
    /// contract and submitter, in this order.
    HandleMismatch,
    /// Σ-proof equation failed for the entry at this index.
    BadProof(usize),
}

impl From<PrimitiveError> for VerifyError {
    fn from(e: PrimitiveError) -> Self {
        VerifyError::Malformed(e)
    }
}

/// Verify an input proof against the handles it is meant to back.
pub fn verify_input_proof(
    network_pk: &[u8; 32],
    contract: &AddressBytes,
    submitter: &AddressBytes,
    handles: &[Handle],
    proof: &[u8],
) -> Result<Vec<Ciphertext>, VerifyError> {
    let pk = point_from_bytes(network_pk).map_err(|_| VerifyError::BadNetworkKey)?;
    if pk.is_identity() {
        return Err(VerifyError::BadNetworkKey);
    }

    let parsed = parse_input_proof(proof)?;
    if parsed.ciphertexts.len() != handles.len() {
        return Err(VerifyError::CountMismatch {
            handles: handles.len(),
            proof: parsed.ciphertexts.len(),
        });
    }

    let ctx = InputContext {
        contract: *contract,
        submitter: *submitter,
        network_pk: pk,
    };

    let expected: Vec<Handle> = parsed
        .ciphertexts
        .iter()
        .enumerate()
        .map(|(index, ct)| derive_handle(&ctx, index as u8, ct))
        .collect();
    if !handles_eq(&expected, handles) {
        return Err(VerifyError::HandleMismatch);
    }

    let mut t = new_transcript(&ctx, handles, &parsed.ciphertexts);
    for sigma in &parsed.sigmas {
        append_point(&mut t, b"A1", &sigma.A1);
        append_point(&mut t, b"A2", &sigma.A2);
    }
    let c = fs_chal(&mut t, labels::CHAL_INPUT);

    for (index, (ct, sigma)) in parsed.ciphertexts.iter().zip(&parsed.sigmas).enumerate() {
        // z_k·G == A1 + c·C
        let lhs1: RistrettoPoint = sigma.z_k * G;
        let rhs1 = sigma.A1 + c * ct.C;
        // z_m·G + z_k·PK == A2 + c·D
        let lhs2 = sigma.z_m * G + sigma.z_k * pk;
        let rhs2 = sigma.A2 + c * ct.D;
        if lhs1 != rhs1 || lhs2 != rhs2 {
            return Err(VerifyError::BadProof(index));
        }
    }

    Ok(parsed.ciphertexts)
}
