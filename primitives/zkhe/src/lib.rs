//! Primitives shared between the ZK ElGamal input prover and verifier.
//!
//! An *input batch* is an ordered list of ElGamal ciphertexts, each encrypting
//! one 20-byte address under the network key, plus a single Σ-proof that covers
//! every ciphertext of the batch. Prover and verifier must build the exact same
//! transcript and derive the exact same handles, so everything feeding either
//! lives here.
//!
//! ## Input Proof Layout
//! ```text
//! version(1) || count(1) || ciphertext(64) * count || sigma(128) * count
//! ciphertext = C(32) || D(32)
//! sigma      = A1(32) || A2(32) || z_k(32) || z_m(32)
//! ```
//!
//! ## Handle Layout
//! ```text
//! sha256(domain || contract || submitter || network_pk || sdk_version || index || ct)[0..30]
//!     || index(1) || type_tag(1)
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec::Vec;

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT as G,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use merlin::Transcript;
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};

pub const SDK_VERSION: u32 = 1;
pub const PROOF_VERSION: u8 = 1;

pub const ADDRESS_LEN: usize = 20;
pub const HANDLE_LEN: usize = 32;
pub const CIPHERTEXT_LEN: usize = 64;
pub const SIGMA_LEN: usize = 128;
pub const PROOF_HEADER_LEN: usize = 2;

/// Upper bound on values per batch (keeps the proof well under 8 KiB).
pub const MAX_BATCH: usize = 8;

/// Encrypted-type tag stored in the last byte of every handle.
pub const ADDRESS_TYPE_TAG: u8 = 0x07;

pub type Handle = [u8; HANDLE_LEN];
pub type AddressBytes = [u8; ADDRESS_LEN];

pub mod labels {
    pub const PROTOCOL: &[u8] = b"zkhe/input";
    pub const PROTOCOL_V: &[u8] = b"v1";
    pub const HANDLE_DOMAIN: &[u8] = b"zkhe/input/handle";
    pub const CHAL_INPUT: &[u8] = b"chal_input";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveError {
    /// Bytes do not decode to a Ristretto point.
    InvalidPoint,
    /// Scalar is not reduced modulo the group order.
    NonCanonicalScalar,
    /// Proof length does not match its declared count.
    Length,
    UnsupportedVersion(u8),
    /// Batch count is zero or above [`MAX_BATCH`].
    BadCount(u8),
}

/// Twisted ElGamal ciphertext `(C, D) = (kG, mG + kPK)`.
#[allow(non_snake_case)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    pub C: RistrettoPoint,
    pub D: RistrettoPoint,
}

impl Ciphertext {
    pub fn to_bytes(&self) -> [u8; CIPHERTEXT_LEN] {
        let mut out = [0u8; CIPHERTEXT_LEN];
        out[0..32].copy_from_slice(self.C.compress().as_bytes());
        out[32..64].copy_from_slice(self.D.compress().as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; CIPHERTEXT_LEN]) -> Result<Self, PrimitiveError> {
        let mut c = [0u8; 32];
        let mut d = [0u8; 32];
        c.copy_from_slice(&bytes[0..32]);
        d.copy_from_slice(&bytes[32..64]);
        Ok(Ciphertext {
            C: point_from_bytes(&c)?,
            D: point_from_bytes(&d)?,
        })
    }
}

/// One Σ-proof entry proving knowledge of `(k, m)` for one ciphertext.
#[allow(non_snake_case)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SigmaEntry {
    pub A1: RistrettoPoint,
    pub A2: RistrettoPoint,
    pub z_k: Scalar,
    pub z_m: Scalar,
}

impl SigmaEntry {
    pub fn to_bytes(&self) -> [u8; SIGMA_LEN] {
        let mut out = [0u8; SIGMA_LEN];
        out[0..32].copy_from_slice(self.A1.compress().as_bytes());
        out[32..64].copy_from_slice(self.A2.compress().as_bytes());
        out[64..96].copy_from_slice(&self.z_k.to_bytes());
        out[96..128].copy_from_slice(&self.z_m.to_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; SIGMA_LEN]) -> Result<Self, PrimitiveError> {
        let mut buf = [0u8; 32];
        buf.copy_from_slice(&bytes[0..32]);
        let a1 = point_from_bytes(&buf)?;
        buf.copy_from_slice(&bytes[32..64]);
        let a2 = point_from_bytes(&buf)?;
        buf.copy_from_slice(&bytes[64..96]);
        let z_k = scalar_from_bytes(buf)?;
        buf.copy_from_slice(&bytes[96..128]);
        let z_m = scalar_from_bytes(buf)?;
        Ok(SigmaEntry {
            A1: a1,
            A2: a2,
            z_k,
            z_m,
        })
    }
}

/// Everything an input batch is bound to.
#[derive(Clone, Copy, Debug)]
pub struct InputContext {
    pub contract: AddressBytes,
    pub submitter: AddressBytes,
    pub network_pk: RistrettoPoint,
}

/// Transcript over the full, ordered batch. Prover and verifier draw the single
/// batch challenge from this.
pub fn new_transcript(ctx: &InputContext, handles: &[Handle], cts: &[Ciphertext]) -> Transcript {
    let mut t = Transcript::new(labels::PROTOCOL);
    t.append_message(b"proto", labels::PROTOCOL_V);
    t.append_message(b"sdk_version", &SDK_VERSION.to_le_bytes());
    t.append_message(b"contract", &ctx.contract);
    t.append_message(b"submitter", &ctx.submitter);
    append_point(&mut t, b"network_pk", &ctx.network_pk);
    t.append_u64(b"count", handles.len() as u64);
    for (handle, ct) in handles.iter().zip(cts) {
        t.append_message(b"handle", handle);
        append_point(&mut t, b"C", &ct.C);
        append_point(&mut t, b"D", &ct.D);
    }
    t
}

pub fn append_point(t: &mut Transcript, label: &'static [u8], p: &RistrettoPoint) {
    t.append_message(label, p.compress().as_bytes());
}

pub fn challenge_scalar(t: &mut Transcript, label: &'static [u8]) -> Scalar {
    let mut buf = [0u8; 64];
    t.challenge_bytes(label, &mut buf);
    Scalar::from_bytes_mod_order_wide(&buf)
}

pub fn point_to_bytes(p: &RistrettoPoint) -> [u8; 32] {
    p.compress().to_bytes()
}

pub fn point_from_bytes(bytes: &[u8; 32]) -> Result<RistrettoPoint, PrimitiveError> {
    CompressedRistretto(*bytes)
        .decompress()
        .ok_or(PrimitiveError::InvalidPoint)
}

fn scalar_from_bytes(bytes: [u8; 32]) -> Result<Scalar, PrimitiveError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes))
        .ok_or(PrimitiveError::NonCanonicalScalar)
}

/// Address as a little-endian scalar. 160 bits always fit below the group order.
pub fn address_scalar(address: &AddressBytes) -> Scalar {
    let mut wide = [0u8; 32];
    wide[..ADDRESS_LEN].copy_from_slice(address);
    Scalar::from_bytes_mod_order(wide)
}

/// `mG`, the point an address is encrypted as.
pub fn address_point(address: &AddressBytes) -> RistrettoPoint {
    address_scalar(address) * G
}

pub fn derive_handle(ctx: &InputContext, index: u8, ct: &Ciphertext) -> Handle {
    let mut hasher = Sha256::new();
    hasher.update(labels::HANDLE_DOMAIN);
    hasher.update(ctx.contract);
    hasher.update(ctx.submitter);
    hasher.update(point_to_bytes(&ctx.network_pk));
    hasher.update(SDK_VERSION.to_le_bytes());
    hasher.update([index]);
    hasher.update(ct.to_bytes());
    let digest = hasher.finalize();

    let mut handle = [0u8; HANDLE_LEN];
    handle[..30].copy_from_slice(&digest[..30]);
    handle[30] = index;
    handle[31] = ADDRESS_TYPE_TAG;
    handle
}

/// Constant-time comparison of two ordered handle lists.
pub fn handles_eq(a: &[Handle], b: &[Handle]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let eq = a
        .iter()
        .zip(b)
        .fold(Choice::from(1u8), |acc, (x, y)| acc & x[..].ct_eq(&y[..]));
    eq.into()
}

pub const fn input_proof_len(count: usize) -> usize {
    PROOF_HEADER_LEN + count * (CIPHERTEXT_LEN + SIGMA_LEN)
}

pub fn encode_input_proof(cts: &[Ciphertext], sigmas: &[SigmaEntry]) -> Vec<u8> {
    debug_assert_eq!(cts.len(), sigmas.len());
    let mut out = Vec::with_capacity(input_proof_len(cts.len()));
    out.push(PROOF_VERSION);
    out.push(cts.len() as u8);
    for ct in cts {
        out.extend_from_slice(&ct.to_bytes());
    }
    for sigma in sigmas {
        out.extend_from_slice(&sigma.to_bytes());
    }
    out
}

#[derive(Debug)]
pub struct ParsedInputProof {
    pub ciphertexts: Vec<Ciphertext>,
    pub sigmas: Vec<SigmaEntry>,
}

pub fn parse_input_proof(bytes: &[u8]) -> Result<ParsedInputProof, PrimitiveError> {
    if bytes.len() < PROOF_HEADER_LEN {
        return Err(PrimitiveError::Length);
    }
    if bytes[0] != PROOF_VERSION {
        return Err(PrimitiveError::UnsupportedVersion(bytes[0]));
    }
    let count = bytes[1];
    if count == 0 || count as usize > MAX_BATCH {
        return Err(PrimitiveError::BadCount(count));
    }
    let count = count as usize;
    if bytes.len() != input_proof_len(count) {
        return Err(PrimitiveError::Length);
    }

    let body = &bytes[PROOF_HEADER_LEN..];
    let (ct_bytes, sigma_bytes) = body.split_at(count * CIPHERTEXT_LEN);

    let mut ciphertexts = Vec::with_capacity(count);
    for chunk in ct_bytes.chunks_exact(CIPHERTEXT_LEN) {
        let mut raw = [0u8; CIPHERTEXT_LEN];
        raw.copy_from_slice(chunk);
        ciphertexts.push(Ciphertext::from_bytes(&raw)?);
    }

    let mut sigmas = Vec::with_capacity(count);
    for chunk in sigma_bytes.chunks_exact(SIGMA_LEN) {
        let mut raw = [0u8; SIGMA_LEN];
        raw.copy_from_slice(chunk);
        sigmas.push(SigmaEntry::from_bytes(&raw)?);
    }

    Ok(ParsedInputProof {
        ciphertexts,
        sigmas,
    })
}
