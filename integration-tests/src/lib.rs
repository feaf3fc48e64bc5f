//! End-to-end tests for confidential-owner collectibles
//!
//! This crate runs the client against [`ledger::DevLedger`], an in-process
//! ledger that behaves like the deployed collectible contract: it verifies
//! every input proof with `zkhe-verifier`, refuses reused handles, checks the
//! encrypted current-owner claim of a transfer, and moves transactions
//! through pending, included and finalized on a simulated block clock.
//!
//! ## Test Categories
//!
//! 1. **Mint**: encrypted owner recorded, supply and metadata public
//! 2. **Transfer**: owner transfers, non-owner reverts, forged batches rejected
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p integration-tests
//!
//! # Run with logging
//! RUST_LOG=debug cargo test -p integration-tests -- --nocapture
//! ```

pub mod helpers;
pub mod ledger;

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use tracing_subscriber::EnvFilter;

/// Network decryption key of the development ledger (deterministic)
pub fn network_keypair() -> (Scalar, RistrettoPoint) {
    let sk = Scalar::from(0xC0FFEEu64);
    let pk = sk * RISTRETTO_BASEPOINT_POINT;
    (sk, pk)
}

/// Install a `RUST_LOG`-filtered subscriber for tests not using `test-log`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Test accounts (EIP-55 reference addresses)
pub mod test_accounts {
    pub const CONTRACT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    pub const ALICE: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
    pub const BOB: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";
    pub const CHARLIE: &str = "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb";
}
