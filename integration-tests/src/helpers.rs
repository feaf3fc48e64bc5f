//! Helper functions for integration tests
//!
//! Wires the client to the development ledger with the real zkhe prover.

use std::time::Duration;

use anyhow::Result;
use confidential_nft_client::{ClientConfig, Orchestrator};
use confidential_nft_primitives::Address;
use zkhe_prover::ZkheEncryptor;

use crate::ledger::DevLedger;
use crate::network_keypair;
use crate::test_accounts::CONTRACT;

pub type DevClient = Orchestrator<ZkheEncryptor, DevLedger>;

/// Client with default timeouts, polling every 500ms, blocks every 6s.
pub fn dev_client() -> Result<DevClient> {
    dev_client_with(
        serde_json::json!({ "contract": CONTRACT, "poll_interval_ms": 500 }),
        Duration::from_secs(6),
    )
}

/// `config` is the client's JSON configuration.
pub fn dev_client_with(config: serde_json::Value, block_time: Duration) -> Result<DevClient> {
    let config = ClientConfig::from_json_str(&config.to_string())?;
    let (sk, _) = network_keypair();
    let ledger = DevLedger::new(config.contract, sk).with_block_time(block_time);
    let encryptor = ZkheEncryptor::from_public_key_bytes(&ledger.network_pk())?;
    Ok(Orchestrator::new(config, encryptor, ledger)?)
}

pub fn addr(s: &str) -> Result<Address> {
    Ok(Address::parse_non_zero(s)?)
}
