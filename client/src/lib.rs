//! # confidential-nft-client
//!
//! Mint, transfer and view collectibles whose owner identity stays encrypted
//! on the ledger while existence, metadata and the public owner-of-record
//! remain plaintext.
//!
//! ## Flow
//!
//! ```text
//! Orchestrator ─► IdentityEncoder ─► ClaimSubmitter ─► ConfirmationTracker ─► caller
//!      │
//!      └─(view)─► PublicStateReader
//! ```
//!
//! Every state-changing operation is strictly ordered: encode the identities
//! in one batch, submit exactly once, then poll until the transaction is
//! final or the confirmation deadline passes. Any failure aborts the
//! operation and is returned as a [`ClientError`] naming the operation.
//!
//! The encryption scheme and the ledger are collaborators behind the
//! [`EncryptionBackend`] and [`Ledger`] traits of
//! `confidential-nft-primitives`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let config = ClientConfig::from_file("client.json")?;
//! let client = Orchestrator::new(config, encryptor, ledger)?;
//!
//! let minted = client.mint("ipfs://abc", &me, &me).await?;
//! client.transfer_as_owner(1, &friend, &me).await?;
//! let view = client.view(1).await?;
//! ```
//!
//! [`EncryptionBackend`]: confidential_nft_primitives::EncryptionBackend
//! [`Ledger`]: confidential_nft_primitives::Ledger

mod config;
mod encoder;
mod error;
mod orchestrator;
mod reader;
mod submitter;
mod tracker;

#[cfg(test)]
mod mock;

pub use config::{ClientConfig, ConfigError};
pub use encoder::{IdentityEncoder, MAX_BATCH_VALUES};
pub use error::{ClientError, Failure, FailureKind, Operation};
pub use orchestrator::{ConfidentialOwner, Orchestrator, TokenView};
pub use reader::PublicStateReader;
pub use submitter::{ClaimSubmitter, HandleRegistry, PendingTransaction};
pub use tracker::{ConfirmationTracker, Reference};
