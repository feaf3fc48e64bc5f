use core::fmt;

use confidential_nft_primitives::{
    Address, Count, EncryptionBackend, Ledger, MetadataReference, StateChangingRequest, TokenId,
    ensure_token_id,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    ClaimSubmitter, ClientConfig, ClientError, ConfigError, ConfirmationTracker, Failure,
    HandleRegistry, IdentityEncoder, Operation, PublicStateReader, Reference,
};

/// The encrypted owner as a view reports it: known to exist, never shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfidentialOwner;

impl fmt::Display for ConfidentialOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("*** (encrypted on-chain)")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenView {
    pub token_id: TokenId,
    pub metadata: MetadataReference,
    pub public_owner: Address,
    pub encrypted_owner: ConfidentialOwner,
    /// Supply observed in the same round of reads.
    pub total_supply: Count,
}

/// Mint, transfer and view, composed from the encoder, submitter, tracker
/// and reader.
pub struct Orchestrator<B, L> {
    config: ClientConfig,
    backend: B,
    ledger: L,
    registry: HandleRegistry,
}

impl<B: EncryptionBackend, L: Ledger> Orchestrator<B, L> {
    pub fn new(config: ClientConfig, backend: B, ledger: L) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Orchestrator {
            config,
            backend,
            ledger,
            registry: HandleRegistry::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn encoder(&self) -> IdentityEncoder<'_, B> {
        IdentityEncoder::new(&self.backend, self.config.contract)
    }

    pub fn submitter(&self) -> ClaimSubmitter<'_, L> {
        ClaimSubmitter::new(
            &self.ledger,
            &self.registry,
            self.config.contract,
            self.config.submission_timeout(),
        )
    }

    pub fn tracker(&self) -> ConfirmationTracker<'_, L> {
        ConfirmationTracker::new(&self.ledger, self.config.poll_interval())
    }

    pub fn reader(&self) -> PublicStateReader<'_, L> {
        PublicStateReader::new(&self.ledger)
    }

    /// Mint a token with public `metadata`, confidentially owned by `recipient`.
    #[instrument(skip_all, fields(op = "mint"))]
    pub async fn mint(
        &self,
        metadata: &str,
        recipient: &str,
        submitter: &str,
    ) -> Result<Reference, ClientError> {
        self.try_mint(metadata, recipient, submitter)
            .await
            .map_err(|failure| fail(Operation::Mint, failure))
    }

    async fn try_mint(
        &self,
        metadata: &str,
        recipient: &str,
        submitter: &str,
    ) -> Result<Reference, Failure> {
        let metadata = MetadataReference::new(metadata)?;
        let recipient = Address::parse_non_zero(recipient)?;
        let submitter = Address::parse_non_zero(submitter)?;

        let input = self.encoder().encode(&[recipient], &submitter)?;
        let request = StateChangingRequest::mint(metadata, input)?;
        self.submit_and_confirm(submitter, request).await
    }

    /// Move `token_id` from `current_owner` to `new_owner`, recording
    /// `public_recipient` as the plaintext owner.
    #[instrument(skip_all, fields(op = "transfer", token_id = token_id))]
    pub async fn transfer(
        &self,
        token_id: TokenId,
        current_owner: &str,
        new_owner: &str,
        public_recipient: &str,
        submitter: &str,
    ) -> Result<Reference, ClientError> {
        self.try_transfer(
            token_id,
            current_owner,
            new_owner,
            public_recipient,
            submitter,
        )
        .await
        .map_err(|failure| fail(Operation::Transfer, failure))
    }

    /// Transfer by the current owner to `new_owner`, who also becomes the
    /// public owner.
    pub async fn transfer_as_owner(
        &self,
        token_id: TokenId,
        new_owner: &str,
        owner: &str,
    ) -> Result<Reference, ClientError> {
        self.transfer(token_id, owner, new_owner, new_owner, owner).await
    }

    async fn try_transfer(
        &self,
        token_id: TokenId,
        current_owner: &str,
        new_owner: &str,
        public_recipient: &str,
        submitter: &str,
    ) -> Result<Reference, Failure> {
        let token_id = ensure_token_id(token_id)?;
        let current_owner = Address::parse_non_zero(current_owner)?;
        let new_owner = Address::parse_non_zero(new_owner)?;
        let public_recipient = Address::parse_non_zero(public_recipient)?;
        let submitter = Address::parse_non_zero(submitter)?;

        // one batch, [current, new]
        let input = self
            .encoder()
            .encode(&[current_owner, new_owner], &submitter)?;
        let request = StateChangingRequest::transfer(token_id, public_recipient, input)?;
        self.submit_and_confirm(submitter, request).await
    }

    async fn submit_and_confirm(
        &self,
        submitter: Address,
        request: StateChangingRequest,
    ) -> Result<Reference, Failure> {
        let pending = self.submitter().submit(submitter, request).await?;
        debug!(tx = %pending.tx_hash, "awaiting finality");
        let reference = self
            .tracker()
            .wait_for_finality(pending, self.config.confirmation_timeout())
            .await?;
        info!(tx = %reference.tx_hash, block = reference.block, "finalized");
        Ok(reference)
    }

    /// Public facts about `token_id`, or `None` if it was never minted.
    #[instrument(skip_all, fields(op = "view", token_id = token_id))]
    pub async fn view(&self, token_id: TokenId) -> Result<Option<TokenView>, ClientError> {
        self.try_view(token_id)
            .await
            .map_err(|failure| fail(Operation::View, failure))
    }

    async fn try_view(&self, token_id: TokenId) -> Result<Option<TokenView>, Failure> {
        let token_id = ensure_token_id(token_id)?;
        let reader = self.reader();
        let (total_supply, metadata, public_owner) = futures::try_join!(
            reader.total_supply(),
            reader.metadata_of(token_id),
            reader.public_owner_of(token_id),
        )?;

        match (metadata, public_owner) {
            (Some(metadata), Some(public_owner)) => Ok(Some(TokenView {
                token_id,
                metadata,
                public_owner,
                encrypted_owner: ConfidentialOwner,
                total_supply,
            })),
            _ => {
                debug!("token not found");
                Ok(None)
            }
        }
    }
}

fn fail(operation: Operation, failure: Failure) -> ClientError {
    warn!(kind = ?failure.kind(), %failure, "{operation} failed");
    failure.during(operation)
}
