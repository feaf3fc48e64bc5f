use confidential_nft_primitives::{
    Address, Count, Ledger, MetadataReference, PublicQuery, QueryValue, TokenId,
};

use crate::Failure;

/// Plaintext reads. Each call is independent and may run concurrently with
/// any other.
pub struct PublicStateReader<'a, L> {
    ledger: &'a L,
}

impl<'a, L: Ledger> PublicStateReader<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        PublicStateReader { ledger }
    }

    pub async fn total_supply(&self) -> Result<Count, Failure> {
        match self.ask(PublicQuery::TotalSupply).await? {
            QueryValue::Count(n) => Ok(n),
            other => Err(unexpected(PublicQuery::TotalSupply, &other)),
        }
    }

    /// `None` when the token does not exist.
    pub async fn metadata_of(&self, id: TokenId) -> Result<Option<MetadataReference>, Failure> {
        let query = PublicQuery::MetadataOf(id);
        match self.ask(query).await? {
            QueryValue::Metadata(metadata) => Ok(metadata),
            other => Err(unexpected(query, &other)),
        }
    }

    /// `None` when the token does not exist.
    pub async fn public_owner_of(&self, id: TokenId) -> Result<Option<Address>, Failure> {
        let query = PublicQuery::PublicOwnerOf(id);
        match self.ask(query).await? {
            QueryValue::Owner(owner) => Ok(owner),
            other => Err(unexpected(query, &other)),
        }
    }

    async fn ask(&self, query: PublicQuery) -> Result<QueryValue, Failure> {
        self.ledger
            .query(query)
            .await
            .map_err(|e| Failure::QueryFailed {
                query: query.name(),
                reason: e.to_string(),
            })
    }
}

fn unexpected(query: PublicQuery, got: &QueryValue) -> Failure {
    Failure::QueryFailed {
        query: query.name(),
        reason: format!("unexpected response {got:?}"),
    }
}
