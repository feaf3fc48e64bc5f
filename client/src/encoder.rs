use confidential_nft_primitives::{
    Address, EncodingError, EncryptedInput, EncryptionBackend, InputBuilder, ValidationError,
};
use tracing::debug;

use crate::Failure;

/// Most identities a single batch may hold.
pub const MAX_BATCH_VALUES: usize = 8;

/// Turns plaintext identities into one batch of ciphertext handles plus a
/// single input proof, bound to `(contract, submitter)`.
pub struct IdentityEncoder<'a, B> {
    backend: &'a B,
    contract: Address,
}

impl<'a, B: EncryptionBackend> IdentityEncoder<'a, B> {
    pub fn new(backend: &'a B, contract: Address) -> Self {
        IdentityEncoder { backend, contract }
    }

    /// Handles come back in the order of `values`.
    ///
    /// # Errors
    /// * `Failure::ValidationFailed` - zero contract, submitter or value
    /// * `Failure::EncodingFailed` - empty or oversized batch, backend refusal,
    ///   or a backend that returned the wrong number of handles
    pub fn encode(
        &self,
        values: &[Address],
        submitter: &Address,
    ) -> Result<EncryptedInput, Failure> {
        self.contract.ensure_non_zero()?;
        submitter.ensure_non_zero()?;
        if values.is_empty() {
            return Err(EncodingError::Rejected("nothing to encode".into()).into());
        }
        if values.len() > MAX_BATCH_VALUES {
            return Err(EncodingError::Rejected(format!(
                "{} values exceed the batch limit of {MAX_BATCH_VALUES}",
                values.len()
            ))
            .into());
        }
        if values.iter().any(Address::is_zero) {
            return Err(ValidationError::ZeroAddress.into());
        }

        debug!(count = values.len(), "encoding identity batch");
        let mut builder = self.backend.new_input_builder(&self.contract, submitter)?;
        for value in values {
            builder.add_identity(value);
        }
        let input = builder.build()?;

        if input.len() != values.len() {
            return Err(EncodingError::Rejected(format!(
                "backend returned {} handles for {} values",
                input.len(),
                values.len()
            ))
            .into());
        }
        Ok(input)
    }
}
