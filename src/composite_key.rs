//! Composite master key
//!
//! The KDF input is built from the user's credentials: SHA-256 over the password hash
//! followed by the key-file hash. When a hardware token is enrolled, its response to
//! the KDF challenge is mixed in afterwards.

use sha2::Sha256;
use tracing::debug;

use crate::challenge::{perform_challenge, ChallengeHandler, HardwareKey};
use crate::crypto::{KdfParams, KeyDerivationFunction, SecureBytes};
use crate::error::Result;
use crate::progress::Progress;

#[derive(Clone, Default)]
pub struct CompositeKey {
    password_hash: Option<SecureBytes>,
    key_file_hash: Option<SecureBytes>,
}

impl CompositeKey {
    /// The password is hashed immediately; the caller keeps ownership of the plain text.
    pub fn new(password: Option<&[u8]>, key_file_hash: Option<SecureBytes>) -> Self {
        Self {
            password_hash: password.map(|p| SecureBytes::digest::<Sha256>(&[p])),
            key_file_hash,
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn has_key_file(&self) -> bool {
        self.key_file_hash.is_some()
    }

    /// Hash of the password and key-file components, in that order
    pub fn static_components(&self) -> SecureBytes {
        let parts: Vec<&[u8]> = [&self.password_hash, &self.key_file_hash]
            .into_iter()
            .flatten()
            .map(|hash| &hash[..])
            .collect();
        SecureBytes::digest::<Sha256>(&parts)
    }

    /// The 32-byte KDF input, with an optional challenge-response mixed in.
    pub fn combine(&self, response: Option<&[u8]>) -> SecureBytes {
        let mut key = self.static_components();
        if let Some(response) = response {
            let response_hash = SecureBytes::digest::<Sha256>(&[response]);
            key = SecureBytes::digest::<Sha256>(&[&key[..], &response_hash[..]]);
        }
        key
    }

    /// Ask the token in `token`'s slot, through `handler`, to answer the challenge
    /// `kdf` derives from `params` and combine the response into the key.
    pub fn combine_with_token(
        &self,
        handler: &dyn ChallengeHandler,
        token: &HardwareKey,
        kdf: &dyn KeyDerivationFunction,
        params: &KdfParams,
        progress: &Progress,
    ) -> Result<SecureBytes> {
        let challenge = kdf.get_challenge(params)?;
        debug!(kdf = kdf.name(), %token, "requesting hardware key response");
        let response = perform_challenge(handler, token, &challenge, progress)?;
        Ok(self.combine(Some(&response)))
    }
}

impl std::fmt::Debug for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeKey")
            .field("password", &self.has_password())
            .field("key_file", &self.has_key_file())
            .finish()
    }
}
