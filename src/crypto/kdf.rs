//! Key derivation interface shared by AES-KDF and Argon2

use rand::rngs::OsRng;
use rand::RngCore;

use super::{KdfParams, SecureBytes, Uuid};
use crate::error::{CryptoError, Result};
use crate::progress::Progress;

/// Salt / seed parameter, common to every KDF
pub const SALT_PARAM: &str = "S";

/// Length of generated salts and seeds (256 bits)
pub const SALT_LEN: usize = 32;

/// Length of every transformed key (256 bits)
pub const KEY_LEN: usize = 32;

/// A key stretching function selected by the UUID in a database header.
///
/// Implementations are stateless; all input arrives through `params` and the
/// `Progress` of the call. `transform` is `Idle -> Running -> Completed | Cancelled |
/// Failed` with no resume: a cancelled or failed run is simply started again.
pub trait KeyDerivationFunction: Send + Sync {
    fn uuid(&self) -> Uuid;

    fn name(&self) -> &'static str;

    /// Reasonable defaults for a new database.
    ///
    /// The salt is a zero-filled placeholder of the right length; call
    /// [`randomize`](Self::randomize) before the parameters are used to save.
    fn default_params(&self) -> KdfParams;

    /// Bytes to send to a challenge-response token. The salt doubles as the challenge,
    /// so each save with a fresh salt also gets a fresh challenge.
    fn get_challenge(&self, params: &KdfParams) -> Result<SecureBytes> {
        let salt = params.require_bytes(self.name(), SALT_PARAM)?;
        Ok(SecureBytes::from(salt))
    }

    /// Replace the salt with fresh random bytes of the same length.
    ///
    /// A missing or empty salt gets `SALT_LEN` bytes; a salt of another type is an error.
    fn randomize(&self, params: &mut KdfParams) -> Result<()> {
        let len = match params.optional_bytes(self.name(), SALT_PARAM)? {
            Some(salt) if !salt.is_empty() => salt.len(),
            _ => SALT_LEN,
        };
        params.set_bytes(SALT_PARAM, random_bytes(len)?);
        Ok(())
    }

    /// Stretch `key` into a `KEY_LEN`-byte key.
    ///
    /// `key` is never modified. Every intermediate buffer is erased before returning,
    /// whether the call completes, fails or is cancelled.
    fn transform(
        &self,
        key: &SecureBytes,
        params: &KdfParams,
        progress: &Progress,
    ) -> Result<SecureBytes>;
}

/// Fill a buffer from the operating system's CSPRNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(CryptoError::from)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::crypto::{AesKdf, ParamValue};

    #[test]
    fn test_randomize_keeps_salt_length() {
        let mut params = KdfParams::new();
        params.set_bytes(SALT_PARAM, vec![0u8; 16]);
        AesKdf.randomize(&mut params).unwrap();
        assert_eq!(AesKdf.get_challenge(&params).unwrap().len(), 16);

        params.set_bytes(SALT_PARAM, Vec::new());
        AesKdf.randomize(&mut params).unwrap();
        assert_eq!(AesKdf.get_challenge(&params).unwrap().len(), SALT_LEN);
    }

    #[test]
    fn test_randomize_rejects_mistyped_salt() {
        let mut params = KdfParams::new();
        params.set_u64(SALT_PARAM, 7);
        assert!(matches!(
            AesKdf.randomize(&mut params),
            Err(CryptoError::InvalidKdfParam { param, .. }) if param == "S"
        ));
        assert_eq!(params.get(SALT_PARAM), Some(&ParamValue::UInt64(7)));
    }

    #[test]
    fn test_random_bytes_differ() {
        let a = random_bytes(32).unwrap();
        let b = random_bytes(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
