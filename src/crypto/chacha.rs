//! ChaCha20 payload cipher
//!
//! The KDBX4 variant: RFC 7539 ChaCha20 with a 96-bit nonce and a 32-bit block
//! counter starting at zero. No padding and no authentication tag; the database
//! format authenticates the payload with its own HMAC blocks.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use tracing::debug;

use super::cipher::{check_lengths, run_tracked, DataCipher};
use super::{SecureBytes, Uuid};
use crate::error::{CipherOperation, CipherStatus, CryptoError, Result};
use crate::progress::Progress;

pub const CHACHA20_CIPHER_UUID: Uuid = Uuid::from_bytes([
    0xd6, 0x03, 0x8a, 0x2b, 0x8b, 0x6f, 0x4c, 0xb5, 0xa5, 0x24, 0x33, 0x9a, 0x31, 0xdb, 0xb5, 0x9a,
]);

/// Nonce length for ChaCha20 (96 bits)
pub const NONCE_LEN: usize = 12;

/// Key length (256 bits)
pub const KEY_LEN: usize = 32;

#[derive(Debug, Default, Clone, Copy)]
pub struct ChaCha20Cipher;

impl ChaCha20Cipher {
    fn apply(
        &self,
        input: &[u8],
        key: &[u8],
        nonce: &[u8],
        operation: CipherOperation,
    ) -> Result<SecureBytes> {
        let mut buffer = SecureBytes::from(input);
        ChaCha20::new(key.into(), nonce.into())
            .try_apply_keystream(&mut buffer)
            .map_err(|_| CryptoError::Cipher {
                operation,
                code: CipherStatus::KeystreamExhausted,
            })?;
        Ok(buffer)
    }
}

impl DataCipher for ChaCha20Cipher {
    fn uuid(&self) -> Uuid {
        CHACHA20_CIPHER_UUID
    }

    fn name(&self) -> &'static str {
        "ChaCha20"
    }

    fn key_size(&self) -> usize {
        KEY_LEN
    }

    fn iv_size(&self) -> usize {
        NONCE_LEN
    }

    fn encrypt(
        &self,
        plain_text: &[u8],
        key: &[u8],
        iv: &[u8],
        progress: &Progress,
    ) -> Result<Vec<u8>> {
        check_lengths(self, key, iv);
        debug!(len = plain_text.len(), "ChaCha20 encrypt");

        run_tracked(progress, plain_text.len(), || {
            let cipher_text = self.apply(plain_text, key, iv, CipherOperation::Encrypt)?;
            Ok(cipher_text.to_vec())
        })
    }

    fn decrypt(
        &self,
        cipher_text: &[u8],
        key: &[u8],
        iv: &[u8],
        progress: &Progress,
    ) -> Result<SecureBytes> {
        check_lengths(self, key, iv);
        debug!(len = cipher_text.len(), "ChaCha20 decrypt");

        run_tracked(progress, cipher_text.len(), || {
            self.apply(cipher_text, key, iv, CipherOperation::Decrypt)
        })
    }
}
