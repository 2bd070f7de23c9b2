//! AES-256-CBC payload cipher with PKCS#7 padding
//!
//! The cipher used by KDBX3 databases and the default for KDBX4.

use aes::Aes256;
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use tracing::debug;

use super::cipher::{check_lengths, run_tracked, DataCipher};
use super::{padding, SecureBytes, Uuid};
use crate::error::{CipherOperation, CipherStatus, CryptoError, Result};
use crate::progress::Progress;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const AES_CIPHER_UUID: Uuid = Uuid::from_bytes([
    0x31, 0xc1, 0xf2, 0xe6, 0xbf, 0x71, 0x43, 0x50, 0xbe, 0x58, 0x05, 0x21, 0x6a, 0xfc, 0x5a, 0xff,
]);

/// Block (and IV) length (128 bits)
pub const BLOCK_LEN: usize = 16;

/// Key length (256 bits)
pub const KEY_LEN: usize = 32;

#[derive(Debug, Default, Clone, Copy)]
pub struct AesCbcCipher;

impl DataCipher for AesCbcCipher {
    fn uuid(&self) -> Uuid {
        AES_CIPHER_UUID
    }

    fn name(&self) -> &'static str {
        "AES"
    }

    fn key_size(&self) -> usize {
        KEY_LEN
    }

    fn iv_size(&self) -> usize {
        BLOCK_LEN
    }

    fn encrypt(
        &self,
        plain_text: &[u8],
        key: &[u8],
        iv: &[u8],
        progress: &Progress,
    ) -> Result<Vec<u8>> {
        check_lengths(self, key, iv);
        debug!(len = plain_text.len(), "AES-CBC encrypt");

        run_tracked(progress, plain_text.len(), || {
            // One extra block of headroom for the padding.
            let mut buffer = Vec::with_capacity(plain_text.len() + BLOCK_LEN);
            buffer.extend_from_slice(plain_text);
            buffer.resize(plain_text.len() + BLOCK_LEN, 0);

            let written = Aes256CbcEnc::new(key.into(), iv.into())
                .encrypt_padded_mut::<Pkcs7>(&mut buffer, plain_text.len())
                .map_err(|_| CryptoError::Cipher {
                    operation: CipherOperation::Encrypt,
                    code: CipherStatus::UnalignedInput,
                })?
                .len();
            buffer.truncate(written);
            Ok(buffer)
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
        debug!(len = cipher_text.len(), "AES-CBC decrypt");

        let unaligned = CryptoError::Cipher {
            operation: CipherOperation::Decrypt,
            code: CipherStatus::UnalignedInput,
        };
        if cipher_text.is_empty() || cipher_text.len() % BLOCK_LEN != 0 {
            return Err(unaligned);
        }

        run_tracked(progress, cipher_text.len(), || {
            let mut buffer = SecureBytes::from(cipher_text);
            Aes256CbcDec::new(key.into(), iv.into())
                .decrypt_padded_mut::<NoPadding>(&mut buffer)
                .map_err(|_| unaligned)?;

            let plain_len = padding::unpadded_len(&buffer, BLOCK_LEN)?;
            Ok(SecureBytes::from(&buffer[..plain_len]))
        })
    }
}
