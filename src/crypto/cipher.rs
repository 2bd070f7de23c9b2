//! Payload cipher interface
//!
//! Ciphers are stateless: the key, IV and a fresh `Progress` are passed to every call.
//! Key and IV lengths are caller preconditions and are asserted, not reported.

use sha2::{Sha256, Sha512};

use super::{SecureBytes, Uuid};
use crate::error::Result;
use crate::progress::Progress;

pub trait DataCipher: Send + Sync {
    fn uuid(&self) -> Uuid;

    fn name(&self) -> &'static str;

    /// Required key length in bytes
    fn key_size(&self) -> usize;

    /// Required IV / nonce length in bytes
    fn iv_size(&self) -> usize;

    fn encrypt(&self, plain_text: &[u8], key: &[u8], iv: &[u8], progress: &Progress)
        -> Result<Vec<u8>>;

    fn decrypt(
        &self,
        cipher_text: &[u8],
        key: &[u8],
        iv: &[u8],
        progress: &Progress,
    ) -> Result<SecureBytes>;

    /// Fit a derived key to `key_size()`; see [`resize_key`].
    fn resize_key(&self, key: &[u8]) -> SecureBytes {
        resize_key(key, self.key_size())
    }
}

/// Fit `key` to `size` bytes.
///
/// A key of the right length is copied as-is. Otherwise it is hashed with SHA-256
/// (size <= 32) or SHA-512 (size <= 64) and the digest truncated to `size`.
///
/// # Panics
/// If `size` exceeds 64 bytes. No supported cipher needs that.
pub fn resize_key(key: &[u8], size: usize) -> SecureBytes {
    if key.len() == size {
        return SecureBytes::from(key);
    }
    assert!(size <= 64, "cannot resize a key to {size} bytes");

    let mut digest = if size <= 32 {
        SecureBytes::digest::<Sha256>(&[key])
    } else {
        SecureBytes::digest::<Sha512>(&[key])
    };
    let resized = SecureBytes::from(&digest[..size]);
    digest.erase();
    resized
}

pub(crate) fn check_lengths(cipher: &dyn DataCipher, key: &[u8], iv: &[u8]) {
    assert_eq!(
        key.len(),
        cipher.key_size(),
        "{}: key must be {} bytes",
        cipher.name(),
        cipher.key_size()
    );
    assert_eq!(
        iv.len(),
        cipher.iv_size(),
        "{}: IV must be {} bytes",
        cipher.name(),
        cipher.iv_size()
    );
}

/// Run a non-interruptible primitive under `progress`.
///
/// Progress is 0 before and complete after; cancellation is only observed once the
/// primitive has returned, and a cancelled call drops (and so erases) its output.
pub(crate) fn run_tracked<T>(
    progress: &Progress,
    units: usize,
    primitive: impl FnOnce() -> Result<T>,
) -> Result<T> {
    progress.set_total_unit_count(units as u64);
    progress.set_completed_unit_count(0);
    let output = primitive()?;
    progress.set_completed_unit_count(units as u64);
    progress.check_cancelled()?;
    Ok(output)
}
