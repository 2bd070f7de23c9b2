//! Erasable byte container for key material
//!
//! `SecureBytes` holds passwords, key-file hashes, composite keys and derived keys.
//! - Erased explicitly with `erase()` and again when dropped
//! - Cloning makes an independent deep copy, so erasing one holder never affects another
//! - Never printed: `Debug` shows only the length
//! - Locked in memory where possible (prevents swapping)
//!
//! Erasure is best effort: `zeroize` uses volatile writes the optimizer keeps, but
//! copies left behind by earlier reallocations of the source `Vec` are out of reach.

use sha2::digest::generic_array::GenericArray;
use sha2::Digest;
use std::ops::{Deref, DerefMut};
use zeroize::Zeroize;

pub struct SecureBytes(Vec<u8>);

impl SecureBytes {
    /// Take ownership of `data`; its memory is managed securely from now on
    pub fn new(data: Vec<u8>) -> Self {
        let secure = Self(data);
        secure.lock_memory();
        secure
    }

    /// Create a zero-filled buffer of specific length
    pub fn zeroed(len: usize) -> Self {
        Self::new(vec![0u8; len])
    }

    /// Overwrite every byte with zero, keeping the length. Idempotent.
    pub fn erase(&mut self) {
        self.0.as_mut_slice().zeroize();
    }

    pub fn is_erased(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenate two secrets into a fresh buffer.
    pub fn concat(&self, other: &[u8]) -> Self {
        let mut joined = Vec::with_capacity(self.len() + other.len());
        joined.extend_from_slice(&self.0);
        joined.extend_from_slice(other);
        Self::new(joined)
    }

    /// Hash `parts` in order straight into a secure buffer, so no copy of the digest
    /// is left on the stack.
    pub fn digest<D: Digest>(parts: &[&[u8]]) -> Self {
        let mut hasher = D::new();
        for part in parts {
            hasher.update(part);
        }
        let mut out = Self::zeroed(<D as Digest>::output_size());
        hasher.finalize_into(GenericArray::from_mut_slice(&mut out.0));
        out
    }

    /// Lock memory to prevent swapping (best effort, may fail without privileges)
    #[cfg(unix)]
    fn lock_memory(&self) {
        if self.0.is_empty() {
            return;
        }
        unsafe {
            libc::mlock(self.0.as_ptr() as *const libc::c_void, self.0.len());
        }
    }

    #[cfg(not(unix))]
    fn lock_memory(&self) {}

    #[cfg(unix)]
    fn unlock_memory(&self) {
        if self.0.is_empty() {
            return;
        }
        unsafe {
            libc::munlock(self.0.as_ptr() as *const libc::c_void, self.0.len());
        }
    }

    #[cfg(not(unix))]
    fn unlock_memory(&self) {}
}

impl Clone for SecureBytes {
    fn clone(&self) -> Self {
        Self::new(self.0.clone())
    }
}

impl Drop for SecureBytes {
    fn drop(&mut self) {
        self.0.zeroize();
        self.unlock_memory();
    }
}

impl Deref for SecureBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SecureBytes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<u8>> for SecureBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for SecureBytes {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl Default for SecureBytes {
    fn default() -> Self {
        Self(Vec::new())
    }
}

// Prevent accidental debug printing of secrets
impl std::fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureBytes")
            .field("len", &self.0.len())
            .field("data", &"[REDACTED]")
            .finish()
    }
}
