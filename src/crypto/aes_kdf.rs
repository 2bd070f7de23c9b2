//! AES-KDF, the KDBX3 key transformation
//!
//! The 32-byte key is split into two 16-byte blocks which are AES-256-ECB encrypted
//! `R` times with the seed `S` as the AES key. The result is hashed with SHA-256.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes256;
use sha2::Sha256;
use tracing::{debug, info, warn};

use super::kdf::{KeyDerivationFunction, KEY_LEN, SALT_LEN, SALT_PARAM};
use super::params::{ParamValue, UUID_KEY};
use super::{KdfParams, SecureBytes, Uuid};
use crate::error::{CryptoError, Result};
use crate::progress::Progress;

pub const AES_KDF_UUID: Uuid = Uuid::from_bytes([
    0xc9, 0xd9, 0xf3, 0x9a, 0x62, 0x8a, 0x44, 0x60, 0xbf, 0x74, 0x0d, 0x08, 0xc1, 0x8a, 0x4f, 0xea,
]);

/// Round count parameter
pub const ROUNDS_PARAM: &str = "R";

pub const DEFAULT_ROUNDS: u64 = 100_000;

const NAME: &str = "AES KDF";
const HALF: usize = KEY_LEN / 2;
// Rounds between progress updates; cancellation is still checked every round.
const PROGRESS_STEP: u64 = 4096;

#[derive(Debug, Default, Clone, Copy)]
pub struct AesKdf;

impl KeyDerivationFunction for AesKdf {
    fn uuid(&self) -> Uuid {
        AES_KDF_UUID
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn default_params(&self) -> KdfParams {
        let mut params = KdfParams::new();
        params.insert(UUID_KEY, ParamValue::Uuid(AES_KDF_UUID));
        params.set_bytes(SALT_PARAM, vec![0u8; SALT_LEN]);
        params.set_u64(ROUNDS_PARAM, DEFAULT_ROUNDS);
        params
    }

    fn transform(
        &self,
        key: &SecureBytes,
        params: &KdfParams,
        progress: &Progress,
    ) -> Result<SecureBytes> {
        let seed = params.require_bytes(NAME, SALT_PARAM)?;
        let rounds = params.require_u64(NAME, ROUNDS_PARAM)?;
        let cipher =
            Aes256::new_from_slice(seed).map_err(|_| CryptoError::invalid_param(NAME, SALT_PARAM))?;
        if key.len() != KEY_LEN {
            return Err(CryptoError::invalid_param(NAME, "key"));
        }

        info!(rounds, "AES-KDF transform started");
        progress.set_total_unit_count(rounds);

        let mut state = key.clone();
        encrypt_rounds(&cipher, &mut state, rounds, progress)?;

        let transformed = SecureBytes::digest::<Sha256>(&[&state[..]]);
        state.erase();

        progress.check_cancelled()?;
        debug!("AES-KDF transform finished");
        Ok(transformed)
    }
}

/// Encrypt both halves of `state` in place `rounds` times.
///
/// On cancellation `state` is erased before the error is returned.
fn encrypt_rounds(
    cipher: &Aes256,
    state: &mut SecureBytes,
    rounds: u64,
    progress: &Progress,
) -> Result<()> {
    for round in 0..rounds {
        if let Err(err) = progress.check_cancelled() {
            warn!(round, "AES-KDF transform cancelled");
            state.erase();
            return Err(err);
        }

        let (left, right) = state.split_at_mut(HALF);
        cipher.encrypt_block(aes::Block::from_mut_slice(left));
        cipher.encrypt_block(aes::Block::from_mut_slice(right));

        let done = round + 1;
        if done % PROGRESS_STEP == 0 {
            progress.set_completed_unit_count(done);
        }
    }
    progress.set_completed_unit_count(rounds);
    Ok(())
}
