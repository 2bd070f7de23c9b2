//! Argon2d / Argon2id Key Derivation Functions
//!
//! The KDBX4 key transformations. Both flavours read the same parameters:
//! - `S` salt, `P` parallelism (lanes), `M` memory in bytes, `I` iterations (passes),
//!   `V` version (0x10 or 0x13)
//! - optional `K` secret key and `A` associated data
//!
//! Progress is counted in passes. Cancellation is observed between passes; a run
//! cancelled for low memory releases its working memory without wiping it first,
//! since touching every page again is exactly what a memory-starved host cannot afford.

use argon2::Params;
use tracing::{debug, info, warn};

use super::argon_engine::{self, HashOutcome, Input, PassControl, Variant};
use super::kdf::{KeyDerivationFunction, KEY_LEN, SALT_LEN, SALT_PARAM};
use super::params::{ParamValue, UUID_KEY};
use super::{KdfParams, SecureBytes, Uuid};
use crate::error::{CancellationReason, CryptoError, Result};
use crate::progress::Progress;

pub const ARGON2D_UUID: Uuid = Uuid::from_bytes([
    0xef, 0x63, 0x6d, 0xdf, 0x8c, 0x29, 0x44, 0x4b, 0x91, 0xf7, 0xa9, 0xa4, 0x03, 0xe3, 0x0a, 0x0c,
]);

pub const ARGON2ID_UUID: Uuid = Uuid::from_bytes([
    0x9e, 0x29, 0x8b, 0x19, 0x56, 0xdb, 0x47, 0x73, 0xb2, 0x3d, 0xfc, 0x3e, 0xc6, 0xf0, 0xa1, 0xe6,
]);

pub const PARALLELISM_PARAM: &str = "P";
pub const MEMORY_PARAM: &str = "M";
pub const ITERATIONS_PARAM: &str = "I";
pub const VERSION_PARAM: &str = "V";
pub const SECRET_KEY_PARAM: &str = "K";
pub const ASSOCIATED_DATA_PARAM: &str = "A";

/// Argon2 defaults for new databases
/// - Memory: 64 MiB
/// - Iterations: 2
/// - Parallelism: 2 lanes
pub const DEFAULT_MEMORY: u64 = 64 * 1024 * 1024;
pub const DEFAULT_ITERATIONS: u64 = 2;
pub const DEFAULT_PARALLELISM: u32 = 2;
pub const VERSION_13: u32 = 0x13;
pub const VERSION_10: u32 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Kdf {
    variant: Variant,
}

impl Argon2Kdf {
    pub fn argon2d() -> Self {
        Self {
            variant: Variant::Argon2d,
        }
    }

    pub fn argon2id() -> Self {
        Self {
            variant: Variant::Argon2id,
        }
    }

    /// Decode `params` into validated engine parameters.
    fn engine_params(&self, params: &KdfParams) -> Result<(Params, u32)> {
        let name = self.name();
        let parallelism = params.require_u32(name, PARALLELISM_PARAM)?;
        let memory = params.require_u64(name, MEMORY_PARAM)?;
        let iterations = params.require_u64(name, ITERATIONS_PARAM)?;
        let version = params.require_u32(name, VERSION_PARAM)?;
        if version != VERSION_10 && version != VERSION_13 {
            return Err(CryptoError::invalid_param(name, VERSION_PARAM));
        }

        let memory_kib = u32::try_from(memory / 1024)
            .map_err(|_| CryptoError::invalid_param(name, MEMORY_PARAM))?;
        let passes = u32::try_from(iterations)
            .map_err(|_| CryptoError::invalid_param(name, ITERATIONS_PARAM))?;

        let engine_params = Params::new(memory_kib, passes, parallelism, Some(KEY_LEN))?;
        Ok((engine_params, version))
    }
}

impl KeyDerivationFunction for Argon2Kdf {
    fn uuid(&self) -> Uuid {
        match self.variant {
            Variant::Argon2id => ARGON2ID_UUID,
            _ => ARGON2D_UUID,
        }
    }

    fn name(&self) -> &'static str {
        match self.variant {
            Variant::Argon2id => "Argon2id",
            _ => "Argon2d",
        }
    }

    fn default_params(&self) -> KdfParams {
        let mut params = KdfParams::new();
        params.insert(UUID_KEY, ParamValue::Uuid(self.uuid()));
        params.set_bytes(SALT_PARAM, vec![0u8; SALT_LEN]);
        params.set_u32(PARALLELISM_PARAM, DEFAULT_PARALLELISM);
        params.set_u64(MEMORY_PARAM, DEFAULT_MEMORY);
        params.set_u64(ITERATIONS_PARAM, DEFAULT_ITERATIONS);
        params.set_u32(VERSION_PARAM, VERSION_13);
        params
    }

    fn transform(
        &self,
        key: &SecureBytes,
        params: &KdfParams,
        progress: &Progress,
    ) -> Result<SecureBytes> {
        let name = self.name();
        let salt = params.require_bytes(name, SALT_PARAM)?;
        let secret = params.optional_bytes(name, SECRET_KEY_PARAM)?.unwrap_or(&[]);
        let associated_data = params
            .optional_bytes(name, ASSOCIATED_DATA_PARAM)?
            .unwrap_or(&[]);
        let (engine_params, version) = self.engine_params(params)?;

        info!(
            kdf = name,
            memory_kib = engine_params.m_cost(),
            iterations = engine_params.t_cost(),
            parallelism = engine_params.p_cost(),
            version,
            "Argon2 transform started"
        );
        progress.set_total_unit_count(u64::from(engine_params.t_cost()));
        progress.check_cancelled()?;

        let input = Input {
            password: key,
            salt,
            secret,
            associated_data,
        };
        let mut output = SecureBytes::zeroed(KEY_LEN);
        let mut abort_reason = None;

        let outcome = argon_engine::hash(
            self.variant,
            version,
            &engine_params,
            &input,
            &mut output,
            |passes_done| {
                progress.set_completed_unit_count(u64::from(passes_done));
                let reason = progress.cancellation_reason();
                abort_reason = reason;
                pass_control(reason)
            },
        )?;

        match outcome {
            HashOutcome::Completed => {
                debug!(kdf = name, "Argon2 transform finished");
                Ok(output)
            }
            HashOutcome::Aborted => {
                output.erase();
                let reason = abort_reason.unwrap_or(CancellationReason::UserRequested);
                warn!(kdf = name, %reason, "Argon2 transform cancelled");
                Err(CryptoError::Cancelled(reason))
            }
        }
    }
}

/// Under memory pressure the blocks are released at once rather than wiped first.
fn pass_control(cancellation: Option<CancellationReason>) -> PassControl {
    match cancellation {
        None => PassControl::Continue,
        Some(CancellationReason::LowMemory) => PassControl::Abort { wipe_memory: false },
        Some(CancellationReason::UserRequested) => PassControl::Abort { wipe_memory: true },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use std::thread;
    use std::time::Duration;

    fn correct_password_key() -> SecureBytes {
        SecureBytes::new(Sha256::digest(b"correct password").to_vec())
    }

    /// 64 KiB, 3 passes, 2 lanes, zero salt
    fn small_params(kdf: &Argon2Kdf) -> KdfParams {
        let mut params = kdf.default_params();
        params.set_u64(MEMORY_PARAM, 64 * 1024);
        params.set_u64(ITERATIONS_PARAM, 3);
        params
    }

    #[test]
    fn test_only_low_memory_skips_the_wipe() {
        assert_eq!(pass_control(None), PassControl::Continue);
        assert_eq!(
            pass_control(Some(CancellationReason::UserRequested)),
            PassControl::Abort { wipe_memory: true }
        );
        assert_eq!(
            pass_control(Some(CancellationReason::LowMemory)),
            PassControl::Abort { wipe_memory: false }
        );
    }

    fn derive(kdf: &Argon2Kdf, params: &KdfParams) -> String {
        let out = kdf
            .transform(&correct_password_key(), params, &Progress::new())
            .unwrap();
        hex::encode(&*out)
    }

    #[test]
    fn test_known_outputs_v13() {
        let d = Argon2Kdf::argon2d();
        assert_eq!(
            derive(&d, &small_params(&d)),
            "483a4546ee0533eba5c7e4c9bbb66d3f83efff5389ffcb8306a5b9f74ab17121"
        );

        let id = Argon2Kdf::argon2id();
        assert_eq!(
            derive(&id, &small_params(&id)),
            "6f8fa3b49b40724e6c0362db99dca1c8749bdae8d916c0fe7ee2c4d3bb8b7d7e"
        );
    }

    #[test]
    fn test_known_outputs_v10() {
        let d = Argon2Kdf::argon2d();
        let mut params = small_params(&d);
        params.set_u32(VERSION_PARAM, VERSION_10);
        assert_eq!(
            derive(&d, &params),
            "9410b375837580b7f9986dd9c15f8eebcdc50adc81b3c9d57cb76ac53e93541b"
        );

        let id = Argon2Kdf::argon2id();
        let mut params = small_params(&id);
        params.set_u32(VERSION_PARAM, VERSION_10);
        assert_eq!(
            derive(&id, &params),
            "f16385180af567512980d1eb8c3d327fec69a42ef8203176b08046030c3af9d7"
        );
    }

    #[test]
    fn test_iterations_and_salt_change_output() {
        let id = Argon2Kdf::argon2id();

        let mut more_passes = small_params(&id);
        more_passes.set_u64(ITERATIONS_PARAM, 4);
        assert_eq!(
            derive(&id, &more_passes),
            "a401b6ed97b2ecb27018bf1268f105e0014e2bfe7c46e8e5e7f240d5a64353b3"
        );

        let mut other_salt = small_params(&id);
        let mut salt = vec![0u8; SALT_LEN];
        salt[0] = 1;
        other_salt.set_bytes(SALT_PARAM, salt);
        assert_eq!(
            derive(&id, &other_salt),
            "816397f1739051f25a5683a2514ba89b49ba9f43f663fc363ef832aea67bee30"
        );
    }

    #[test]
    fn test_progress_counts_passes() {
        let kdf = Argon2Kdf::argon2d();
        let progress = Progress::new();
        kdf.transform(&correct_password_key(), &small_params(&kdf), &progress)
            .unwrap();
        assert_eq!(progress.total_unit_count(), 3);
        assert_eq!(progress.completed_unit_count(), 3);
    }

    #[test]
    fn test_pre_cancelled_transform_fails_immediately() {
        let kdf = Argon2Kdf::argon2id();
        let progress = Progress::new();
        progress.cancel(CancellationReason::LowMemory);

        let result = kdf.transform(&correct_password_key(), &small_params(&kdf), &progress);
        assert!(matches!(
            result,
            Err(CryptoError::Cancelled(CancellationReason::LowMemory))
        ));
        assert_eq!(progress.completed_unit_count(), 0);
    }

    #[test]
    fn test_cancel_during_run_stops_before_budget() {
        let kdf = Argon2Kdf::argon2d();
        let mut params = small_params(&kdf);
        params.set_u64(ITERATIONS_PARAM, 100_000);

        let progress = Progress::new();
        let observer = progress.clone();
        let canceller = thread::spawn(move || {
            while observer.completed_unit_count() == 0 {
                thread::sleep(Duration::from_millis(1));
            }
            observer.cancel(CancellationReason::UserRequested);
        });

        let result = kdf.transform(&correct_password_key(), &params, &progress);
        canceller.join().unwrap();

        assert!(matches!(
            result,
            Err(CryptoError::Cancelled(CancellationReason::UserRequested))
        ));
        assert!(progress.completed_unit_count() < 100_000);
    }

    #[test]
    fn test_invalid_params() {
        let kdf = Argon2Kdf::argon2id();
        let key = correct_password_key();

        let mut bad_version = small_params(&kdf);
        bad_version.set_u32(VERSION_PARAM, 0x12);
        assert!(matches!(
            kdf.transform(&key, &bad_version, &Progress::new()),
            Err(CryptoError::InvalidKdfParam { param, .. }) if param == "V"
        ));

        let mut too_little_memory = small_params(&kdf);
        too_little_memory.set_u64(MEMORY_PARAM, 8 * 1024);
        assert!(matches!(
            kdf.transform(&key, &too_little_memory, &Progress::new()),
            Err(CryptoError::Argon2(argon2::Error::MemoryTooLittle))
        ));

        let mut no_iterations = small_params(&kdf);
        no_iterations.set_u64(ITERATIONS_PARAM, 0);
        assert!(matches!(
            kdf.transform(&key, &no_iterations, &Progress::new()),
            Err(CryptoError::Argon2(_))
        ));

        let mut mistyped = small_params(&kdf);
        mistyped.set_u64(PARALLELISM_PARAM, 2);
        assert!(matches!(
            kdf.transform(&key, &mistyped, &Progress::new()),
            Err(CryptoError::InvalidKdfParam { param, .. }) if param == "P"
        ));

        let mut bad_secret = small_params(&kdf);
        bad_secret.set_u32(SECRET_KEY_PARAM, 1);
        assert!(kdf.transform(&key, &bad_secret, &Progress::new()).is_err());
    }

    #[test]
    fn test_secret_key_and_associated_data_are_mixed_in() {
        let kdf = Argon2Kdf::argon2d();
        let plain = derive(&kdf, &small_params(&kdf));

        let mut with_secret = small_params(&kdf);
        with_secret.set_bytes(SECRET_KEY_PARAM, vec![3u8; 8]);
        assert_ne!(derive(&kdf, &with_secret), plain);

        let mut with_ad = small_params(&kdf);
        with_ad.set_bytes(ASSOCIATED_DATA_PARAM, vec![4u8; 12]);
        assert_ne!(derive(&kdf, &with_ad), plain);
    }

    #[test]
    fn test_identity_and_defaults() {
        let d = Argon2Kdf::argon2d();
        let id = Argon2Kdf::argon2id();
        assert_eq!(d.name(), "Argon2d");
        assert_eq!(id.name(), "Argon2id");
        assert_eq!(d.default_params().kdf_uuid(), Some(ARGON2D_UUID));
        assert_eq!(id.default_params().kdf_uuid(), Some(ARGON2ID_UUID));

        let params = id.default_params();
        assert_eq!(params.require_u64("Argon2id", MEMORY_PARAM).unwrap(), DEFAULT_MEMORY);
        assert_eq!(params.require_u32("Argon2id", VERSION_PARAM).unwrap(), VERSION_13);
    }
}
