//! Cryptographic primitives for KDBX databases
//!
//! This module provides:
//! - AES-KDF, Argon2d and Argon2id key derivation with progress and cancellation
//! - AES-256-CBC and ChaCha20 payload ciphers
//! - UUID-based lookup of both
//! - Secure memory handling with automatic zeroing

mod aes_cbc;
mod aes_kdf;
mod argon;
mod argon_engine;
mod chacha;
mod cipher;
pub mod factory;
mod kdf;
mod padding;
mod params;
mod secure_bytes;
mod uuid;

pub use aes_cbc::{AesCbcCipher, AES_CIPHER_UUID};
pub use aes_kdf::{AesKdf, AES_KDF_UUID, DEFAULT_ROUNDS, ROUNDS_PARAM};
pub use argon::{
    Argon2Kdf, ARGON2D_UUID, ARGON2ID_UUID, ASSOCIATED_DATA_PARAM, ITERATIONS_PARAM,
    MEMORY_PARAM, PARALLELISM_PARAM, SECRET_KEY_PARAM, VERSION_10, VERSION_13, VERSION_PARAM,
};
pub use chacha::{ChaCha20Cipher, CHACHA20_CIPHER_UUID};
pub use cipher::{resize_key, DataCipher};
pub use factory::{create_cipher, create_kdf, create_kdf_for};
pub use kdf::{random_bytes, KeyDerivationFunction, KEY_LEN, SALT_LEN, SALT_PARAM};
pub use params::{KdfParams, ParamValue, UUID_KEY};
pub use secure_bytes::SecureBytes;
pub use uuid::{ParseUuidError, Uuid};
