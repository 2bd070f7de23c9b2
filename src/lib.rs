//! KDBX crypto - key derivation and payload ciphers for KeePass-format databases
//!
//! This crate provides:
//! - AES-KDF, Argon2d and Argon2id master key transformation
//! - AES-256-CBC and ChaCha20 payload encryption
//! - Cooperative progress reporting and cancellation for long derivations
//! - Composite key assembly and the hardware challenge-response contract
//! - Erasable buffers for every piece of key material

pub mod challenge;
pub mod composite_key;
pub mod crypto;
pub mod error;
pub mod progress;

pub use composite_key::CompositeKey;
pub use error::{
    CancellationReason, ChallengeResponseError, CipherOperation, CipherStatus, CryptoError,
    PaddingFault, Result,
};
pub use progress::Progress;
