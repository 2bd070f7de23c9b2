//! UUID → algorithm lookup
//!
//! The only place that knows which UUID means which KDF or cipher. An unknown UUID
//! yields `None`; whether that is fatal is the caller's decision.

use super::aes_cbc::{AesCbcCipher, AES_CIPHER_UUID};
use super::aes_kdf::{AesKdf, AES_KDF_UUID};
use super::argon::{Argon2Kdf, ARGON2D_UUID, ARGON2ID_UUID};
use super::chacha::{ChaCha20Cipher, CHACHA20_CIPHER_UUID};
use super::{DataCipher, KdfParams, KeyDerivationFunction, Uuid};

type KdfConstructor = fn() -> Box<dyn KeyDerivationFunction>;
type CipherConstructor = fn() -> Box<dyn DataCipher>;

fn aes_kdf() -> Box<dyn KeyDerivationFunction> {
    Box::new(AesKdf)
}

fn argon2d() -> Box<dyn KeyDerivationFunction> {
    Box::new(Argon2Kdf::argon2d())
}

fn argon2id() -> Box<dyn KeyDerivationFunction> {
    Box::new(Argon2Kdf::argon2id())
}

fn aes_cipher() -> Box<dyn DataCipher> {
    Box::new(AesCbcCipher)
}

fn chacha20_cipher() -> Box<dyn DataCipher> {
    Box::new(ChaCha20Cipher)
}

static KDFS: [(Uuid, KdfConstructor); 3] = [
    (AES_KDF_UUID, aes_kdf),
    (ARGON2D_UUID, argon2d),
    (ARGON2ID_UUID, argon2id),
];

static CIPHERS: [(Uuid, CipherConstructor); 2] = [
    (AES_CIPHER_UUID, aes_cipher),
    (CHACHA20_CIPHER_UUID, chacha20_cipher),
];

pub fn create_kdf(uuid: &Uuid) -> Option<Box<dyn KeyDerivationFunction>> {
    KDFS.iter()
        .find(|(id, _)| id == uuid)
        .map(|(_, construct)| construct())
}

/// Resolve the KDF named by the `$UUID` entry of `params`.
pub fn create_kdf_for(params: &KdfParams) -> Option<Box<dyn KeyDerivationFunction>> {
    create_kdf(&params.kdf_uuid()?)
}

pub fn create_cipher(uuid: &Uuid) -> Option<Box<dyn DataCipher>> {
    CIPHERS
        .iter()
        .find(|(id, _)| id == uuid)
        .map(|(_, construct)| construct())
}

/// Every registered KDF, in registration order
pub fn all_kdfs() -> Vec<Box<dyn KeyDerivationFunction>> {
    KDFS.iter().map(|(_, construct)| construct()).collect()
}

/// Every registered cipher, in registration order
pub fn all_ciphers() -> Vec<Box<dyn DataCipher>> {
    CIPHERS.iter().map(|(_, construct)| construct()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_aes_kdf_lookup() {
        let kdf = create_kdf(&AES_KDF_UUID).unwrap();
        assert_eq!(kdf.name(), "AES KDF");
        assert_eq!(kdf.uuid(), AES_KDF_UUID);
    }

    #[test]
    fn test_argon2_lookup() {
        let uuid: Uuid = "ef636ddf-8c29-444b-91f7-a9a403e30a0c".parse().unwrap();
        assert_eq!(create_kdf(&uuid).unwrap().name(), "Argon2d");

        let uuid: Uuid = "9e298b19-56db-4773-b23d-fc3ec6f0a1e6".parse().unwrap();
        assert_eq!(create_kdf(&uuid).unwrap().name(), "Argon2id");
    }

    #[test]
    fn test_cipher_lookup() {
        let uuid: Uuid = "31c1f2e6-bf71-4350-be58-05216afc5aff".parse().unwrap();
        let aes = create_cipher(&uuid).unwrap();
        assert_eq!(aes.name(), "AES");
        assert_eq!(aes.iv_size(), 16);

        let uuid: Uuid = "d6038a2b-8b6f-4cb5-a524-339a31dbb59a".parse().unwrap();
        let chacha = create_cipher(&uuid).unwrap();
        assert_eq!(chacha.name(), "ChaCha20");
        assert_eq!(chacha.iv_size(), 12);
    }

    #[test]
    fn test_unknown_uuid_is_none() {
        let unknown = Uuid::from_bytes([0x42; 16]);
        assert!(create_kdf(&unknown).is_none());
        assert!(create_cipher(&unknown).is_none());
        // A KDF UUID is not a cipher UUID and vice versa
        assert!(create_cipher(&AES_KDF_UUID).is_none());
        assert!(create_kdf(&AES_CIPHER_UUID).is_none());
    }

    #[test]
    fn test_params_resolve_their_kdf() {
        for kdf in all_kdfs() {
            let params = kdf.default_params();
            assert_eq!(create_kdf_for(&params).unwrap().uuid(), kdf.uuid());
        }
        assert!(create_kdf_for(&KdfParams::new()).is_none());
    }

    #[test]
    fn test_uuids_are_unique_and_match_instances() {
        let kdf_ids: HashSet<Uuid> = KDFS.iter().map(|(id, _)| *id).collect();
        assert_eq!(kdf_ids.len(), KDFS.len());
        let cipher_ids: HashSet<Uuid> = CIPHERS.iter().map(|(id, _)| *id).collect();
        assert_eq!(cipher_ids.len(), CIPHERS.len());

        for (id, construct) in KDFS.iter() {
            assert_eq!(construct().uuid(), *id);
        }
        for (id, construct) in CIPHERS.iter() {
            assert_eq!(construct().uuid(), *id);
        }
    }
}
