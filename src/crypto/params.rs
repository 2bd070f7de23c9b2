//! Typed, ordered key-derivation parameters
//!
//! Mirrors the KDBX4 variant dictionary: string keys mapped to typed values, kept in
//! insertion order. Parsing the binary header layout is the caller's job; this type
//! only carries the decoded values.

use serde::{Deserialize, Serialize};

use super::Uuid;
use crate::error::{CryptoError, Result};

/// Key under which a parameter set records the UUID of its KDF
pub const UUID_KEY: &str = "$UUID";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ParamValue {
    Uuid(Uuid),
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
    UInt32(u32),
    UInt64(u64),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    String(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KdfParams {
    entries: Vec<(String, ParamValue)>,
}

impl KdfParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// UUID of the KDF these parameters belong to, if recorded.
    pub fn kdf_uuid(&self) -> Option<Uuid> {
        match self.get(UUID_KEY) {
            Some(ParamValue::Uuid(uuid)) => Some(*uuid),
            _ => None,
        }
    }

    pub fn set_bytes(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.insert(key, ParamValue::Bytes(value.into()));
    }

    pub fn set_u32(&mut self, key: impl Into<String>, value: u32) {
        self.insert(key, ParamValue::UInt32(value));
    }

    pub fn set_u64(&mut self, key: impl Into<String>, value: u64) {
        self.insert(key, ParamValue::UInt64(value));
    }

    pub(crate) fn require_bytes(&self, kdf: &'static str, key: &str) -> Result<&[u8]> {
        match self.get(key) {
            Some(ParamValue::Bytes(bytes)) => Ok(bytes),
            _ => Err(CryptoError::invalid_param(kdf, key)),
        }
    }

    pub(crate) fn require_u32(&self, kdf: &'static str, key: &str) -> Result<u32> {
        match self.get(key) {
            Some(ParamValue::UInt32(value)) => Ok(*value),
            _ => Err(CryptoError::invalid_param(kdf, key)),
        }
    }

    pub(crate) fn require_u64(&self, kdf: &'static str, key: &str) -> Result<u64> {
        match self.get(key) {
            Some(ParamValue::UInt64(value)) => Ok(*value),
            _ => Err(CryptoError::invalid_param(kdf, key)),
        }
    }

    /// Bytes for an optional key: absent is fine, present with the wrong type is not.
    pub(crate) fn optional_bytes(&self, kdf: &'static str, key: &str) -> Result<Option<&[u8]>> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Bytes(bytes)) => Ok(Some(bytes)),
            Some(_) => Err(CryptoError::invalid_param(kdf, key)),
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}
