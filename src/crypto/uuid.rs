//! 16-byte algorithm identifiers as stored in database headers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uuid([u8; 16]);

impl Uuid {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Build from a header field; `None` unless exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Error for malformed textual UUIDs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid UUID '{0}'")]
pub struct ParseUuidError(String);

impl FromStr for Uuid {
    type Err = ParseUuidError;

    /// Accepts the hyphenated form as well as 32 bare hex digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != '-').collect();
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(&digits, &mut bytes).map_err(|_| ParseUuidError(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = hex::encode(self.0);
        write!(
            f,
            "{}-{}-{}-{}-{}",
            &h[0..8],
            &h[8..12],
            &h[12..16],
            &h[16..20],
            &h[20..32]
        )
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uuid({self})")
    }
}

impl Serialize for Uuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uuid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let uuid: Uuid = "c9d9f39a-628a-4460-bf74-0d08c18a4fea".parse().unwrap();
        assert_eq!(uuid.as_bytes()[0], 0xc9);
        assert_eq!(uuid.as_bytes()[15], 0xea);
        assert_eq!(uuid.to_string(), "c9d9f39a-628a-4460-bf74-0d08c18a4fea");

        let bare: Uuid = "c9d9f39a628a4460bf740d08c18a4fea".parse().unwrap();
        assert_eq!(bare, uuid);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("c9d9f39a".parse::<Uuid>().is_err());
        assert!("zz".repeat(16).parse::<Uuid>().is_err());
        assert!(Uuid::from_slice(&[0u8; 15]).is_none());
    }
}
