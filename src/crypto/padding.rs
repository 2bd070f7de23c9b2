//! PKCS#7 padding check
//!
//! The pad value equals the pad length, and a block-aligned plaintext gets a full
//! block of padding, so a valid buffer always ends in 1..=block_size equal bytes.
//! Padding itself is added by `cbc`'s `Pkcs7`; the check lives here so that a bad
//! pad can be reported with its cause.

use crate::error::{CryptoError, PaddingFault, Result};

/// Length of `data` once its padding is stripped.
///
/// Rejects an empty buffer, a pad length of zero or larger than the block or the
/// buffer, and trailing bytes that differ from the pad value.
pub(crate) fn unpadded_len(data: &[u8], block_size: usize) -> Result<usize> {
    let last = *data
        .last()
        .ok_or(CryptoError::Padding(PaddingFault::EmptyInput))?;
    let pad_len = last as usize;
    if pad_len == 0 || pad_len > block_size || pad_len > data.len() {
        return Err(CryptoError::Padding(PaddingFault::InvalidLength(last)));
    }
    // Inspect every pad byte before deciding.
    let mismatch = data[data.len() - pad_len..]
        .iter()
        .fold(0u8, |acc, &b| acc | (b ^ last));
    if mismatch != 0 {
        return Err(CryptoError::Padding(PaddingFault::NonUniform));
    }
    Ok(data.len() - pad_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_padding() {
        let mut data = b"hello".to_vec();
        data.extend_from_slice(&[11u8; 11]);
        assert_eq!(unpadded_len(&data, 16).unwrap(), 5);

        let full_block = [16u8; 16];
        assert_eq!(unpadded_len(&full_block, 16).unwrap(), 0);
    }

    #[test]
    fn test_rejects_zero_pad_length() {
        let mut data = vec![1u8; 15];
        data.push(0);
        assert!(matches!(
            unpadded_len(&data, 16),
            Err(CryptoError::Padding(PaddingFault::InvalidLength(0)))
        ));
    }

    #[test]
    fn test_rejects_oversized_pad_length() {
        assert!(matches!(
            unpadded_len(&[5u8; 4], 16),
            Err(CryptoError::Padding(PaddingFault::InvalidLength(5)))
        ));
        assert!(matches!(
            unpadded_len(&[17u8; 32], 16),
            Err(CryptoError::Padding(PaddingFault::InvalidLength(17)))
        ));
    }

    #[test]
    fn test_rejects_non_uniform_padding() {
        let mut data = vec![0u8; 12];
        data.extend_from_slice(&[4, 4, 3, 4]);
        assert!(matches!(
            unpadded_len(&data, 16),
            Err(CryptoError::Padding(PaddingFault::NonUniform))
        ));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            unpadded_len(&[], 16),
            Err(CryptoError::Padding(PaddingFault::EmptyInput))
        ));
    }
}
