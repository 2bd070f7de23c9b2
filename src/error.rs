use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Why a running operation was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancellationReason {
    /// The user aborted the unlock/save.
    UserRequested,
    /// The host is under memory pressure.
    LowMemory,
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserRequested => f.write_str("по запросу пользователя"),
            Self::LowMemory => f.write_str("из-за нехватки памяти"),
        }
    }
}

/// Direction of a failed cipher call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherOperation {
    Encrypt,
    Decrypt,
}

impl fmt::Display for CipherOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encrypt => f.write_str("шифрование"),
            Self::Decrypt => f.write_str("расшифрование"),
        }
    }
}

/// Status reported by a cipher primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherStatus {
    /// Ciphertext is empty or not a whole number of blocks.
    UnalignedInput,
    /// Stream cipher ran out of keystream (32-bit block counter overflow).
    KeystreamExhausted,
}

impl fmt::Display for CipherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnalignedInput => f.write_str("длина входных данных не кратна размеру блока"),
            Self::KeystreamExhausted => f.write_str("ключевой поток исчерпан"),
        }
    }
}

/// Reason a PKCS#7 padding check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingFault {
    EmptyInput,
    /// Last byte is zero or larger than the block/buffer.
    InvalidLength(u8),
    /// Trailing bytes differ from the pad value.
    NonUniform,
}

impl fmt::Display for PaddingFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => f.write_str("пустые данные"),
            Self::InvalidLength(n) => write!(f, "неверная длина дополнения {n}"),
            Self::NonUniform => f.write_str("байты дополнения различаются"),
        }
    }
}

/// Failures of a hardware challenge-response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChallengeResponseError {
    #[error("запрос-ответ не поддерживается устройством или системой")]
    NotSupportedByDeviceOrSystem,

    #[error("запрос-ответ не поддерживается форматом базы данных")]
    NotSupportedByDatabaseFormat,

    #[error("запрос-ответ недоступен в данном контексте")]
    NotAvailableInContext,

    #[error("запрос-ответ отменён")]
    Cancelled,

    #[error("ошибка связи с аппаратным ключом: {0}")]
    CommunicationError(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("ошибка генератора случайных чисел: {0}")]
    Rng(String),

    #[error("{kdf}: отсутствует или неверен параметр '{param}'")]
    InvalidKdfParam { kdf: &'static str, param: String },

    #[error("{operation} не удалось: {code}")]
    Cipher {
        operation: CipherOperation,
        code: CipherStatus,
    },

    #[error("неверное дополнение ({0}): неверный ключ или повреждённые данные")]
    Padding(PaddingFault),

    #[error("ошибка Argon2: {0}")]
    Argon2(argon2::Error),

    #[error(transparent)]
    ChallengeResponse(#[from] ChallengeResponseError),

    #[error("операция прервана {0}")]
    Cancelled(CancellationReason),
}

impl CryptoError {
    pub(crate) fn invalid_param(kdf: &'static str, param: impl Into<String>) -> Self {
        Self::InvalidKdfParam {
            kdf,
            param: param.into(),
        }
    }

    /// True for the errors callers should report as "wrong master key".
    pub fn is_wrong_key(&self) -> bool {
        matches!(self, Self::Padding(_) | Self::Cipher { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

impl From<argon2::Error> for CryptoError {
    fn from(err: argon2::Error) -> Self {
        Self::Argon2(err)
    }
}

impl From<rand::Error> for CryptoError {
    fn from(err: rand::Error) -> Self {
        Self::Rng(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_key_classification() {
        assert!(CryptoError::Padding(PaddingFault::NonUniform).is_wrong_key());
        assert!(CryptoError::Cipher {
            operation: CipherOperation::Decrypt,
            code: CipherStatus::UnalignedInput,
        }
        .is_wrong_key());
        assert!(!CryptoError::Cancelled(CancellationReason::UserRequested).is_wrong_key());
    }

    #[test]
    fn test_messages_name_the_parameter() {
        let err = CryptoError::invalid_param("AES KDF", "R");
        assert_eq!(err.to_string(), "AES KDF: отсутствует или неверен параметр 'R'");

        let err = CryptoError::Cancelled(CancellationReason::LowMemory);
        assert_eq!(err.to_string(), "операция прервана из-за нехватки памяти");
    }
}
