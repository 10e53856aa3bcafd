//! Error types.

use core::fmt;

/// Errors returned by the cipher constructors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The key is not [`KEY_SIZE`](crate::KEY_SIZE) bytes long.
    InvalidKeyLength,
    /// The nonce length does not match the chosen variant.
    InvalidNonceLength,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeyLength => f.write_str("invalid key length"),
            Self::InvalidNonceLength => f.write_str("invalid nonce length"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
