//! Legacy version of ChaCha20 with a 64-bit nonce.

use crate::cipher::{check_key, ChaChaCore};
use crate::errors::Error;
use crate::variants::Legacy;
use crate::{StreamCipher, LEGACY_NONCE_SIZE};

#[cfg(feature = "zeroize")]
use zeroize::ZeroizeOnDrop;

/// The ChaCha20 stream cipher (legacy "djb" construction with 64-bit nonce).
///
/// The 64-bit block counter allows streams of up to 2⁷⁰ bytes.
pub struct ChaCha20Legacy {
    core: ChaChaCore<Legacy>,
}

impl ChaCha20Legacy {
    /// Creates a cipher from a 32-byte key and an 8-byte nonce.
    ///
    /// The nonce must be randomly generated or used only once.
    pub fn new(key: &[u8], nonce: &[u8]) -> Result<Self, Error> {
        let key = check_key(key)?;
        if nonce.len() != LEGACY_NONCE_SIZE {
            return Err(Error::InvalidNonceLength);
        }

        Ok(Self {
            core: ChaChaCore::new(key, nonce),
        })
    }
}

impl StreamCipher for ChaCha20Legacy {
    #[inline]
    fn apply_keystream(&mut self, buf: &mut [u8]) {
        self.core.apply_keystream(buf);
    }
}

#[cfg(feature = "zeroize")]
impl ZeroizeOnDrop for ChaCha20Legacy {}
