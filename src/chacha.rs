//! The IETF version of ChaCha20 with a 96-bit nonce.

use crate::cipher::{check_key, ChaChaCore};
use crate::errors::Error;
use crate::variants::Ietf;
use crate::{StreamCipher, NONCE_SIZE};

#[cfg(feature = "zeroize")]
use zeroize::ZeroizeOnDrop;

/// The ChaCha20 stream cipher (RFC 8439 version with 96-bit nonce).
///
/// The 32-bit block counter caps a single stream at 2³⁸ bytes (256 GiB);
/// use [`ChaCha20Legacy`](crate::ChaCha20Legacy) or
/// [`XChaCha20`](crate::XChaCha20) for longer streams.
pub struct ChaCha20 {
    core: ChaChaCore<Ietf>,
}

impl ChaCha20 {
    /// Creates a cipher from a 32-byte key and a 12-byte nonce.
    ///
    /// The nonce must be randomly generated or used only once.
    pub fn new(key: &[u8], nonce: &[u8]) -> Result<Self, Error> {
        let key = check_key(key)?;
        if nonce.len() != NONCE_SIZE {
            return Err(Error::InvalidNonceLength);
        }

        Ok(Self {
            core: ChaChaCore::new(key, nonce),
        })
    }
}

impl StreamCipher for ChaCha20 {
    #[inline]
    fn apply_keystream(&mut self, buf: &mut [u8]) {
        self.core.apply_keystream(buf);
    }
}

#[cfg(feature = "zeroize")]
impl ZeroizeOnDrop for ChaCha20 {}
