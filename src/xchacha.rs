//! XChaCha is an extended nonce variant of ChaCha.

use crate::block::{quarter_round, ROUNDS};
use crate::cipher::{check_key, init_state, ChaChaCore};
use crate::errors::Error;
use crate::variants::Legacy;
use crate::{
    StreamCipher, HCHACHA_KEY_SIZE, HCHACHA_NONCE_SIZE, KEY_SIZE, XCHACHA_NONCE_SIZE,
};

#[cfg(feature = "zeroize")]
use zeroize::{Zeroize, ZeroizeOnDrop};

/// XChaCha20 is a ChaCha20 variant with an extended 192-bit (24-byte) nonce.
///
/// The construction applies the technique of the XSalsa20 paper
/// ("Extending the Salsa20 nonce", <https://cr.yp.to/snuffle/xsalsa-20081128.pdf>)
/// to ChaCha20: the first 16 nonce bytes are folded into the key through
/// [`hchacha20`], and the derived subkey drives the 64-bit-nonce
/// construction with the remaining 8 bytes. The extended nonce is large
/// enough to be chosen randomly without bookkeeping.
///
/// No authoritative specification exists for XChaCha20, but the
/// construction has "rough consensus and running code" in the form of
/// several interoperable libraries, and is documented in an (expired)
/// IETF draft: <https://datatracker.ietf.org/doc/html/draft-irtf-cfrg-xchacha>
pub struct XChaCha20 {
    core: ChaChaCore<Legacy>,
}

impl XChaCha20 {
    /// Creates a cipher from a 32-byte key and a 24-byte nonce.
    pub fn new(key: &[u8], nonce: &[u8]) -> Result<Self, Error> {
        let key = check_key(key)?;
        if nonce.len() != XCHACHA_NONCE_SIZE {
            return Err(Error::InvalidNonceLength);
        }

        #[cfg_attr(not(feature = "zeroize"), allow(unused_mut))]
        let mut subkey = hchacha(key, nonce[..HCHACHA_NONCE_SIZE].try_into().unwrap());
        let cipher = Self {
            core: ChaChaCore::new(&subkey, &nonce[HCHACHA_NONCE_SIZE..]),
        };

        #[cfg(feature = "zeroize")]
        subkey.zeroize();

        Ok(cipher)
    }
}

impl StreamCipher for XChaCha20 {
    #[inline]
    fn apply_keystream(&mut self, buf: &mut [u8]) {
        self.core.apply_keystream(buf);
    }
}

#[cfg(feature = "zeroize")]
impl ZeroizeOnDrop for XChaCha20 {}

/// The HChaCha20 function: adapts the ChaCha20 core function in the same
/// manner that HSalsa20 adapts the Salsa20 function.
///
/// HChaCha20 takes 512 bits of input (the four ChaCha constants, a 256-bit
/// key, and a 128-bit nonce) and produces 256 bits of output suitable for
/// use as a ChaCha key. Unlike the streaming block function, the input
/// state is not added back after the rounds.
///
/// # Errors
///
/// Returns [`Error::InvalidKeyLength`] or [`Error::InvalidNonceLength`] if `key`
/// is not 32 bytes or `nonce` is not 16 bytes long.
pub fn hchacha20(key: &[u8], nonce: &[u8]) -> Result<[u8; HCHACHA_KEY_SIZE], Error> {
    let key = check_key(key)?;
    let nonce: &[u8; HCHACHA_NONCE_SIZE] =
        nonce.try_into().map_err(|_| Error::InvalidNonceLength)?;

    Ok(hchacha(key, nonce))
}

pub(crate) fn hchacha(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; HCHACHA_NONCE_SIZE],
) -> [u8; HCHACHA_KEY_SIZE] {
    let mut state = init_state(key, nonce);

    for _ in 0..ROUNDS / 2 {
        // column rounds
        quarter_round(0, 4, 8, 12, &mut state);
        quarter_round(1, 5, 9, 13, &mut state);
        quarter_round(2, 6, 10, 14, &mut state);
        quarter_round(3, 7, 11, 15, &mut state);

        // diagonal rounds
        quarter_round(0, 5, 10, 15, &mut state);
        quarter_round(1, 6, 11, 12, &mut state);
        quarter_round(2, 7, 8, 13, &mut state);
        quarter_round(3, 4, 9, 14, &mut state);
    }

    let mut out = [0u8; HCHACHA_KEY_SIZE];
    for (chunk, val) in out[..16].chunks_exact_mut(4).zip(&state[..4]) {
        chunk.copy_from_slice(&val.to_le_bytes());
    }
    for (chunk, val) in out[16..].chunks_exact_mut(4).zip(&state[12..]) {
        chunk.copy_from_slice(&val.to_le_bytes());
    }

    #[cfg(feature = "zeroize")]
    state.zeroize();

    out
}

#[cfg(test)]
mod hchacha20_tests {
    use super::*;
    use hex_literal::hex;

    /// Test vector from:
    /// <https://datatracker.ietf.org/doc/html/draft-irtf-cfrg-xchacha#section-2.2.1>
    #[test]
    fn test_vector() {
        const KEY: [u8; 32] = hex!(
            "000102030405060708090a0b0c0d0e0f"
            "101112131415161718191a1b1c1d1e1f"
        );

        const INPUT: [u8; 16] = hex!("000000090000004a0000000031415927");

        const OUTPUT: [u8; 32] = hex!(
            "82413b4227b27bfed30e42508a877d73"
            "a0f9e4d58a74a853c12ec41326d3ecdc"
        );

        let actual = hchacha20(&KEY, &INPUT).unwrap();
        assert_eq!(actual, OUTPUT);
    }

    #[test]
    fn rejects_bad_lengths() {
        assert_eq!(hchacha20(&[0u8; 16], &[0u8; 16]), Err(Error::InvalidKeyLength));
        assert_eq!(hchacha20(&[0u8; 32], &[0u8; 12]), Err(Error::InvalidNonceLength));
    }
}
