//! The ChaCha20 stream cipher.
//!
//! ChaCha20 is a lightweight stream cipher which is amenable to fast,
//! constant-time implementations in software. This crate contains three
//! closely related constructions sharing one streaming API:
//!
//! - [`ChaCha20`]: IETF variant ([RFC 8439]) with a 96-bit nonce and 32-bit
//!   block counter
//! - [`ChaCha20Legacy`]: original "djb" draft variant with a 64-bit nonce and
//!   64-bit block counter
//! - [`XChaCha20`]: 192-bit extended nonce variant built on [`hchacha20`]
//!   subkey derivation
//!
//! All three XOR a keystream into caller-supplied buffers of arbitrary
//! length, across any number of calls, and produce bitwise-identical output
//! regardless of how the input is partitioned. On x86/x86_64 an AVX2 or SSE2
//! backend is selected at runtime; the portable backend is used everywhere
//! else. The backend never changes the output bytes.
//!
//! # Security Warning
//!
//! This crate does not authenticate ciphertexts, which can lead to serious
//! vulnerabilities if used incorrectly! Nonce uniqueness is the caller's
//! responsibility: a (key, nonce) pair must never be reused.
//!
//! # Usage
//!
//! ```
//! use chacha20_stream::{ChaCha20, StreamCipher};
//!
//! let key = [0x42; 32];
//! let nonce = [0x24; 12];
//!
//! let mut data = *b"hello I am a secret message";
//!
//! // encrypt in place
//! let mut cipher = ChaCha20::new(&key, &nonce)?;
//! cipher.apply_keystream(&mut data);
//! assert_ne!(&data, b"hello I am a secret message");
//!
//! // decrypt: a fresh cipher with the same key and nonce
//! let mut cipher = ChaCha20::new(&key, &nonce)?;
//! cipher.apply_keystream(&mut data);
//! assert_eq!(&data, b"hello I am a secret message");
//! # Ok::<(), chacha20_stream::Error>(())
//! ```
//!
//! [RFC 8439]: https://datatracker.ietf.org/doc/html/rfc8439

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]

mod backends;
mod block;
mod chacha;
mod cipher;
mod errors;
mod legacy;
mod variants;
mod xchacha;

pub use crate::chacha::ChaCha20;
pub use crate::errors::Error;
pub use crate::legacy::ChaCha20Legacy;
pub use crate::xchacha::{hchacha20, XChaCha20};

/// Length of a ChaCha20 key, in bytes.
pub const KEY_SIZE: usize = 32;

/// Length of an IETF ([`ChaCha20`]) nonce, in bytes.
pub const NONCE_SIZE: usize = 12;

/// Length of a draft ([`ChaCha20Legacy`]) nonce, in bytes.
pub const LEGACY_NONCE_SIZE: usize = 8;

/// Length of an [`XChaCha20`] nonce, in bytes.
pub const XCHACHA_NONCE_SIZE: usize = 24;

/// Length of the [`hchacha20`] input nonce, in bytes.
pub const HCHACHA_NONCE_SIZE: usize = 16;

/// Length of the subkey produced by [`hchacha20`], in bytes.
pub const HCHACHA_KEY_SIZE: usize = 32;

/// Size of a single keystream block, in bytes.
pub const BLOCK_SIZE: usize = 64;

/// A cipher which XORs an infinite keystream into caller-supplied buffers.
///
/// The keystream position advances by the number of bytes processed; a
/// cipher cannot be rewound. Implementations produce identical output for
/// any partitioning of the input across calls.
pub trait StreamCipher {
    /// XORs the next keystream bytes into `buf` in place.
    fn apply_keystream(&mut self, buf: &mut [u8]);

    /// XORs `src` with the next keystream bytes, writing the result into
    /// the first `src.len()` bytes of `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is shorter than `src`.
    fn xor_key_stream(&mut self, dst: &mut [u8], src: &[u8]) {
        assert!(dst.len() >= src.len(), "dst is shorter than src");
        let dst = &mut dst[..src.len()];
        dst.copy_from_slice(src);
        self.apply_keystream(dst);
    }
}
