//! Backends providing the ChaCha20 keystream layer.
//!
//! The portable backend is always compiled: it is the runtime fallback and
//! the reference the SIMD backends are validated against.

use cfg_if::cfg_if;

pub(crate) mod soft;

cfg_if! {
    if #[cfg(any(target_arch = "x86", target_arch = "x86_64"))] {
        pub(crate) mod avx2;
        pub(crate) mod sse2;
    }
}
