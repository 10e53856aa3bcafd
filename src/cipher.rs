//! State construction and backend dispatch shared by all variants.

use crate::backends;
use crate::block::{CONSTANTS, STATE_WORDS};
use crate::errors::Error;
use crate::variants::Variant;
use crate::{HCHACHA_NONCE_SIZE, KEY_SIZE, LEGACY_NONCE_SIZE, NONCE_SIZE};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
cpufeatures::new!(avx2_cpuid, "avx2");
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
cpufeatures::new!(sse2_cpuid, "sse2");

/// Checks the key length and reborrows it as a fixed-size array.
#[inline]
pub(crate) fn check_key(key: &[u8]) -> Result<&[u8; KEY_SIZE], Error> {
    key.try_into().map_err(|_| Error::InvalidKeyLength)
}

/// Loads the ChaCha constants, key, counter, and nonce into a 16-word state.
///
/// The nonce length selects the layout: 12 bytes for the IETF variant
/// (32-bit counter), 8 bytes for the draft variant (64-bit counter), or
/// 16 bytes for the HChaCha20 input block (no counter, never streamed).
/// Constructors validate the length before calling.
pub(crate) fn init_state(key: &[u8; KEY_SIZE], nonce: &[u8]) -> [u32; STATE_WORDS] {
    let mut state = [0u32; STATE_WORDS];
    state[..4].copy_from_slice(&CONSTANTS);

    for (val, chunk) in state[4..12].iter_mut().zip(key.chunks_exact(4)) {
        *val = u32::from_le_bytes(chunk.try_into().unwrap());
    }

    let nonce_words = match nonce.len() {
        NONCE_SIZE => &mut state[13..16],
        LEGACY_NONCE_SIZE => &mut state[14..16],
        HCHACHA_NONCE_SIZE => &mut state[12..16],
        _ => unreachable!("nonce length validated by the constructors"),
    };
    for (val, chunk) in nonce_words.iter_mut().zip(nonce.chunks_exact(4)) {
        *val = u32::from_le_bytes(chunk.try_into().unwrap());
    }

    state
}

/// The streaming cipher core: one of the interchangeable backends, chosen
/// once at construction from the CPU capability probe.
pub(crate) struct ChaChaCore<V: Variant> {
    inner: Inner<V>,
}

enum Inner<V: Variant> {
    Soft(backends::soft::Backend<V>),
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    Sse2(backends::sse2::Backend<V>),
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    Avx2(backends::avx2::Backend<V>),
}

impl<V: Variant> ChaChaCore<V> {
    pub(crate) fn new(key: &[u8; KEY_SIZE], nonce: &[u8]) -> Self {
        let state = init_state(key, nonce);

        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            if avx2_cpuid::get() {
                return Self {
                    inner: Inner::Avx2(backends::avx2::Backend::new(state)),
                };
            }
            if sse2_cpuid::get() {
                return Self {
                    inner: Inner::Sse2(backends::sse2::Backend::new(state)),
                };
            }
        }

        Self {
            inner: Inner::Soft(backends::soft::Backend::new(state)),
        }
    }

    #[inline]
    pub(crate) fn apply_keystream(&mut self, buf: &mut [u8]) {
        match &mut self.inner {
            Inner::Soft(backend) => backend.apply_keystream(buf),
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Inner::Sse2(backend) => backend.apply_keystream(buf),
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Inner::Avx2(backend) => backend.apply_keystream(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::{Ietf, Legacy};

    const KEY: [u8; KEY_SIZE] = [7u8; KEY_SIZE];

    // Chunk sizes straddling both kernel granularities.
    const CHUNKS: &[usize] = &[1, 3, 63, 64, 65, 100, 127, 128, 129, 255, 256, 257, 512];

    fn keystream_chunked<V: Variant>(nonce: &[u8], len: usize) -> Vec<u8> {
        let mut core = ChaChaCore::<V>::new(&KEY, nonce);
        let mut out = vec![0u8; len];
        let mut pieces = CHUNKS.iter().cycle();
        let mut rest = out.as_mut_slice();
        while !rest.is_empty() {
            let n = (*pieces.next().unwrap()).min(rest.len());
            let (head, tail) = rest.split_at_mut(n);
            core.apply_keystream(head);
            rest = tail;
        }
        out
    }

    fn keystream_soft<V: Variant>(nonce: &[u8], len: usize) -> Vec<u8> {
        let state = init_state(&KEY, nonce);
        let mut backend = backends::soft::Backend::<V>::new(state);
        let mut out = vec![0u8; len];
        backend.apply_keystream(&mut out);
        out
    }

    #[test]
    fn dispatched_backend_matches_soft_ietf() {
        let nonce = [3u8; NONCE_SIZE];
        assert_eq!(
            keystream_chunked::<Ietf>(&nonce, 4096),
            keystream_soft::<Ietf>(&nonce, 4096),
        );
    }

    #[test]
    fn dispatched_backend_matches_soft_legacy() {
        let nonce = [9u8; LEGACY_NONCE_SIZE];
        assert_eq!(
            keystream_chunked::<Legacy>(&nonce, 4096),
            keystream_soft::<Legacy>(&nonce, 4096),
        );
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    mod simd {
        use super::*;

        #[test]
        fn sse2_matches_soft() {
            if !sse2_cpuid::get() {
                return;
            }
            let nonce = [5u8; LEGACY_NONCE_SIZE];
            let state = init_state(&KEY, &nonce);
            let mut backend = backends::sse2::Backend::<Legacy>::new(state);

            let mut out = vec![0u8; 8192];
            let mut rest = out.as_mut_slice();
            let mut pieces = CHUNKS.iter().cycle();
            while !rest.is_empty() {
                let n = (*pieces.next().unwrap()).min(rest.len());
                let (head, tail) = rest.split_at_mut(n);
                backend.apply_keystream(head);
                rest = tail;
            }

            assert_eq!(out, keystream_soft::<Legacy>(&nonce, 8192));
        }

        #[test]
        fn avx2_matches_soft() {
            if !avx2_cpuid::get() {
                return;
            }
            let nonce = [5u8; NONCE_SIZE];
            let state = init_state(&KEY, &nonce);
            let mut backend = backends::avx2::Backend::<Ietf>::new(state);

            let mut out = vec![0u8; 8192];
            let mut rest = out.as_mut_slice();
            let mut pieces = CHUNKS.iter().cycle();
            while !rest.is_empty() {
                let n = (*pieces.next().unwrap()).min(rest.len());
                let (head, tail) = rest.split_at_mut(n);
                backend.apply_keystream(head);
                rest = tail;
            }

            assert_eq!(out, keystream_soft::<Ietf>(&nonce, 8192));
        }
    }
}
