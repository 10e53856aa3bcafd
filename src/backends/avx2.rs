//! AVX2 backend processing two interleaved 64-byte blocks per kernel step.
//!
//! The two-blocks-per-register layout follows Goll and Gueron,
//! "Vectorization of ChaCha Stream Cipher"
//! (<https://eprint.iacr.org/2013/759.pdf>): each 128-bit lane holds one
//! block's copy of a state row, so the rounds of two consecutive blocks
//! run in lockstep.
#![allow(unsafe_op_in_unsafe_fn)]

use core::cmp;
use core::marker::PhantomData;

use crate::block::{ROUNDS, STATE_WORDS};
use crate::variants::Variant;
use crate::BLOCK_SIZE;

#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

/// Kernel granularity: two blocks per kernel step.
const BUFFER_SIZE: usize = BLOCK_SIZE * 2;

/// Two views of a pair of state rows: one 256-bit vector for the rounds,
/// or the two per-block 128-bit rows for loads, stores, and the counter
/// bump.
#[derive(Clone, Copy)]
union StateWord {
    blocks: [__m128i; 2],
    avx: __m256i,
}

/// AVX2 stream driver. Identical bookkeeping to the SSE2 driver, but the
/// kernel granularity is 128 bytes, so the tail cache can carry up to two
/// blocks of keystream between calls.
pub(crate) struct Backend<V: Variant> {
    state: [u32; STATE_WORDS],
    tail: [u8; BUFFER_SIZE],
    tail_pos: usize,
    tail_len: usize,
    _variant: PhantomData<V>,
}

impl<V: Variant> Backend<V> {
    /// Callers must have verified that the CPU supports AVX2.
    pub(crate) fn new(state: [u32; STATE_WORDS]) -> Self {
        Self {
            state,
            tail: [0u8; BUFFER_SIZE],
            tail_pos: 0,
            tail_len: 0,
            _variant: PhantomData,
        }
    }

    pub(crate) fn apply_keystream(&mut self, mut buf: &mut [u8]) {
        if buf.is_empty() {
            return;
        }

        // Drain keystream left over from the previous call.
        if self.tail_len > 0 {
            let n = cmp::min(buf.len(), self.tail_len);
            let cache = &mut self.tail[self.tail_pos..self.tail_pos + n];
            for (b, k) in buf[..n].iter_mut().zip(cache.iter_mut()) {
                *b ^= *k;
                *k = 0;
            }
            self.tail_pos += n;
            self.tail_len -= n;

            buf = &mut buf[n..];
            if buf.is_empty() {
                return;
            }
        }

        let full = buf.len() - (buf.len() % BUFFER_SIZE);
        let (bulk, rest) = buf.split_at_mut(full);
        if !bulk.is_empty() {
            unsafe { xor_blocks::<V>(&mut self.state, bulk) };
        }

        if !rest.is_empty() {
            // Generate a full double-block through the tail cache. The
            // cache is all zero here, so the bytes past the remainder come
            // out as raw keystream and are kept for the next call. The
            // counter advances by two blocks regardless of how much of the
            // residue is ever consumed.
            let r = rest.len();
            self.tail[..r].copy_from_slice(rest);
            unsafe { xor_blocks::<V>(&mut self.state, &mut self.tail) };
            rest.copy_from_slice(&self.tail[..r]);

            for b in self.tail[..r].iter_mut() {
                *b = 0;
            }
            self.tail_pos = r;
            self.tail_len = BUFFER_SIZE - r;
        }
    }
}

impl<V: Variant> Drop for Backend<V> {
    fn drop(&mut self) {
        #[cfg(feature = "zeroize")]
        {
            self.state.zeroize();
            self.tail.zeroize();
        }
    }
}

/// XORs keystream into `buf`, which must be a whole number of double
/// blocks, and advances the counter by two blocks per 128 bytes processed.
#[target_feature(enable = "avx2")]
unsafe fn xor_blocks<V: Variant>(state: &mut [u32; STATE_WORDS], buf: &mut [u8]) {
    debug_assert_eq!(buf.len() % BUFFER_SIZE, 0);

    for chunk in buf.chunks_exact_mut(BUFFER_SIZE) {
        let state_ptr = state.as_ptr() as *const __m128i;
        let r0 = _mm_loadu_si128(state_ptr.add(0));
        let r1 = _mm_loadu_si128(state_ptr.add(1));
        let r2 = _mm_loadu_si128(state_ptr.add(2));
        let r3 = _mm_loadu_si128(state_ptr.add(3));

        // The high lane runs one block ahead of the low lane; only the
        // counter words differ between the two.
        let r3_next = if V::COUNTER_WORDS == 1 {
            _mm_add_epi32(r3, _mm_set_epi32(0, 0, 0, 1))
        } else {
            _mm_add_epi64(r3, _mm_set_epi64x(0, 1))
        };

        let s0 = StateWord { blocks: [r0, r0] };
        let s1 = StateWord { blocks: [r1, r1] };
        let s2 = StateWord { blocks: [r2, r2] };
        let s3 = StateWord {
            blocks: [r3, r3_next],
        };

        let mut v0 = s0;
        let mut v1 = s1;
        let mut v2 = s2;
        let mut v3 = s3;
        for _ in 0..ROUNDS / 2 {
            column_round(&mut v0.avx, &mut v1.avx, &mut v2.avx, &mut v3.avx);
            diagonalize(&mut v1.avx, &mut v2.avx, &mut v3.avx);
            column_round(&mut v0.avx, &mut v1.avx, &mut v2.avx, &mut v3.avx);
            undiagonalize(&mut v1.avx, &mut v2.avx, &mut v3.avx);
        }
        v0.avx = _mm256_add_epi32(v0.avx, s0.avx);
        v1.avx = _mm256_add_epi32(v1.avx, s1.avx);
        v2.avx = _mm256_add_epi32(v2.avx, s2.avx);
        v3.avx = _mm256_add_epi32(v3.avx, s3.avx);

        let chunk_ptr = chunk.as_mut_ptr() as *mut __m128i;
        for (i, v) in [v0, v1, v2, v3].iter().enumerate() {
            let lo = _mm_loadu_si128(chunk_ptr.add(i) as *const __m128i);
            _mm_storeu_si128(chunk_ptr.add(i), _mm_xor_si128(lo, v.blocks[0]));

            let hi = _mm_loadu_si128(chunk_ptr.add(i + 4) as *const __m128i);
            _mm_storeu_si128(chunk_ptr.add(i + 4), _mm_xor_si128(hi, v.blocks[1]));
        }

        V::add_block_pos(state, 2);
    }
}

/// Lane-wise rotate left of each 32-bit element.
macro_rules! rotl {
    ($x:expr, $n:literal) => {{
        let x = $x;
        _mm256_or_si256(_mm256_slli_epi32(x, $n), _mm256_srli_epi32(x, 32 - $n))
    }};
}

/// Runs the column quarter rounds of both blocks at once: with each block
/// held row-wise in a 128-bit lane, every 32-bit lane of (a, b, c, d) is
/// one column quad.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn column_round(a: &mut __m256i, b: &mut __m256i, c: &mut __m256i, d: &mut __m256i) {
    *a = _mm256_add_epi32(*a, *b);
    *d = rotl!(_mm256_xor_si256(*d, *a), 16);

    *c = _mm256_add_epi32(*c, *d);
    *b = rotl!(_mm256_xor_si256(*b, *c), 12);

    *a = _mm256_add_epi32(*a, *b);
    *d = rotl!(_mm256_xor_si256(*d, *a), 8);

    *c = _mm256_add_epi32(*c, *d);
    *b = rotl!(_mm256_xor_si256(*b, *c), 7);
}

/// Rotates the lanes of rows b, c, and d left by one, two, and three
/// places so that [`column_round`] computes the diagonal rounds.
/// `_mm256_shuffle_epi32` permutes each 128-bit half independently, so a
/// single shuffle realigns both blocks.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn diagonalize(b: &mut __m256i, c: &mut __m256i, d: &mut __m256i) {
    *b = _mm256_shuffle_epi32(*b, 0b00_11_10_01); // lanes 1,2,3,0
    *c = _mm256_shuffle_epi32(*c, 0b01_00_11_10); // lanes 2,3,0,1
    *d = _mm256_shuffle_epi32(*d, 0b10_01_00_11); // lanes 3,0,1,2
}

/// Rotates the lanes of rows b, c, and d back into row order.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn undiagonalize(b: &mut __m256i, c: &mut __m256i, d: &mut __m256i) {
    *b = _mm256_shuffle_epi32(*b, 0b10_01_00_11); // lanes 3,0,1,2
    *c = _mm256_shuffle_epi32(*c, 0b01_00_11_10); // lanes 2,3,0,1
    *d = _mm256_shuffle_epi32(*d, 0b00_11_10_01); // lanes 1,2,3,0
}
