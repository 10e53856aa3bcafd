//! SSE2 backend processing one 64-byte block per kernel step.
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

/// Kernel granularity: bytes consumed per kernel step.
const BUFFER_SIZE: usize = BLOCK_SIZE;

/// SSE2 stream driver. Bulk input is handed to the vectorized kernel in
/// whole blocks; the sub-block remainder is transformed through the tail
/// cache, whose unconsumed suffix carries over into the next call.
pub(crate) struct Backend<V: Variant> {
    state: [u32; STATE_WORDS],
    tail: [u8; BUFFER_SIZE],
    tail_pos: usize,
    tail_len: usize,
    _variant: PhantomData<V>,
}

impl<V: Variant> Backend<V> {
    /// Callers must have verified that the CPU supports SSE2.
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
            // Generate a full block through the tail cache. The cache is
            // all zero here, so the bytes past the remainder come out as
            // raw keystream and are kept for the next call.
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

/// XORs keystream into `buf`, which must be a whole number of blocks, and
/// advances the counter by one block per 64 bytes processed.
#[target_feature(enable = "sse2")]
unsafe fn xor_blocks<V: Variant>(state: &mut [u32; STATE_WORDS], buf: &mut [u8]) {
    debug_assert_eq!(buf.len() % BUFFER_SIZE, 0);

    for chunk in buf.chunks_exact_mut(BUFFER_SIZE) {
        let state_ptr = state.as_ptr() as *const __m128i;
        let vs = [
            _mm_loadu_si128(state_ptr.add(0)),
            _mm_loadu_si128(state_ptr.add(1)),
            _mm_loadu_si128(state_ptr.add(2)),
            _mm_loadu_si128(state_ptr.add(3)),
        ];

        let mut v = vs;
        for _ in 0..ROUNDS / 2 {
            column_round(&mut v);
            diagonalize(&mut v);
            column_round(&mut v);
            undiagonalize(&mut v);
        }
        for i in 0..4 {
            v[i] = _mm_add_epi32(v[i], vs[i]);
        }

        let chunk_ptr = chunk.as_mut_ptr() as *mut __m128i;
        for i in 0..4 {
            let p = _mm_loadu_si128(chunk_ptr.add(i) as *const __m128i);
            _mm_storeu_si128(chunk_ptr.add(i), _mm_xor_si128(p, v[i]));
        }

        V::add_block_pos(state, 1);
    }
}

/// Lane-wise rotate left of each 32-bit element.
macro_rules! rotl {
    ($x:expr, $n:literal) => {{
        let x = $x;
        _mm_or_si128(_mm_slli_epi32(x, $n), _mm_srli_epi32(x, 32 - $n))
    }};
}

/// Runs four quarter rounds at once, one per 32-bit lane: with the state
/// held row-wise, lane i of (a, b, c, d) is the column quad
/// (i, i+4, i+8, i+12).
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn column_round([a, b, c, d]: &mut [__m128i; 4]) {
    *a = _mm_add_epi32(*a, *b);
    *d = rotl!(_mm_xor_si128(*d, *a), 16);

    *c = _mm_add_epi32(*c, *d);
    *b = rotl!(_mm_xor_si128(*b, *c), 12);

    *a = _mm_add_epi32(*a, *b);
    *d = rotl!(_mm_xor_si128(*d, *a), 8);

    *c = _mm_add_epi32(*c, *d);
    *b = rotl!(_mm_xor_si128(*b, *c), 7);
}

/// Rotates the lanes of rows b, c, and d left by one, two, and three
/// places. Lane 0 then reads (w0, w5, w10, w15), lane 1 (w1, w6, w11, w12),
/// and so on, which makes [`column_round`] compute the diagonal rounds.
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn diagonalize([_, b, c, d]: &mut [__m128i; 4]) {
    *b = _mm_shuffle_epi32(*b, 0b00_11_10_01); // lanes 1,2,3,0
    *c = _mm_shuffle_epi32(*c, 0b01_00_11_10); // lanes 2,3,0,1
    *d = _mm_shuffle_epi32(*d, 0b10_01_00_11); // lanes 3,0,1,2
}

/// Rotates the lanes of rows b, c, and d back into row order.
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn undiagonalize([_, b, c, d]: &mut [__m128i; 4]) {
    *b = _mm_shuffle_epi32(*b, 0b10_01_00_11); // lanes 3,0,1,2
    *c = _mm_shuffle_epi32(*c, 0b01_00_11_10); // lanes 2,3,0,1
    *d = _mm_shuffle_epi32(*d, 0b00_11_10_01); // lanes 1,2,3,0
}
