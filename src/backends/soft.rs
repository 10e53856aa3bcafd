//! Portable reference backend which does not rely on architecture-specific
//! intrinsics.

use core::cmp;
use core::marker::PhantomData;

use crate::block::{run_rounds, STATE_WORDS};
use crate::variants::Variant;
use crate::BLOCK_SIZE;

#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

/// Scalar stream driver: one cached keystream block and a byte offset into
/// it. Output continues from the cached block across calls, so the stream
/// is independent of how callers partition their input.
pub(crate) struct Backend<V: Variant> {
    state: [u32; STATE_WORDS],
    block: [u8; BLOCK_SIZE],
    offset: usize,
    _variant: PhantomData<V>,
}

impl<V: Variant> Backend<V> {
    pub(crate) fn new(state: [u32; STATE_WORDS]) -> Self {
        let mut backend = Self {
            state,
            block: [0u8; BLOCK_SIZE],
            offset: 0,
            _variant: PhantomData,
        };
        backend.refill();
        backend
    }

    pub(crate) fn apply_keystream(&mut self, mut buf: &mut [u8]) {
        while !buf.is_empty() {
            if self.offset == BLOCK_SIZE {
                self.refill();
            }

            let n = cmp::min(buf.len(), BLOCK_SIZE - self.offset);
            let cache = &mut self.block[self.offset..self.offset + n];
            for (b, k) in buf[..n].iter_mut().zip(cache.iter_mut()) {
                *b ^= *k;
                // consumed keystream bytes must not linger in the cache
                *k = 0;
            }

            self.offset += n;
            buf = &mut buf[n..];
        }
    }

    /// Generates the next keystream block into the cache and advances the
    /// block counter, carrying into the high word for 64-bit variants.
    fn refill(&mut self) {
        let res = run_rounds(&self.state);
        for (chunk, val) in self.block.chunks_exact_mut(4).zip(res.iter()) {
            chunk.copy_from_slice(&val.to_le_bytes());
        }
        V::add_block_pos(&mut self.state, 1);
        self.offset = 0;
    }
}

impl<V: Variant> Drop for Backend<V> {
    fn drop(&mut self) {
        #[cfg(feature = "zeroize")]
        {
            self.state.zeroize();
            self.block.zeroize();
        }
    }
}
