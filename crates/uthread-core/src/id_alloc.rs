//! Identity allocator
//!
//! Hands out the lowest free identity in a fixed-size space. Backed by a
//! bitmap of u64 blocks (set bit = identity in use), scanned with
//! `trailing_ones` so allocation is a short walk over at most
//! `max / 64` words.

use crate::error::{SchedError, SchedResult};
use crate::id::ThreadId;

/// Number of bits per block
const BITS_PER_BLOCK: usize = 64;

/// Lowest-free-first identity allocator
pub struct IdAllocator {
    /// Bitmap blocks (each u64 tracks 64 identities)
    blocks: Box<[u64]>,

    /// Size of the identity space
    max_ids: u32,

    /// Number of identities in use
    in_use: u32,
}

impl IdAllocator {
    /// Create an allocator for identities `0..max_ids`
    pub fn new(max_ids: usize) -> Self {
        let num_blocks = (max_ids + BITS_PER_BLOCK - 1) / BITS_PER_BLOCK;
        Self {
            blocks: vec![0u64; num_blocks].into_boxed_slice(),
            max_ids: max_ids as u32,
            in_use: 0,
        }
    }

    /// Claim the smallest identity not currently in use
    pub fn allocate(&mut self) -> SchedResult<ThreadId> {
        for (block_idx, block) in self.blocks.iter_mut().enumerate() {
            if *block == u64::MAX {
                continue;
            }

            // Lowest clear bit
            let bit_idx = block.trailing_ones() as usize;
            let idx = block_idx * BITS_PER_BLOCK + bit_idx;
            if idx >= self.max_ids as usize {
                break;
            }

            *block |= 1u64 << bit_idx;
            self.in_use += 1;
            return Ok(ThreadId::new(idx as u32));
        }

        Err(SchedError::CapacityExceeded)
    }

    /// Return an identity to the pool
    ///
    /// Releasing an identity that is out of range or already free is ignored.
    pub fn release(&mut self, id: ThreadId) {
        if !self.is_in_use(id) {
            return;
        }
        let idx = id.as_usize();
        self.blocks[idx / BITS_PER_BLOCK] &= !(1u64 << (idx % BITS_PER_BLOCK));
        self.in_use -= 1;
    }

    /// Check whether an identity is currently allocated
    #[inline]
    pub fn is_in_use(&self, id: ThreadId) -> bool {
        let idx = id.as_usize();
        if idx >= self.max_ids as usize {
            return false;
        }
        (self.blocks[idx / BITS_PER_BLOCK] & (1u64 << (idx % BITS_PER_BLOCK))) != 0
    }

    /// Check if an identity lies inside the configured space
    #[inline]
    pub fn in_range(&self, id: ThreadId) -> bool {
        id.as_u32() < self.max_ids
    }

    /// Number of identities in use
    #[inline]
    pub fn in_use(&self) -> u32 {
        self.in_use
    }

    /// Size of the identity space
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.max_ids
    }
}
