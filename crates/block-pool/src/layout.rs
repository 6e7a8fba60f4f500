//! Heap region and pool geometry.
//!
//! Pools are laid out back to back in table order, each pool's blocks back to
//! back in address order:
//!
//! ```text
//! heap ─┬─ pool 0: block 0 │ block 1 │ ... │ block n0-1
//!       ├─ pool 1: block 0 │ block 1 │ ... │ block n1-1
//!       └─ ...
//! ```
//!
//! A block occupies its payload size rounded up to [`BLOCK_ALIGN`] (its
//! *stride*). Block metadata lives out of band in the slot arena, so the
//! heap holds payload bytes only.

use core::{cell::UnsafeCell, ops::Range, ptr::NonNull};

use crate::config::PoolTable;

/// Alignment of every block payload.
pub const BLOCK_ALIGN: usize = 8;

/// Bytes a block of `block_size` payload bytes occupies in the heap.
#[must_use]
pub const fn stride_of(block_size: u32) -> usize {
    (block_size as usize).next_multiple_of(BLOCK_ALIGN)
}

/// Statically sized backing storage for all pools.
#[repr(C, align(8))]
pub(crate) struct HeapRegion<const H: usize> {
    bytes: UnsafeCell<[u8; H]>,
}
const _: () = assert!(align_of::<HeapRegion<0>>() >= BLOCK_ALIGN);

// Blocks are handed out as raw pointers; access to the bytes is coordinated by
// the free lists, not by references to the region.
unsafe impl<const H: usize> Sync for HeapRegion<H> {}

impl<const H: usize> HeapRegion<H> {
    pub(crate) const fn new() -> Self {
        Self {
            bytes: UnsafeCell::new([0; H]),
        }
    }

    pub(crate) fn base(&self) -> NonNull<u8> {
        NonNull::from(&self.bytes).cast()
    }

    pub(crate) fn range(&self) -> Range<usize> {
        let start = self.base().addr().get();
        start..start + H
    }

    /// Pointer to the byte at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is past the end of the region.
    pub(crate) fn at(&self, offset: usize) -> NonNull<u8> {
        assert!(offset <= H, "offset {offset} is outside the heap");
        unsafe { self.base().add(offset) }
    }
}

/// Geometry of one pool class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolInfo {
    /// Payload bytes per block.
    pub block_size: u32,
    pub block_count: u32,
    /// Block size of the next larger class, or 0 for the largest.
    pub next_class_size: u32,
    /// Bytes between consecutive blocks.
    pub stride: usize,
    /// Offset of the first block from the start of the heap.
    pub offset: usize,
    /// Index of the first block in the slot arena.
    pub first_slot: usize,
}

impl PoolInfo {
    const EMPTY: Self = Self {
        block_size: 0,
        block_count: 0,
        next_class_size: 0,
        stride: 0,
        offset: 0,
        first_slot: 0,
    };

    /// Bytes covered by this pool.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stride * self.block_count as usize
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.block_count == 0
    }

    /// Slot arena indices of this pool's blocks.
    #[must_use]
    pub const fn slots(&self) -> Range<usize> {
        self.first_slot..self.first_slot + self.block_count as usize
    }

    /// Heap offset of the `index`-th block of this pool.
    #[must_use]
    pub const fn block_offset(&self, index: usize) -> usize {
        self.offset + index * self.stride
    }
}

/// Where a heap offset falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockLocation {
    pub(crate) pool: usize,
    pub(crate) slot: usize,
    /// Heap offset of the containing block.
    pub(crate) block_offset: usize,
    /// Distance from the start of the containing block.
    pub(crate) within: usize,
}

impl BlockLocation {
    pub(crate) const fn is_block_start(&self) -> bool {
        self.within == 0
    }
}

#[derive(Debug)]
pub(crate) struct Geometry<const P: usize> {
    pools: [PoolInfo; P],
}

impl<const P: usize> Geometry<P> {
    pub(crate) const fn new(table: &PoolTable) -> Self {
        assert!(
            table.pool_count() == P,
            "pool count does not match the pool table"
        );

        let mut pools = [PoolInfo::EMPTY; P];
        let mut offset = 0;
        let mut first_slot = 0;
        let mut i = 0;
        while i < P {
            let Some(class) = table.class(i) else {
                unreachable!();
            };
            let next_class_size = match table.class(i + 1) {
                Some(next) => next.block_size,
                None => 0,
            };
            let pool = PoolInfo {
                block_size: class.block_size,
                block_count: class.block_count,
                next_class_size,
                stride: stride_of(class.block_size),
                offset,
                first_slot,
            };
            offset += pool.len();
            first_slot += class.block_count as usize;
            pools[i] = pool;
            i += 1;
        }
        Self { pools }
    }

    pub(crate) fn pools(&self) -> &[PoolInfo; P] {
        &self.pools
    }

    /// Smallest class whose blocks hold `size` bytes.
    pub(crate) fn first_fit(&self, size: u32) -> Option<usize> {
        self.pools.iter().position(|pool| pool.block_size >= size)
    }

    /// Finds the block containing heap offset `offset`.
    pub(crate) fn locate(&self, offset: usize) -> Option<BlockLocation> {
        self.pools.iter().enumerate().find_map(|(index, pool)| {
            let relative = offset.checked_sub(pool.offset)?;
            if relative >= pool.len() {
                return None;
            }
            let block = relative / pool.stride;
            Some(BlockLocation {
                pool: index,
                slot: pool.first_slot + block,
                block_offset: pool.block_offset(block),
                within: relative % pool.stride,
            })
        })
    }
}
