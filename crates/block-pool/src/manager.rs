//! The memory manager: initialization, allocation, free and queries.

use core::{
    panic::Location,
    ptr::NonNull,
    sync::atomic::{AtomicU32, Ordering},
};

use arrayvec::ArrayVec;
use snafu::ensure;
use spin::Once;

use crate::{
    config::{MemConfig, PoolTable},
    error::{
        self, AllocError, ExhaustedSnafu, Fault, FreeError, NullPointerSnafu,
        UninitializedSnafu, UnknownPointerSnafu, ZeroSizeSnafu,
    },
    free_list::{BlockSlot, FreeList},
    layout::{BlockLocation, Geometry, HeapRegion, PoolInfo},
    stats::PoolStatistics,
    sync::IrqMutex,
    tracking::{Ledger, TrackingEntry},
};

/// Fixed-size-class block allocator over a statically sized heap.
///
/// `P`, `B` and `H` are the pool count, total block count and heap size of
/// the table; derive them from the table itself:
///
/// ```
/// use block_pool::{MemConfig, MemManager, PoolClassConfig, PoolTable};
///
/// const TABLE: PoolTable = PoolTable::new(&[
///     PoolClassConfig::new(16, 4),
///     PoolClassConfig::new(64, 2),
/// ]);
///
/// static MEM: MemManager<
///     { TABLE.pool_count() },
///     { TABLE.block_count() },
///     { TABLE.heap_size() },
/// > = MemManager::new(TABLE, MemConfig::INSTRUMENTED);
///
/// MEM.init();
/// let block = MEM.alloc(10).unwrap();
/// assert_eq!(MEM.block_size(block.as_ptr()), 16);
/// MEM.free(block.as_ptr()).unwrap();
/// ```
///
/// Blocks are handed out as raw pointers into the manager's own storage, so
/// the manager must not move after [`init`](Self::init); in practice it is a
/// `static`.
pub struct MemManager<const P: usize, const B: usize, const H: usize> {
    table: PoolTable,
    config: MemConfig,
    geometry: Geometry<P>,
    heap: HeapRegion<H>,
    /// Free-list lengths, readable without taking the lock.
    free_counts: [AtomicU32; P],
    state: IrqMutex<PoolState<P, B>>,
    initialized: Once<()>,
}

/// Everything that changes on alloc and free.
#[derive(Debug)]
struct PoolState<const P: usize, const B: usize> {
    slots: [BlockSlot; B],
    lists: [FreeList; P],
    stats: [PoolStatistics; P],
    ledger: Ledger<B>,
}

impl<const P: usize, const B: usize> PoolState<P, B> {
    const fn new() -> Self {
        Self {
            slots: [BlockSlot::UNUSED; B],
            lists: [FreeList::new(0); P],
            stats: [PoolStatistics::ZERO; P],
            ledger: Ledger::new(),
        }
    }

    #[expect(clippy::cast_possible_truncation)]
    fn reset(&mut self, pools: &[PoolInfo; P], heap_base: usize) {
        for (index, pool) in pools.iter().enumerate() {
            // The table guarantees that pool and slot indices fit.
            let pool_id = index as u16;
            let list = &mut self.lists[index];
            *list = FreeList::new(pool_id);
            self.stats[index] = PoolStatistics::new(pool.block_count);

            for (block, slot) in pool.slots().enumerate() {
                self.slots[slot] = BlockSlot::new(pool_id);
                list.push_back(&mut self.slots, slot as u32);
                self.ledger
                    .reset(slot, heap_base + pool.block_offset(block), pool.block_size);
            }
        }
    }

    /// Pops a block from pool `first` or, when it is empty, the next larger
    /// pool that has one.
    fn take(&mut self, first: usize) -> Option<(usize, usize)> {
        (first..P).find_map(|pool| {
            let slot = self.lists[pool].pop_front(&mut self.slots)?;
            Some((pool, slot as usize))
        })
    }

    #[expect(clippy::cast_possible_truncation)]
    fn give_back(&mut self, block: &BlockLocation, addr: usize) -> Result<(), Fault> {
        let slot = &self.slots[block.slot];
        if slot.pool() != block.pool {
            return Err(Fault::UnknownPointer { addr });
        }
        if slot.is_free() {
            return Err(Fault::DoubleFree {
                addr,
                pool: block.pool,
            });
        }
        self.lists[block.pool].push_back(&mut self.slots, block.slot as u32);
        Ok(())
    }
}

impl<const P: usize, const B: usize, const H: usize> MemManager<P, B, H> {
    /// Creates an uninitialized manager for `table`.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in a `static`) if `P`, `B` or `H` do not match
    /// the table.
    #[must_use]
    pub const fn new(table: PoolTable, config: MemConfig) -> Self {
        assert!(
            table.block_count() == B,
            "block count does not match the pool table"
        );
        assert!(
            table.heap_size() == H,
            "heap size does not match the pool table"
        );
        Self {
            table,
            config,
            geometry: Geometry::new(&table),
            heap: HeapRegion::new(),
            free_counts: [const { AtomicU32::new(0) }; P],
            state: IrqMutex::new(PoolState::new()),
            initialized: Once::new(),
        }
    }

    /// Carves the heap into blocks and fills every pool's free list.
    ///
    /// Must run before any other operation. Later calls are ignored.
    pub fn init(&self) {
        let mut first = false;
        self.initialized.call_once(|| {
            first = true;
            let mut state = self.state.lock();
            state.reset(self.geometry.pools(), self.heap.range().start);
            for (count, list) in self.free_counts.iter().zip(&state.lists) {
                count.store(list.len(), Ordering::Relaxed);
            }
        });

        if !first {
            warn!("memory manager is already initialized");
            return;
        }
        info!(
            "memory manager initialized: {} pools, {} blocks, {} heap bytes at {:#x}",
            P,
            B,
            H,
            self.heap.range().start
        );
        for (index, pool) in self.geometry.pools().iter().enumerate() {
            info!(
                "  pool {index}: {} x {} bytes",
                pool.block_count, pool.block_size
            );
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.is_completed()
    }

    #[must_use]
    pub fn config(&self) -> &MemConfig {
        &self.config
    }

    #[must_use]
    pub fn table(&self) -> &PoolTable {
        &self.table
    }

    /// Allocates a block of at least `requested` bytes.
    ///
    /// The request is served by the smallest class that fits; when that class
    /// is exhausted the next larger class is tried, and so on. Never blocks.
    #[track_caller]
    pub fn alloc(&self, requested: u32) -> Result<NonNull<u8>, AllocError> {
        let caller = Location::caller();
        ensure!(requested > 0, ZeroSizeSnafu);
        ensure!(self.is_initialized(), UninitializedSnafu);

        let mut fault = None;
        let taken = {
            let mut state = self.state.lock();
            let first = self.geometry.first_fit(requested);
            let taken = first.and_then(|first| state.take(first));
            match taken {
                Some((pool, slot)) => {
                    self.free_counts[pool].fetch_sub(1, Ordering::Relaxed);
                    if self.config.has_statistics() {
                        state.stats[pool].record_alloc();
                    }
                    if self.config.has_tracking() {
                        match state.ledger.mark_alloc(slot, requested, caller) {
                            Ok(waste) if self.config.has_statistics() => {
                                state.stats[pool].add_waste(waste);
                            }
                            Ok(_) => {}
                            Err(err) => fault = Some(err),
                        }
                    }
                    if first != Some(pool) {
                        trace!("alloc of {requested} bytes escalated to pool {pool}");
                    }
                }
                None => {
                    if self.config.has_statistics() {
                        state.stats[P - 1].record_alloc_failure();
                    }
                    fault = Some(Fault::Exhausted { requested });
                }
            }
            taken
        };

        if let Some(fault) = &fault {
            self.report_fault(fault);
        }
        let Some((pool, slot)) = taken else {
            return ExhaustedSnafu { requested }.fail();
        };
        let info = &self.geometry.pools()[pool];
        Ok(self.block_ptr(info, slot - info.first_slot))
    }

    /// Returns a block to its pool.
    ///
    /// `ptr` must be a pointer obtained from [`alloc`](Self::alloc). Null,
    /// foreign and interior pointers are rejected, as is a block that is
    /// already free.
    #[track_caller]
    pub fn free(&self, ptr: *mut u8) -> Result<(), FreeError> {
        let caller = Location::caller();
        ensure!(!ptr.is_null(), NullPointerSnafu);

        let addr = ptr.addr();
        let Some(block) = self.locate(addr) else {
            self.report_fault(&Fault::UnknownPointer { addr });
            return UnknownPointerSnafu { addr }.fail();
        };
        if !block.is_block_start() {
            if self.config.has_statistics() {
                self.state.lock().stats[block.pool].record_free_failure();
            }
            self.report_fault(&Fault::UnknownPointer { addr });
            return UnknownPointerSnafu { addr }.fail();
        }

        let mut fault = None;
        let result = {
            let mut state = self.state.lock();
            let result = state.give_back(&block, addr);
            match result {
                Ok(()) => {
                    self.free_counts[block.pool].fetch_add(1, Ordering::Relaxed);
                    if self.config.has_statistics() {
                        state.stats[block.pool].record_free();
                    }
                    if self.config.has_tracking() {
                        match state.ledger.mark_free(block.slot, caller) {
                            Ok(waste) if self.config.has_statistics() => {
                                state.stats[block.pool].remove_waste(waste);
                            }
                            Ok(_) => {}
                            Err(err) => fault = Some(err),
                        }
                    }
                }
                Err(err) => {
                    if self.config.has_statistics() {
                        state.stats[block.pool].record_free_failure();
                    }
                    fault = Some(err);
                }
            }
            result
        };

        if let Some(fault) = &fault {
            self.report_fault(fault);
        }
        match result {
            Ok(()) => Ok(()),
            Err(fault) => Err(fault.into_free_error()),
        }
    }

    /// Number of free blocks in every pool whose blocks hold `min_size`
    /// bytes.
    ///
    /// Reads without locking; the result is a snapshot that may race with
    /// concurrent alloc/free.
    #[must_use]
    pub fn available_blocks(&self, min_size: u32) -> u32 {
        self.geometry
            .pools()
            .iter()
            .zip(&self.free_counts)
            .filter(|(pool, _)| pool.block_size >= min_size)
            .map(|(_, count)| count.load(Ordering::Relaxed))
            .sum()
    }

    /// Number of free blocks across all pools.
    #[must_use]
    pub fn free_blocks(&self) -> u32 {
        self.available_blocks(0)
    }

    /// Free blocks in pool `index`.
    #[must_use]
    pub fn free_blocks_in(&self, index: usize) -> Option<u32> {
        self.free_counts
            .get(index)
            .map(|count| count.load(Ordering::Relaxed))
    }

    /// Configured block size of the pool owning `ptr`; 0 for null and for
    /// pointers that are not the start of a block.
    #[must_use]
    pub fn block_size(&self, ptr: *const u8) -> u32 {
        if ptr.is_null() {
            return 0;
        }
        self.locate(ptr.addr())
            .filter(BlockLocation::is_block_start)
            .map_or(0, |block| self.geometry.pools()[block.pool].block_size)
    }

    /// Returns `true` if writing `size` bytes at `ptr` would run past the end
    /// of the block containing `ptr`.
    ///
    /// Pointers outside the heap are not managed here and never fault.
    #[must_use]
    pub fn check_bounds(&self, ptr: *const u8, size: u32) -> bool {
        let Some(block) = self.locate(ptr.addr()) else {
            return false;
        };
        let block_size = self.geometry.pools()[block.pool].block_size as usize;
        let overrun = block
            .within
            .checked_add(size as usize)
            .is_none_or(|end| end > block_size);
        if overrun {
            let fault = Fault::BoundsViolation {
                addr: ptr.addr(),
                size,
            };
            self.report_fault(&fault);
        }
        overrun
    }

    #[must_use]
    pub fn pool_count(&self) -> usize {
        P
    }

    #[must_use]
    pub fn pool_info(&self, index: usize) -> Option<PoolInfo> {
        self.geometry.pools().get(index).copied()
    }

    pub fn pools(&self) -> impl Iterator<Item = &PoolInfo> {
        self.geometry.pools().iter()
    }

    /// Statistics of pool `index`, if statistics are enabled.
    #[must_use]
    pub fn pool_statistics(&self, index: usize) -> Option<PoolStatistics> {
        if !self.config.has_statistics() {
            return None;
        }
        self.state.lock().stats.get(index).copied()
    }

    /// Statistics of every pool, taken under one lock.
    #[must_use]
    pub fn all_statistics(&self) -> ArrayVec<PoolStatistics, P> {
        if !self.config.has_statistics() {
            return ArrayVec::new();
        }
        self.state.lock().stats.iter().copied().collect()
    }

    /// Ledger entry of the block starting at `ptr`, if tracking is enabled.
    #[must_use]
    pub fn tracking_entry(&self, ptr: *const u8) -> Option<TrackingEntry> {
        if !self.config.has_tracking() {
            return None;
        }
        let block = self
            .locate(ptr.addr())
            .filter(BlockLocation::is_block_start)?;
        self.state.lock().ledger.get(block.slot).copied()
    }

    pub(crate) fn heap_contains(&self, addr: usize) -> bool {
        self.heap.range().contains(&addr)
    }

    /// Pointer to the `index`-th block of `pool`.
    pub(crate) fn block_ptr(&self, pool: &PoolInfo, index: usize) -> NonNull<u8> {
        self.heap.at(pool.block_offset(index))
    }

    pub(crate) fn reset_peaks(&self) {
        if self.config.has_statistics() {
            for stats in &mut self.state.lock().stats {
                stats.reset_peaks();
            }
        }
    }

    /// Block containing `addr`; `None` outside the heap and before `init`.
    pub(crate) fn locate(&self, addr: usize) -> Option<BlockLocation> {
        if !self.is_initialized() {
            return None;
        }
        let offset = addr.checked_sub(self.heap.range().start)?;
        if offset >= H {
            return None;
        }
        self.geometry.locate(offset)
    }

    fn report_fault(&self, fault: &Fault) {
        if fault.is_exhausted() {
            warn!("{fault}");
        } else {
            error!("{fault}");
        }
        error::raise(&self.config, fault);
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use alloc::vec::Vec;
    use core::sync::atomic::AtomicUsize;

    use super::*;
    use crate::config::{Instrumentation, PoolClassConfig};

    const TABLE: PoolTable = PoolTable::new(&[
        PoolClassConfig::new(16, 4),
        PoolClassConfig::new(64, 2),
        PoolClassConfig::END,
    ]);

    type TestManager =
        MemManager<{ TABLE.pool_count() }, { TABLE.block_count() }, { TABLE.heap_size() }>;

    fn with_manager<F>(config: MemConfig, test_fn: F)
    where
        F: FnOnce(&TestManager),
    {
        let manager = TestManager::new(TABLE, config);
        manager.init();
        test_fn(&manager);
    }

    fn assert_conserved(manager: &TestManager) {
        for index in 0..manager.pool_count() {
            let stats = manager.pool_statistics(index).unwrap();
            assert_eq!(
                manager.free_blocks_in(index).unwrap() + stats.allocated_blocks,
                stats.num_blocks,
                "pool {index}"
            );
        }
    }

    #[test]
    fn test_initial_state() {
        with_manager(MemConfig::INSTRUMENTED, |manager| {
            assert!(manager.is_initialized());
            assert_eq!(manager.free_blocks(), 6);
            assert_eq!(manager.available_blocks(17), 2);
            assert_eq!(manager.available_blocks(65), 0);
            assert_eq!(
                manager.pool_statistics(1),
                Some(PoolStatistics::new(2))
            );
        });
    }

    #[test]
    fn test_init_twice_is_ignored() {
        with_manager(MemConfig::INSTRUMENTED, |manager| {
            let block = manager.alloc(16).unwrap();
            manager.init();
            assert_eq!(manager.free_blocks(), 5);
            manager.free(block.as_ptr()).unwrap();
        });
    }

    #[test]
    fn test_operations_before_init() {
        let manager = TestManager::new(TABLE, MemConfig::PRODUCTION);
        assert!(matches!(
            manager.alloc(16),
            Err(AllocError::Uninitialized { .. })
        ));
        assert_eq!(manager.available_blocks(0), 0);

        let first = manager.heap.at(0).as_ptr();
        assert_eq!(manager.block_size(first), 0);
        assert!(!manager.check_bounds(first, 1000));
        assert!(matches!(
            manager.free(first),
            Err(FreeError::UnknownPointer { .. })
        ));
    }

    #[test]
    fn test_alloc_zero() {
        with_manager(MemConfig::INSTRUMENTED, |manager| {
            assert!(matches!(manager.alloc(0), Err(AllocError::ZeroSize { .. })));
            assert_eq!(manager.free_blocks(), 6);
        });
    }

    #[test]
    fn test_blocks_come_out_in_address_order() {
        with_manager(MemConfig::PRODUCTION, |manager| {
            let blocks = (0..4)
                .map(|_| manager.alloc(8).unwrap())
                .collect::<Vec<_>>();
            for pair in blocks.windows(2) {
                assert_eq!(pair[1].addr().get() - pair[0].addr().get(), 16);
            }
            for block in blocks {
                manager.free(block.as_ptr()).unwrap();
            }
        });
    }

    #[test]
    fn test_escalation_and_exhaustion() {
        with_manager(MemConfig::INSTRUMENTED, |manager| {
            let mut blocks = Vec::new();
            for _ in 0..4 {
                let block = manager.alloc(16).unwrap();
                assert_eq!(manager.block_size(block.as_ptr()), 16);
                blocks.push(block);
            }
            for _ in 0..2 {
                let block = manager.alloc(16).unwrap();
                assert_eq!(manager.block_size(block.as_ptr()), 64);
                blocks.push(block);
            }
            assert!(matches!(
                manager.alloc(16),
                Err(AllocError::Exhausted { requested: 16, .. })
            ));
            assert_conserved(manager);

            let stats = manager.pool_statistics(1).unwrap();
            assert_eq!(stats.allocation_failures, 1);
            assert_eq!(stats.allocated_blocks, 2);

            for block in blocks {
                manager.free(block.as_ptr()).unwrap();
            }
            assert_eq!(manager.free_blocks(), 6);
            assert_conserved(manager);
        });
    }

    #[test]
    fn test_request_larger_than_any_class() {
        with_manager(MemConfig::INSTRUMENTED, |manager| {
            assert!(matches!(
                manager.alloc(65),
                Err(AllocError::Exhausted { requested: 65, .. })
            ));
            assert_eq!(manager.pool_statistics(1).unwrap().allocation_failures, 1);
            assert_eq!(manager.pool_statistics(0).unwrap().allocation_failures, 0);
        });
    }

    #[test]
    fn test_free_rejects_bad_pointers() {
        with_manager(MemConfig::INSTRUMENTED, |manager| {
            assert!(matches!(
                manager.free(core::ptr::null_mut()),
                Err(FreeError::NullPointer { .. })
            ));

            let mut outside = 0_u8;
            assert!(matches!(
                manager.free(&raw mut outside),
                Err(FreeError::UnknownPointer { .. })
            ));

            let block = manager.alloc(16).unwrap();
            let interior = block.as_ptr().wrapping_add(4);
            assert!(matches!(
                manager.free(interior),
                Err(FreeError::UnknownPointer { .. })
            ));

            assert_eq!(manager.pool_statistics(0).unwrap().free_failures, 1);

            manager.free(block.as_ptr()).unwrap();
            assert!(matches!(
                manager.free(block.as_ptr()),
                Err(FreeError::DoubleFree { pool: 0, .. })
            ));
            let stats = manager.pool_statistics(0).unwrap();
            assert_eq!(stats.free_failures, 2);
            assert_eq!(stats.allocated_blocks, 0);
            assert_conserved(manager);
        });
    }

    #[test]
    fn test_never_allocated_block_is_double_free() {
        with_manager(MemConfig::PRODUCTION, |manager| {
            let first = manager.alloc(64).unwrap();
            let second = first.as_ptr().wrapping_add(64);
            assert!(matches!(
                manager.free(second),
                Err(FreeError::DoubleFree { pool: 1, .. })
            ));
            manager.free(first.as_ptr()).unwrap();
        });
    }

    #[test]
    fn test_block_size_lookup() {
        with_manager(MemConfig::PRODUCTION, |manager| {
            let block = manager.alloc(40).unwrap();
            assert_eq!(manager.block_size(block.as_ptr()), 64);
            assert_eq!(manager.block_size(core::ptr::null()), 0);
            assert_eq!(manager.block_size(block.as_ptr().wrapping_add(1)), 0);
            manager.free(block.as_ptr()).unwrap();
        });
    }

    #[test]
    fn test_check_bounds() {
        with_manager(MemConfig::PRODUCTION, |manager| {
            let block = manager.alloc(16).unwrap().as_ptr();
            assert!(!manager.check_bounds(block, 16));
            assert!(manager.check_bounds(block, 17));
            assert!(!manager.check_bounds(block.wrapping_add(8), 8));
            assert!(manager.check_bounds(block.wrapping_add(8), 9));
            assert!(!manager.check_bounds(core::ptr::null(), 1000));
            manager.free(block).unwrap();
        });
    }

    #[test]
    fn test_check_bounds_with_huge_size() {
        with_manager(MemConfig::PRODUCTION, |manager| {
            let block = manager.alloc(16).unwrap().as_ptr();
            assert!(manager.check_bounds(block, u32::MAX));
            assert!(manager.check_bounds(block.wrapping_add(8), u32::MAX));
            assert!(manager.check_bounds(block.wrapping_add(15), u32::MAX));
            manager.free(block).unwrap();
        });
    }

    #[test]
    fn test_interior_free_counts_as_failure() {
        with_manager(MemConfig::INSTRUMENTED, |manager| {
            let block = manager.alloc(64).unwrap();
            assert!(matches!(
                manager.free(block.as_ptr().wrapping_add(1)),
                Err(FreeError::UnknownPointer { .. })
            ));
            let stats = manager.pool_statistics(1).unwrap();
            assert_eq!(stats.free_failures, 1);
            assert_eq!(stats.allocated_blocks, 1);
            assert_eq!(manager.pool_statistics(0).unwrap().free_failures, 0);

            let mut outside = 0_u8;
            let _ = manager.free(&raw mut outside);
            assert_eq!(manager.pool_statistics(1).unwrap().free_failures, 1);
            manager.free(block.as_ptr()).unwrap();
        });
    }

    #[test]
    fn test_fragment_waste() {
        with_manager(MemConfig::INSTRUMENTED, |manager| {
            let a = manager.alloc(10).unwrap();
            let b = manager.alloc(40).unwrap();
            let c = manager.alloc(1).unwrap();
            assert_eq!(manager.pool_statistics(0).unwrap().fragment_waste, 6 + 15);
            assert_eq!(manager.pool_statistics(1).unwrap().fragment_waste, 24);

            manager.free(a.as_ptr()).unwrap();
            let stats = manager.pool_statistics(0).unwrap();
            assert_eq!(stats.fragment_waste, 15);
            assert_eq!(stats.fragment_waste_peak, 21);

            manager.free(b.as_ptr()).unwrap();
            manager.free(c.as_ptr()).unwrap();
            assert_eq!(manager.pool_statistics(1).unwrap().fragment_waste, 0);
        });
    }

    #[test]
    fn test_tracking_entry() {
        with_manager(MemConfig::INSTRUMENTED, |manager| {
            let block = manager.alloc(12).unwrap();
            let line = line!() - 1;
            let entry = manager.tracking_entry(block.as_ptr()).unwrap();
            assert!(entry.status.is_allocated());
            assert_eq!(entry.block_addr, block.addr().get());
            assert_eq!(entry.block_size, 16);
            assert_eq!(entry.fragment_waste, 4);
            assert_eq!(entry.alloc_count, 1);
            assert_eq!(entry.alloc_caller.map(Location::line), Some(line));

            manager.free(block.as_ptr()).unwrap();
            let entry = manager.tracking_entry(block.as_ptr()).unwrap();
            assert!(entry.status.is_free());
            assert_eq!(entry.free_count, 1);
            assert_eq!(entry.free_caller.map(Location::file), Some(file!()));
        });
    }

    #[test]
    fn test_production_has_no_instrumentation() {
        with_manager(MemConfig::PRODUCTION, |manager| {
            let block = manager.alloc(16).unwrap();
            assert_eq!(manager.pool_statistics(0), None);
            assert!(manager.all_statistics().is_empty());
            assert_eq!(manager.tracking_entry(block.as_ptr()), None);
            assert_eq!(manager.free_blocks(), 5);
            manager.free(block.as_ptr()).unwrap();
        });
    }

    #[test]
    fn test_all_statistics() {
        with_manager(MemConfig::INSTRUMENTED, |manager| {
            let block = manager.alloc(64).unwrap();
            let stats = manager.all_statistics();
            assert_eq!(stats.len(), 2);
            assert_eq!(stats[0].allocated_blocks, 0);
            assert_eq!(stats[1].allocated_blocks, 1);
            assert_eq!(stats[1].allocated_blocks_peak, 1);
            manager.free(block.as_ptr()).unwrap();
        });
    }

    #[test]
    fn test_fatal_hook_receives_faults() {
        static FAULTS: AtomicUsize = AtomicUsize::new(0);
        fn hook(fault: &Fault) {
            assert!(fault.is_double_free() || fault.is_bounds_violation());
            FAULTS.fetch_add(1, Ordering::Relaxed);
        }

        let config = MemConfig::new(Instrumentation::all()).with_fatal_hook(hook);
        with_manager(config, |manager| {
            let block = manager.alloc(16).unwrap();
            manager.free(block.as_ptr()).unwrap();
            assert!(matches!(
                manager.free(block.as_ptr()),
                Err(FreeError::DoubleFree { .. })
            ));
            assert!(manager.check_bounds(block.as_ptr(), 100));
        });
        assert_eq!(FAULTS.load(Ordering::Relaxed), 2);
    }

    #[test]
    #[should_panic(expected = "critical memory fault")]
    fn test_diagnostic_mode_halts_without_hook() {
        with_manager(MemConfig::DIAGNOSTIC, |manager| {
            let _ = manager.free(manager.heap.at(8).as_ptr());
        });
    }

    #[test]
    fn test_pool_info() {
        with_manager(MemConfig::PRODUCTION, |manager| {
            assert_eq!(manager.pool_count(), 2);
            let info = manager.pool_info(1).unwrap();
            assert_eq!(info.block_size, 64);
            assert_eq!(info.offset, 64);
            assert_eq!(info.next_class_size, 0);
            assert_eq!(manager.pool_info(2), None);
            assert_eq!(manager.pools().count(), 2);
        });
    }
}
