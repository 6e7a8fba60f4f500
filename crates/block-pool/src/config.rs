//! Build-time configuration: the pool descriptor table and instrumentation.
//!
//! The table is an ordered list of `(block size, block count)` pairs. It is
//! validated by a `const fn`, so a malformed table used in a `const` or
//! `static` fails to compile instead of failing at boot.
//!
//! ```
//! use block_pool::config::{PoolClassConfig, PoolTable};
//!
//! const TABLE: PoolTable = PoolTable::new(&[
//!     PoolClassConfig::new(16, 4),
//!     PoolClassConfig::new(64, 2),
//!     PoolClassConfig::END,
//! ]);
//!
//! assert_eq!(TABLE.pool_count(), 2);
//! assert_eq!(TABLE.block_count(), 6);
//! assert_eq!(TABLE.heap_size(), 16 * 4 + 64 * 2);
//! ```

use bitflags::bitflags;

use crate::{error::Fault, layout::stride_of};

/// One pool class: `block_count` blocks of `block_size` payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolClassConfig {
    pub block_size: u32,
    pub block_count: u32,
}

impl PoolClassConfig {
    /// Sentinel terminating a table.
    pub const END: Self = Self::new(0, 0);

    #[must_use]
    pub const fn new(block_size: u32, block_count: u32) -> Self {
        Self {
            block_size,
            block_count,
        }
    }

    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.block_size == 0
    }
}

/// Validated, ordered set of pool classes.
///
/// The table ends at the first [`PoolClassConfig::END`] entry or at the end of
/// the slice, whichever comes first.
#[derive(Debug, Clone, Copy)]
pub struct PoolTable {
    classes: &'static [PoolClassConfig],
}

impl PoolTable {
    /// Wraps and validates `classes`.
    ///
    /// # Panics
    ///
    /// Panics (at compile time when used in a constant) if the table is empty,
    /// a class holds no blocks, block sizes are not strictly increasing, or
    /// the table does not fit the index types used by the allocator.
    #[must_use]
    pub const fn new(classes: &'static [PoolClassConfig]) -> Self {
        let table = Self { classes };
        let count = table.pool_count();
        assert!(count > 0, "pool table has no classes");
        assert!(count <= u16::MAX as usize, "pool table has too many classes");

        let mut prev_size = 0;
        let mut i = 0;
        while i < count {
            let class = classes[i];
            assert!(class.block_count > 0, "pool class holds no blocks");
            assert!(
                class.block_size > prev_size,
                "pool block sizes must be strictly increasing"
            );
            prev_size = class.block_size;
            i += 1;
        }
        assert!(
            table.block_count() < u32::MAX as usize,
            "pool table has too many blocks"
        );
        table
    }

    /// Number of pool classes, not counting the sentinel.
    #[must_use]
    pub const fn pool_count(&self) -> usize {
        let mut count = 0;
        while count < self.classes.len() && !self.classes[count].is_end() {
            count += 1;
        }
        count
    }

    /// Total number of blocks across all pools.
    #[must_use]
    pub const fn block_count(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.pool_count() {
            total += self.classes[i].block_count as usize;
            i += 1;
        }
        total
    }

    /// Bytes of heap needed to hold every block.
    #[must_use]
    pub const fn heap_size(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.pool_count() {
            let class = self.classes[i];
            total += stride_of(class.block_size) * class.block_count as usize;
            i += 1;
        }
        total
    }

    #[must_use]
    pub const fn class(&self, index: usize) -> Option<PoolClassConfig> {
        if index < self.pool_count() {
            Some(self.classes[index])
        } else {
            None
        }
    }

    /// Block size of the largest class.
    #[must_use]
    pub const fn max_block_size(&self) -> u32 {
        self.classes[self.pool_count() - 1].block_size
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoolClassConfig> {
        self.classes[..self.pool_count()].iter()
    }
}

bitflags! {
    /// Optional diagnostics enabled on a memory manager.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Instrumentation: u8 {
        /// Maintain per-pool usage counters.
        const STATISTICS = 1 << 0;
        /// Maintain the per-block tracking ledger.
        const TRACKING = 1 << 1;
        /// Hand detected faults to the fatal hook.
        const DEBUG = 1 << 2;
    }
}

/// Called with the detected fault in diagnostic mode.
///
/// The policy is up to the host: halt, log and continue, or reset.
pub type FatalHook = fn(&Fault);

#[derive(Debug, Clone, Copy)]
pub struct MemConfig {
    pub instrumentation: Instrumentation,
    /// Hook used in diagnostic mode; `None` halts through
    /// [`report`](crate::error::report).
    pub fatal_hook: Option<FatalHook>,
}

impl MemConfig {
    /// No instrumentation; faults are only returned as errors.
    pub const PRODUCTION: Self = Self::new(Instrumentation::empty());
    /// Statistics and tracking, without the fatal hook.
    pub const INSTRUMENTED: Self =
        Self::new(Instrumentation::STATISTICS.union(Instrumentation::TRACKING));
    /// Everything enabled; faults halt unless a hook is installed.
    pub const DIAGNOSTIC: Self = Self::new(Instrumentation::all());

    #[must_use]
    pub const fn new(instrumentation: Instrumentation) -> Self {
        Self {
            instrumentation,
            fatal_hook: None,
        }
    }

    #[must_use]
    pub const fn with_fatal_hook(mut self, hook: FatalHook) -> Self {
        self.fatal_hook = Some(hook);
        self
    }

    #[must_use]
    pub const fn has_statistics(&self) -> bool {
        self.instrumentation.contains(Instrumentation::STATISTICS)
    }

    #[must_use]
    pub const fn has_tracking(&self) -> bool {
        self.instrumentation.contains(Instrumentation::TRACKING)
    }

    #[must_use]
    pub const fn is_diagnostic(&self) -> bool {
        self.instrumentation.contains(Instrumentation::DEBUG)
    }
}

impl Default for MemConfig {
    fn default() -> Self {
        Self::PRODUCTION
    }
}
