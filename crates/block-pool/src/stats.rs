//! Per-pool usage statistics.

/// Usage counters of one pool class.
///
/// Counters only move while [`Instrumentation::STATISTICS`] is enabled;
/// fragmentation waste additionally needs
/// [`Instrumentation::TRACKING`].
///
/// [`Instrumentation::STATISTICS`]: crate::config::Instrumentation::STATISTICS
/// [`Instrumentation::TRACKING`]: crate::config::Instrumentation::TRACKING
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatistics {
    pub num_blocks: u32,
    pub allocated_blocks: u32,
    pub allocated_blocks_peak: u32,
    pub allocation_failures: u32,
    pub free_failures: u32,
    /// Sum of `block_size - requested` over the pool's live blocks.
    pub fragment_waste: u32,
    pub fragment_waste_peak: u32,
}

impl PoolStatistics {
    pub(crate) const ZERO: Self = Self::new(0);

    pub(crate) const fn new(num_blocks: u32) -> Self {
        Self {
            num_blocks,
            allocated_blocks: 0,
            allocated_blocks_peak: 0,
            allocation_failures: 0,
            free_failures: 0,
            fragment_waste: 0,
            fragment_waste_peak: 0,
        }
    }

    #[must_use]
    pub fn free_blocks(&self) -> u32 {
        self.num_blocks - self.allocated_blocks
    }

    pub(crate) fn record_alloc(&mut self) {
        self.allocated_blocks += 1;
        self.allocated_blocks_peak = self.allocated_blocks_peak.max(self.allocated_blocks);
        debug_assert!(
            self.allocated_blocks <= self.num_blocks,
            "more blocks allocated than the pool holds"
        );
    }

    pub(crate) fn record_free(&mut self) {
        debug_assert!(self.allocated_blocks > 0, "allocated block count underflow");
        self.allocated_blocks = self.allocated_blocks.saturating_sub(1);
    }

    pub(crate) fn record_alloc_failure(&mut self) {
        self.allocation_failures = self.allocation_failures.saturating_add(1);
    }

    pub(crate) fn record_free_failure(&mut self) {
        self.free_failures = self.free_failures.saturating_add(1);
    }

    pub(crate) fn add_waste(&mut self, waste: u32) {
        self.fragment_waste += waste;
        self.fragment_waste_peak = self.fragment_waste_peak.max(self.fragment_waste);
    }

    pub(crate) fn remove_waste(&mut self, waste: u32) {
        debug_assert!(self.fragment_waste >= waste, "fragment waste underflow");
        self.fragment_waste = self.fragment_waste.saturating_sub(waste);
    }

    pub(crate) fn reset_peaks(&mut self) {
        self.allocated_blocks_peak = 0;
    }
}
