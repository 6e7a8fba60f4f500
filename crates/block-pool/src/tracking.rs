//! Per-block provenance ledger.
//!
//! One [`TrackingEntry`] per physical block, indexed like the slot arena. It
//! records who allocated and freed each block, how often, and how many bytes
//! of the block the last request left unused.

use core::panic::Location;

use derive_more::IsVariant;

use crate::error::Fault;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
pub enum TrackingStatus {
    Allocated,
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingEntry {
    /// Address of the block payload.
    pub block_addr: usize,
    pub block_size: u32,
    /// Unused bytes of the current allocation; 0 while free.
    pub fragment_waste: u32,
    pub alloc_caller: Option<&'static Location<'static>>,
    pub alloc_count: u32,
    pub free_caller: Option<&'static Location<'static>>,
    pub free_count: u32,
    pub status: TrackingStatus,
}

impl TrackingEntry {
    const UNUSED: Self = Self::new(0, 0);

    const fn new(block_addr: usize, block_size: u32) -> Self {
        Self {
            block_addr,
            block_size,
            fragment_waste: 0,
            alloc_caller: None,
            alloc_count: 0,
            free_caller: None,
            free_count: 0,
            status: TrackingStatus::Free,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Ledger<const B: usize> {
    entries: [TrackingEntry; B],
}

impl<const B: usize> Ledger<B> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: [TrackingEntry::UNUSED; B],
        }
    }

    pub(crate) fn reset(&mut self, slot: usize, block_addr: usize, block_size: u32) {
        self.entries[slot] = TrackingEntry::new(block_addr, block_size);
    }

    pub(crate) fn get(&self, slot: usize) -> Option<&TrackingEntry> {
        self.entries.get(slot)
    }

    /// Records an allocation of `requested` bytes; returns the waste.
    pub(crate) fn mark_alloc(
        &mut self,
        slot: usize,
        requested: u32,
        caller: &'static Location<'static>,
    ) -> Result<u32, Fault> {
        let entry = self.entry_in(slot, TrackingStatus::Free)?;
        entry.status = TrackingStatus::Allocated;
        entry.fragment_waste = entry.block_size.saturating_sub(requested);
        entry.alloc_count = entry.alloc_count.wrapping_add(1);
        entry.alloc_caller = Some(caller);
        Ok(entry.fragment_waste)
    }

    /// Records a free; returns the waste the allocation had accounted.
    pub(crate) fn mark_free(
        &mut self,
        slot: usize,
        caller: &'static Location<'static>,
    ) -> Result<u32, Fault> {
        let entry = self.entry_in(slot, TrackingStatus::Allocated)?;
        let waste = entry.fragment_waste;
        entry.status = TrackingStatus::Free;
        entry.fragment_waste = 0;
        entry.free_count = entry.free_count.wrapping_add(1);
        entry.free_caller = Some(caller);
        Ok(waste)
    }

    fn entry_in(
        &mut self,
        slot: usize,
        status: TrackingStatus,
    ) -> Result<&mut TrackingEntry, Fault> {
        match self.entries.get_mut(slot) {
            Some(entry) if entry.status == status => Ok(entry),
            Some(entry) => Err(Fault::TrackingMismatch {
                addr: entry.block_addr,
            }),
            None => Err(Fault::TrackingMismatch { addr: 0 }),
        }
    }
}
