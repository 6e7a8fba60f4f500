//! Error types and the fatal-fault policy.
//!
//! User-facing operations return one of the [`snafu`] error enums below. Each
//! variant records the [`Location`] of the call that failed, so a report
//! printed in the field points at the caller rather than at the allocator.
//!
//! Corruption and exhaustion are additionally described by a [`Fault`], which
//! is what the fatal hook receives when diagnostic mode is enabled.

use core::fmt;

use derive_more::{Display, IsVariant};
use snafu::{GenerateImplicitData, Snafu};

use crate::config::MemConfig;

/// Source location of the call that produced an error.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location(&'static core::panic::Location<'static>);

impl Location {
    #[must_use]
    pub fn get(&self) -> &'static core::panic::Location<'static> {
        self.0
    }
}

impl Default for Location {
    #[track_caller]
    fn default() -> Self {
        Self(core::panic::Location::caller())
    }
}

impl GenerateImplicitData for Location {
    #[track_caller]
    fn generate() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AllocError {
    #[snafu(display("zero-sized block requested"))]
    ZeroSize {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("no free block of at least {requested} bytes"))]
    Exhausted {
        requested: u32,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("memory manager used before initialization"))]
    Uninitialized {
        #[snafu(implicit)]
        location: Location,
    },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FreeError {
    #[snafu(display("free of null pointer"))]
    NullPointer {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("pointer {addr:#x} does not belong to any pool"))]
    UnknownPointer {
        addr: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("block {addr:#x} of pool {pool} is already free"))]
    DoubleFree {
        addr: usize,
        pool: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SelfTestError {
    #[snafu(display("heap is in use: {free} of {total} blocks free"))]
    HeapInUse {
        free: u32,
        total: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to allocate a test block: {source}"))]
    Alloc {
        source: AllocError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("test block {addr:#x} lies outside the heap"))]
    OutOfHeap {
        addr: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("byte at {addr:#x} reads {found:#04x}, expected {expected:#04x}"))]
    Verify {
        addr: usize,
        expected: u8,
        found: u8,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to free a test block: {source}"))]
    Free {
        source: FreeError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("{before} blocks were free before the test, {after} after"))]
    Leak {
        before: u32,
        after: u32,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Condition handed to the fatal hook in diagnostic mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IsVariant)]
pub enum Fault {
    #[display("no free block of at least {requested} bytes")]
    Exhausted { requested: u32 },
    #[display("free of unknown pointer {addr:#x}")]
    UnknownPointer { addr: usize },
    #[display("double free of block {addr:#x} in pool {pool}")]
    DoubleFree { addr: usize, pool: usize },
    #[display("{size} bytes at {addr:#x} overrun the containing block")]
    BoundsViolation { addr: usize, size: u32 },
    #[display("tracking ledger out of sync for block {addr:#x}")]
    TrackingMismatch { addr: usize },
}

impl Fault {
    #[track_caller]
    pub(crate) fn into_free_error(self) -> FreeError {
        match self {
            Self::DoubleFree { addr, pool } => DoubleFreeSnafu { addr, pool }.build(),
            Self::UnknownPointer { addr }
            | Self::BoundsViolation { addr, .. }
            | Self::TrackingMismatch { addr } => UnknownPointerSnafu { addr }.build(),
            Self::Exhausted { .. } => unreachable!("exhaustion is not a free error"),
        }
    }
}

/// Default fatal policy: halt with a description of the fault.
#[track_caller]
pub fn report(fault: &Fault) -> ! {
    panic!("critical memory fault: {fault}");
}

/// Hands `fault` to the configured hook when diagnostic mode is on.
pub(crate) fn raise(config: &MemConfig, fault: &Fault) {
    if !config.is_diagnostic() {
        return;
    }
    match config.fatal_hook {
        Some(hook) => hook(fault),
        None => report(fault),
    }
}
