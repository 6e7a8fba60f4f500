//! Deterministic fixed-size-class block pools for embedded targets.
//!
//! A [`MemManager`] owns a statically sized heap carved into pools of
//! fixed-size blocks, one pool per entry of a build-time [`PoolTable`].
//! Allocation picks the smallest class that fits and escalates to larger
//! classes when that one is exhausted; free returns the block to the pool it
//! was carved from. Both run in bounded time, never block, and never touch a
//! general-purpose heap.
//!
//! # Usage
//!
//! ```rust
//! use block_pool::{MemConfig, MemManager, PoolClassConfig, PoolTable};
//!
//! const TABLE: PoolTable = PoolTable::new(&[
//!     PoolClassConfig::new(32, 8),
//!     PoolClassConfig::new(128, 4),
//!     PoolClassConfig::new(512, 2),
//! ]);
//!
//! static MEM: MemManager<
//!     { TABLE.pool_count() },
//!     { TABLE.block_count() },
//!     { TABLE.heap_size() },
//! > = MemManager::new(TABLE, MemConfig::INSTRUMENTED);
//!
//! MEM.init();
//!
//! let message = MEM.alloc(100).unwrap();
//! assert_eq!(MEM.block_size(message.as_ptr()), 128);
//! assert_eq!(MEM.available_blocks(128), 5);
//!
//! MEM.free(message.as_ptr()).unwrap();
//! assert_eq!(MEM.pool_statistics(1).unwrap().allocated_blocks_peak, 1);
//! ```
//!
//! # Design Considerations
//!
//! ## Memory Layout
//!
//! Block payloads live in a heap owned by the manager; per-block metadata
//! (free-list links, owning pool, tracking entries) lives in separate arrays.
//! Every block starts on an 8-byte boundary. See [`layout`].
//!
//! ## Concurrency
//!
//! Alloc and free hold an interrupt-safe spin lock built on the
//! [`critical-section`](critical_section) crate, so they may be called from
//! interrupt handlers. The binary must provide a critical-section
//! implementation. Free-count queries read atomics and take no lock.
//!
//! ## Instrumentation
//!
//! [`Instrumentation`] selects per-pool [statistics](PoolStatistics),
//! per-block [tracking](TrackingEntry), and diagnostic mode, in which faults
//! such as double frees are handed to a fatal hook (by default
//! [`error::report`], which panics).
//!
//! ## Logging
//!
//! With the `log` feature enabled, the manager logs through the [`log`]
//! facade under the `block_pool` target.
//!
//! [`log`]: https://docs.rs/log

#![no_std]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

#[macro_use]
mod log;

pub mod config;
pub mod error;
mod free_list;
pub mod layout;
pub mod manager;
pub mod stats;
pub mod sync;
pub mod tracking;

pub use self::{
    config::{Instrumentation, MemConfig, PoolClassConfig, PoolTable},
    error::{AllocError, Fault, FreeError, SelfTestError},
    layout::PoolInfo,
    manager::MemManager,
    stats::PoolStatistics,
    tracking::{TrackingEntry, TrackingStatus},
};
