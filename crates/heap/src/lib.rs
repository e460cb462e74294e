//! Chunk-ring heap allocator for embedded and freestanding targets.
//!
//! This crate manages a caller-supplied, fixed-size byte region with no
//! operating system support: no virtual memory, no `brk`, no `mmap`. All
//! allocation metadata lives inline in the region itself, as a circular
//! doubly-linked list of chunks, so the only memory the allocator ever
//! touches is the memory it was given.
//!
//! # Features
//!
//! - **Two scan policies**: plain first-fit ([`ScanPolicy::EarlyExit`]) or a
//!   single full pass preferring almost-exact fits ([`ScanPolicy::FullScan`]),
//!   chosen per heap at construction
//! - **Immediate coalescing**: freed chunks merge with free neighbors in both
//!   directions, so adjoining free chunks never accumulate
//! - **Injectable locking**: the heap is generic over a [`RawLock`]; use
//!   [`NoopLock`] on single-context builds or `spin::Mutex<()>` across
//!   threads
//! - **Pool attachment**: additional non-contiguous regions can be linked
//!   into the same ring at runtime
//! - **Usage reporting**: per-state chunk counts, byte totals and largest
//!   chunk, for free
//!
//! # Usage
//!
//! ```rust
//! use heap::{Heap, NoopLock, ScanPolicy};
//!
//! let mut pool = vec![0_u8; 4096];
//! let heap = unsafe {
//!     Heap::<NoopLock>::with_policy(pool.as_mut_ptr(), pool.len(), ScanPolicy::EarlyExit)
//! };
//!
//! let ptr = heap.allocate(64).expect("fresh pool");
//! // Use the memory...
//! unsafe {
//!     heap.deallocate(ptr);
//! }
//!
//! let summary = heap.usage_summary();
//! assert_eq!(summary.used.chunks, 0);
//! ```
//!
//! # Design Considerations
//!
//! Allocation failure is a normal outcome reported as `None`, never a panic.
//! Deallocation silently ignores null and implausible pointers (best-effort
//! checks only); handing back a stale pointer whose chunk has been reissued
//! is undefined behavior, as in any boundary-tag allocator.
//!
//! Requests are rounded up to [`ALIGN`] including header overhead, and a
//! free chunk within one header plus one alignment unit of the request is
//! taken whole rather than split, so the allocator never manufactures a free
//! chunk too small to ever satisfy a request.
//!
//! # Performance Characteristics
//!
//! | Operation | Cost |
//! |-----------|------|
//! | `allocate` (early-exit) | O(free chunks visited) |
//! | `allocate` (full scan) | O(chunks in ring) |
//! | `deallocate` | O(1), at most two merges |
//! | `usage_summary` | O(chunks in ring) |
//!
//! There are no timeouts and no cancellation: a caller blocked on the heap's
//! lock stays blocked until the holder releases it, whatever the injected
//! lock's waiting strategy is.

#![no_std]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod chunk;
pub mod lock;
mod ring;

pub use self::{
    chunk::{ALIGN, HEADER_SIZE, MAX_CHUNK_PAYLOAD},
    lock::{NoopLock, RawLock},
    ring::{Heap, ScanPolicy, UsageInfo, UsageSummary},
};
