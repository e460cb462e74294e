//! Chunk-ring heap: allocation, deallocation, pool attachment and usage
//! reporting over a caller-supplied byte region.
//!
//! # Algorithm
//!
//! The pool is managed as a circular doubly-linked list of chunks (see
//! [`crate::chunk`]). Allocation walks the ring from a cached **scan hint**
//! looking for a free chunk, under one of two policies:
//!
//! - [`ScanPolicy::EarlyExit`]: first-fit. The first free chunk large enough
//!   is split and returned immediately; a chunk whose payload is an
//!   *almost-exact* fit (within one header plus one alignment unit of the
//!   request) is taken whole instead of leaving behind a sliver that could
//!   never satisfy a request.
//! - [`ScanPolicy::FullScan`]: walks the whole ring once, taking an
//!   almost-exact chunk the moment one is seen and otherwise splitting the
//!   first sufficiently large chunk it remembered. One extra pass buys less
//!   fragmentation.
//!
//! Deallocation marks the chunk free and immediately merges it with free
//! neighbors in both directions, so two adjoining free chunks never survive a
//! deallocation. The scan hint is biased back toward low addresses as chunks
//! are freed.
//!
//! # Concurrency
//!
//! Every operation, including [`Heap::usage_summary`], runs under the heap's
//! injected [`RawLock`] for its full duration. Distinct heaps over disjoint
//! pools are fully independent. Allocation is O(chunks visited); deallocation
//! is O(1) plus at most two merges.
//!
//! # Usage
//!
//! ```rust
//! use heap::{Heap, NoopLock};
//!
//! let mut pool = vec![0_u8; 4096];
//! let heap = unsafe { Heap::<NoopLock>::new(pool.as_mut_ptr(), pool.len()) };
//!
//! if let Some(ptr) = heap.allocate(64) {
//!     // Use the memory...
//!
//!     unsafe {
//!         heap.deallocate(ptr);
//!     }
//! }
//! ```

use core::{cell::Cell, ptr};

use derive_more::Display;

use crate::{
    chunk::{ALIGN, ChunkState, HEADER_SIZE, Header, MAX_CHUNK_PAYLOAD},
    lock::{LockGuard, RawLock},
};

/// Allocation scan strategy, chosen at construction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanPolicy {
    /// First-fit: split and return the first sufficiently large free chunk.
    EarlyExit,
    /// Inspect the whole ring once, preferring an almost-exact fit over
    /// splitting the first large-enough chunk.
    #[default]
    FullScan,
}

/// Usage counters for one chunk state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[display("{chunks} chunks, {total_bytes} bytes, largest {max_chunk_size}")]
pub struct UsageInfo {
    /// Number of chunks in this state.
    pub chunks: usize,
    /// Largest single chunk payload, in bytes.
    pub max_chunk_size: usize,
    /// Cumulative payload bytes over all chunks in this state.
    pub total_bytes: usize,
}

/// Snapshot of the heap's free and allocated chunks.
///
/// Produced by [`Heap::usage_summary`]. The underlying walk starts at the
/// scan hint, so the order in which chunks were visited is hint-relative;
/// only the aggregate counters are exposed and callers must not assume any
/// particular chunk order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[display("free: [{free}], used: [{used}]")]
pub struct UsageSummary {
    /// Counters over chunks currently free.
    pub free: UsageInfo,
    /// Counters over chunks currently allocated.
    pub used: UsageInfo,
}

/// A heap over one caller-supplied pool (plus any attached pools).
///
/// The heap borrows the pool for its own lifetime and stores all allocation
/// metadata inline in the pool itself. `L` is the injected mutual-exclusion
/// capability; see [`crate::lock`] for the provided implementations.
///
/// The heap is `Send`/`Sync` exactly when `L` is, making the no-op lock's
/// single-context restriction a compile-time fact.
pub struct Heap<L: RawLock> {
    /// Origin of the ring; fixed at construction.
    start: *mut Header,
    /// Where the next allocation scan begins. A performance hint only: it
    /// always designates a live header, but not necessarily a free one.
    hint: Cell<*mut Header>,
    policy: ScanPolicy,
    lock: L,
}

// SAFETY: all pool and hint access is funneled through `lock`, so the heap
// is exactly as thread-safe as its lock.
unsafe impl<L: RawLock + Send> Send for Heap<L> {}
// SAFETY: as above.
unsafe impl<L: RawLock + Sync> Sync for Heap<L> {}

impl<L: RawLock> Heap<L> {
    /// Creates a heap over `pool` with the default [`ScanPolicy::FullScan`]
    /// policy.
    ///
    /// The start of the pool is rounded up to [`ALIGN`]; the usable span
    /// shrinks accordingly.
    ///
    /// # Panics
    ///
    /// Panics if `pool` is null, if the aligned pool cannot hold one header
    /// plus one alignment unit of payload, or if the initial payload would
    /// exceed [`MAX_CHUNK_PAYLOAD`].
    ///
    /// # Safety
    ///
    /// `pool..pool + size` must be valid for reads and writes, not in use by
    /// anything else, and must outlive the heap.
    #[must_use]
    pub unsafe fn new(pool: *mut u8, size: usize) -> Self {
        unsafe { Self::with_policy(pool, size, ScanPolicy::default()) }
    }

    /// Creates a heap over `pool` with an explicit scan policy.
    ///
    /// # Panics
    ///
    /// As for [`Heap::new`].
    ///
    /// # Safety
    ///
    /// As for [`Heap::new`].
    #[must_use]
    pub unsafe fn with_policy(pool: *mut u8, size: usize, policy: ScanPolicy) -> Self {
        let start = unsafe { Header::init(pool, size) };
        Self {
            start,
            hint: Cell::new(start),
            policy,
            lock: L::INIT,
        }
    }

    /// Links a second, non-contiguous region into the ring as one free chunk.
    ///
    /// The new chunk is spliced in directly after the current scan-hint
    /// chunk. No coalescing with existing chunks is attempted, and none will
    /// ever happen across the region boundary: merging requires physical
    /// adjacency.
    ///
    /// # Panics
    ///
    /// As for [`Heap::new`].
    ///
    /// # Safety
    ///
    /// `pool..pool + size` must be valid for reads and writes, not in use by
    /// anything else, must outlive the heap, and must not overlap any region
    /// already managed by it. The region must lie at addresses above the
    /// primary pool, or pointers allocated from it will be rejected by
    /// [`Heap::deallocate`]'s range check.
    pub unsafe fn attach(&self, pool: *mut u8, size: usize) {
        let _guard = LockGuard::new(&self.lock);
        unsafe {
            let chunk = Header::init(pool, size);
            let at = self.hint.get();
            let after = (*at).next;
            (*chunk).next = after;
            (*chunk).prev = at;
            (*at).next = chunk;
            if !ptr::eq(after, self.start) {
                (*after).prev = chunk;
            }
        }
    }

    /// Allocates `size` bytes, returning a payload pointer aligned to
    /// [`ALIGN`], or `None` if no free chunk can satisfy the request.
    ///
    /// Exhaustion is a normal outcome, not an error. A request for zero
    /// bytes succeeds with a valid, freeable pointer to an empty payload.
    #[must_use]
    pub fn allocate(&self, size: usize) -> Option<*mut u8> {
        let required = size
            .checked_add(HEADER_SIZE)?
            .checked_next_multiple_of(ALIGN)?;
        if required > MAX_CHUNK_PAYLOAD {
            return None;
        }

        let _guard = LockGuard::new(&self.lock);
        let origin = self.start;

        // SAFETY: the ring invariants hold between operations and the lock
        // serializes mutation, so every pointer followed here is a live
        // header of this heap's ring.
        unsafe {
            // Full scan remembers the first merely-large-enough chunk in
            // case no almost-exact fit turns up before the ring closes.
            let mut remembered: Option<*mut Header> = None;
            let mut free_seen: usize = 0;
            let mut cur = self.hint.get();

            let satisfied = loop {
                if (*cur).state.is_free() {
                    if self.policy == ScanPolicy::EarlyExit {
                        free_seen += 1;
                    }
                    let payload = (*cur).size;
                    if payload >= required && payload <= required + HEADER_SIZE + ALIGN {
                        // Almost-exact fit: splitting would leave a sliver
                        // below the minimum chunk size, so take it whole.
                        (*cur).state = ChunkState::Allocated;
                        if self.policy == ScanPolicy::FullScan {
                            free_seen += 1;
                        }
                        break Some(cur);
                    }
                    match self.policy {
                        ScanPolicy::EarlyExit => {
                            if payload >= required {
                                Header::split(cur, required, origin);
                                break Some(cur);
                            }
                        }
                        ScanPolicy::FullScan => {
                            if remembered.is_none() {
                                if payload >= required {
                                    remembered = Some(cur);
                                }
                                free_seen += 1;
                            }
                        }
                    }
                }

                cur = (*cur).next;
                if ptr::eq(cur, origin) {
                    // Ring closed. Fall back to the remembered chunk, if any.
                    let Some(candidate) = remembered else {
                        break None;
                    };
                    cur = candidate;
                    Header::split(cur, required, origin);
                    break Some(cur);
                }
            };

            let chunk = satisfied?;
            if free_seen == 1 {
                // The hint chunk itself was consumed; its successor is the
                // cheapest place for the next scan to begin.
                self.hint.set((*chunk).next);
            }
            Some(Header::payload(chunk))
        }
    }

    /// Returns a payload pointer to the heap.
    ///
    /// Null pointers are ignored, as are pointers that fail a best-effort
    /// plausibility check (misaligned, below the primary pool, or carrying a
    /// broken back-link). These checks catch gross misuse only; freeing a
    /// stale pointer whose memory has since been handed out again is
    /// undetectable and remains undefined behavior.
    ///
    /// The freed chunk is merged with any adjoining free neighbor on either
    /// side, and the scan hint is moved down to the merged chunk if it is
    /// the lowest-addressed free chunk seen so far.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a value previously returned by
    /// [`Heap::allocate`] on this heap and not freed since.
    pub unsafe fn deallocate(&self, ptr: *mut u8) {
        if ptr.is_null() || ptr.addr() % ALIGN != 0 {
            return;
        }

        let _guard = LockGuard::new(&self.lock);
        let origin = self.start;
        unsafe {
            // A payload below the first chunk's would put the recovered
            // header in unowned memory; reject before touching it.
            if ptr.addr() < origin.addr() + HEADER_SIZE {
                return;
            }
            let chunk = Header::from_payload(ptr);
            let prev = (*chunk).prev;
            if !ptr::eq(prev, chunk) && !ptr::eq((*prev).next, chunk) {
                return;
            }

            (*chunk).state = ChunkState::Free;

            let next = (*chunk).next;
            if (*next).state.is_free() && !ptr::eq(next, origin) && Header::adjoins(chunk, next) {
                Header::merge_with_next(chunk, origin);
            }

            let prev = (*chunk).prev;
            let mut freed = chunk;
            if (*prev).state.is_free() && !ptr::eq(chunk, origin) && Header::adjoins(prev, chunk) {
                Header::merge_with_next(prev, origin);
                freed = prev;
            }

            if freed.addr() < self.hint.get().addr() {
                self.hint.set(freed);
            }
        }
    }

    /// Counts chunks, payload bytes and largest payload per state.
    ///
    /// Read-only, but still serialized against mutating calls through the
    /// heap's lock. Never fails. The walk covers every chunk in the ring
    /// exactly once, starting from the scan hint.
    #[must_use]
    pub fn usage_summary(&self) -> UsageSummary {
        let _guard = LockGuard::new(&self.lock);
        let mut summary = UsageSummary::default();

        // SAFETY: as in `allocate`; the walk follows `next` around the ring
        // once, under the lock.
        unsafe {
            let walk_start = self.hint.get();
            let mut cur = walk_start;
            loop {
                let info = match (*cur).state {
                    ChunkState::Free => &mut summary.free,
                    ChunkState::Allocated => &mut summary.used,
                };
                info.chunks += 1;
                info.total_bytes += (*cur).size;
                if info.max_chunk_size < (*cur).size {
                    info.max_chunk_size = (*cur).size;
                }
                cur = (*cur).next;
                if ptr::eq(cur, walk_start) {
                    break;
                }
            }
        }
        summary
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    extern crate alloc;
    extern crate std;

    use alloc::vec::Vec;
    use core::alloc::Layout;

    use super::*;
    use crate::lock::NoopLock;

    const POLICIES: [ScanPolicy; 2] = [ScanPolicy::EarlyExit, ScanPolicy::FullScan];

    fn with_pool<F>(size: usize, test_fn: F)
    where
        F: FnOnce(*mut u8, usize),
    {
        unsafe {
            let layout = Layout::from_size_align(size, ALIGN).unwrap();
            let pool = alloc::alloc::alloc(layout);
            pool.write_bytes(0x11, size);
            test_fn(pool, size);
            alloc::alloc::dealloc(pool, layout);
        }
    }

    fn with_heap<F>(size: usize, policy: ScanPolicy, test_fn: F)
    where
        F: FnOnce(&Heap<NoopLock>),
    {
        with_pool(size, |pool, size| {
            let heap = unsafe { Heap::<NoopLock>::with_policy(pool, size, policy) };
            test_fn(&heap);
        });
    }

    /// Bytes accounted for by the summary, headers included. Must equal the
    /// managed pool size at all times: the ring never loses or gains bytes.
    fn total_managed(summary: &UsageSummary) -> usize {
        let chunks = summary.free.chunks + summary.used.chunks;
        summary.free.total_bytes + summary.used.total_bytes + chunks * HEADER_SIZE
    }

    #[test]
    fn basic_allocation() {
        for policy in POLICIES {
            with_heap(1024, policy, |heap| unsafe {
                let ptr = heap.allocate(64).unwrap();
                ptr.write_bytes(0x33, 64);

                let summary = heap.usage_summary();
                assert_eq!(summary.used.chunks, 1);
                assert!(summary.used.max_chunk_size >= 64);
                assert_eq!(total_managed(&summary), 1024);

                heap.deallocate(ptr);
                let summary = heap.usage_summary();
                assert_eq!(summary.used.chunks, 0);
                assert_eq!(summary.free.chunks, 1);
                assert_eq!(total_managed(&summary), 1024);
            });
        }
    }

    #[test]
    fn pointers_are_aligned_and_disjoint() {
        with_heap(2048, ScanPolicy::FullScan, |heap| unsafe {
            let sizes = [1_usize, 24, 64, 100, 128];
            let mut ptrs = Vec::new();
            for (i, &size) in sizes.iter().enumerate() {
                let ptr = heap.allocate(size).unwrap();
                assert_eq!(ptr.addr() % ALIGN, 0);
                ptr.write_bytes(0x80 + u8::try_from(i).unwrap(), size);
                ptrs.push(ptr);
            }
            // Every allocation still carries its own pattern: no overlap.
            for (i, (&ptr, &size)) in ptrs.iter().zip(&sizes).enumerate() {
                let expected = 0x80 + u8::try_from(i).unwrap();
                for offset in 0..size {
                    assert_eq!(ptr.add(offset).read(), expected);
                }
                heap.deallocate(ptr);
            }
            assert_eq!(total_managed(&heap.usage_summary()), 2048);
        });
    }

    #[test]
    fn zero_size_allocation_is_valid_and_freeable() {
        for policy in POLICIES {
            with_heap(256, policy, |heap| unsafe {
                let before = heap.usage_summary();
                let ptr = heap.allocate(0).unwrap();
                assert!(!ptr.is_null());
                assert_eq!(ptr.addr() % ALIGN, 0);
                assert_eq!(heap.usage_summary().used.chunks, 1);

                heap.deallocate(ptr);
                assert_eq!(heap.usage_summary(), before);
            });
        }
    }

    #[test]
    fn allocation_larger_than_pool_fails() {
        for policy in POLICIES {
            with_heap(128, policy, |heap| {
                assert!(heap.allocate(256).is_none());
                assert!(heap.allocate(usize::MAX).is_none());
            });
        }
    }

    #[test]
    fn allocate_entire_heap() {
        with_heap(2048, ScanPolicy::FullScan, |heap| unsafe {
            // The whole pool is one chunk; the largest satisfiable request
            // leaves room for exactly one header.
            let ptr = heap.allocate(2048 - 2 * HEADER_SIZE).unwrap();
            let summary = heap.usage_summary();
            assert_eq!(summary.free.chunks, 0);
            assert_eq!(summary.used.max_chunk_size, 2048 - HEADER_SIZE);

            assert!(heap.allocate(0).is_none());

            heap.deallocate(ptr);
            let ptr = heap.allocate(2048 - 2 * HEADER_SIZE).unwrap();
            assert!(!ptr.is_null());
        });
    }

    #[test]
    fn first_fit_reuses_freed_chunk() {
        for policy in POLICIES {
            with_heap(512, policy, |heap| unsafe {
                let first = heap.allocate(32).unwrap();
                heap.deallocate(first);
                let second = heap.allocate(32).unwrap();
                assert_eq!(first, second);
                heap.deallocate(second);
            });
        }
    }

    #[test]
    fn ring_conserves_bytes_across_mixed_traffic() {
        for policy in POLICIES {
            with_heap(4096, policy, |heap| unsafe {
                let sizes = [24_usize, 128, 8, 256, 64, 16, 96, 32];
                let mut live = Vec::new();
                for &size in &sizes {
                    live.push(heap.allocate(size).unwrap());
                    assert_eq!(total_managed(&heap.usage_summary()), 4096);
                }

                // Free every other chunk, then everything else; coalescing
                // must leave a single free chunk spanning the pool.
                for &ptr in live.iter().step_by(2) {
                    heap.deallocate(ptr);
                    assert_eq!(total_managed(&heap.usage_summary()), 4096);
                }
                for &ptr in live.iter().skip(1).step_by(2) {
                    heap.deallocate(ptr);
                    assert_eq!(total_managed(&heap.usage_summary()), 4096);
                }

                let summary = heap.usage_summary();
                assert_eq!(summary.used.chunks, 0);
                assert_eq!(summary.free.chunks, 1);
                assert_eq!(summary.free.total_bytes, 4096 - HEADER_SIZE);
            });
        }
    }

    #[test]
    fn free_merges_both_directions() {
        for policy in POLICIES {
            with_heap(1024, policy, |heap| unsafe {
                let a = heap.allocate(32).unwrap();
                let b = heap.allocate(32).unwrap();
                let c = heap.allocate(32).unwrap();

                heap.deallocate(b);
                // B alone: its neighbors are still allocated.
                let summary = heap.usage_summary();
                assert_eq!(summary.free.chunks, 2); // B and the tail

                heap.deallocate(a);
                // A absorbs B: payload(A) + header + payload(B).
                let summary = heap.usage_summary();
                assert_eq!(summary.free.chunks, 2); // A+B and the tail
                assert!(summary.free.total_bytes >= 32 + HEADER_SIZE + 32);

                heap.deallocate(c);
                let summary = heap.usage_summary();
                assert_eq!(summary.free.chunks, 1);
                assert_eq!(summary.free.total_bytes, 1024 - HEADER_SIZE);
            });
        }
    }

    #[test]
    fn scenario_small_pool_partial_free() {
        // 256-byte pool: allocate 32 and 64, then free the first. The
        // summary must show the first chunk free again and the second still
        // allocated, with the trailing remainder also free.
        with_heap(256, ScanPolicy::FullScan, |heap| unsafe {
            let first = heap.allocate(32).unwrap();
            let _second = heap.allocate(64).unwrap();
            heap.deallocate(first);

            let summary = heap.usage_summary();
            assert_eq!(summary.used.chunks, 1);
            assert!(summary.used.max_chunk_size >= 64);
            assert_eq!(summary.free.chunks, 2);
            assert!(summary.free.max_chunk_size >= 32);
            assert_eq!(total_managed(&summary), 256);
        });
    }

    #[test]
    fn exhaustion_fails_exactly_at_capacity() {
        for policy in POLICIES {
            with_heap(512, policy, |heap| {
                let required = (64 + HEADER_SIZE).next_multiple_of(ALIGN);
                let mut count = 0;
                loop {
                    let free = heap.usage_summary().free;
                    if heap.allocate(64).is_none() {
                        // Failure must coincide with no free chunk able to
                        // hold header + payload for this size class.
                        assert!(free.max_chunk_size < required);
                        break;
                    }
                    assert!(free.max_chunk_size >= required);
                    count += 1;
                }
                // 480 payload bytes: four split allocations of span 96 plus
                // one almost-exact take of the 96-byte remainder.
                assert_eq!(count, 5);
                let summary = heap.usage_summary();
                assert_eq!(summary.free, UsageInfo::default());
                assert_eq!(total_managed(&summary), 512);
            });
        }
    }

    #[test]
    fn policies_pick_different_chunks() {
        // Ring shaped as: F1(128) A F2(64) A tail. A request whose required
        // span is 64 sees F1 first (too big for an almost-exact take) and
        // F2 second (almost-exact). Early-exit splits F1; full scan keeps
        // walking and takes F2 whole.
        for policy in POLICIES {
            with_heap(1024, policy, |heap| unsafe {
                let x1 = heap.allocate(128).unwrap();
                let _x2 = heap.allocate(16).unwrap();
                let x3 = heap.allocate(64).unwrap();
                let _x4 = heap.allocate(16).unwrap();
                heap.deallocate(x1);
                heap.deallocate(x3);

                let ptr = heap.allocate(32).unwrap();
                match policy {
                    ScanPolicy::EarlyExit => assert_eq!(ptr, x1),
                    ScanPolicy::FullScan => assert_eq!(ptr, x3),
                }
            });
        }
    }

    #[test]
    fn invalid_frees_are_ignored() {
        with_pool(512, |pool, size| unsafe {
            let heap = Heap::<NoopLock>::new(pool, size);
            let ptr = heap.allocate(256).unwrap();
            let before = heap.usage_summary();

            // Null and misaligned pointers.
            heap.deallocate(core::ptr::null_mut());
            heap.deallocate(ptr.add(8));

            // A pointer below the first payload of the pool.
            heap.deallocate(pool.add(ALIGN));

            // An aligned pointer into the middle of a live payload, dressed
            // up with header bytes we control: the back-link crosscheck
            // rejects it because its claimed predecessor does not point
            // back.
            #[expect(clippy::cast_ptr_alignment)]
            let decoy = ptr.add(4 * ALIGN).cast::<Header>();
            decoy.write(Header {
                next: core::ptr::null_mut(),
                prev: core::ptr::null_mut(),
                state: ChunkState::Allocated,
                size: 0,
            });
            #[expect(clippy::cast_ptr_alignment)]
            let fake = ptr.cast::<Header>();
            fake.write(Header {
                next: core::ptr::null_mut(),
                prev: decoy,
                state: ChunkState::Allocated,
                size: 0,
            });
            heap.deallocate(ptr.add(HEADER_SIZE));

            assert_eq!(heap.usage_summary(), before);

            // The genuine pointer is still accepted.
            heap.deallocate(ptr);
            let summary = heap.usage_summary();
            assert_eq!(summary.used.chunks, 0);
            assert_eq!(total_managed(&summary), size);
        });
    }

    #[test]
    fn attach_extends_the_ring() {
        // Carve both regions out of one parent allocation so the attached
        // region is guaranteed to sit above the primary pool.
        with_pool(4096, |parent, _| unsafe {
            let primary_size = 5 * HEADER_SIZE;
            let attached = parent.add(2048);
            let attached_size = 8 * HEADER_SIZE;

            let heap = Heap::<NoopLock>::with_policy(parent, primary_size, ScanPolicy::EarlyExit);

            // Consume the primary pool whole (almost-exact fit), leaving
            // zero free chunks.
            let a1 = heap.allocate(3 * HEADER_SIZE).unwrap();
            assert_eq!(heap.usage_summary().free, UsageInfo::default());
            assert!(heap.allocate(16).is_none());

            heap.attach(attached, attached_size);
            let p2 = heap.allocate(16).unwrap();
            assert!(p2.addr() >= attached.addr());
            assert!(p2.addr() < attached.addr() + attached_size);

            let summary = heap.usage_summary();
            assert_eq!(summary.used.chunks, 2);
            assert_eq!(total_managed(&summary), primary_size + attached_size);

            // Freeing everything coalesces within each region but never
            // across the gap between them.
            heap.deallocate(p2);
            heap.deallocate(a1);
            let summary = heap.usage_summary();
            assert_eq!(summary.used.chunks, 0);
            assert_eq!(summary.free.chunks, 2);
            assert_eq!(summary.free.total_bytes, primary_size + attached_size - 2 * HEADER_SIZE);
        });
    }

    #[test]
    fn spin_locked_heap_is_shareable() {
        with_pool(8192, |pool, size| {
            let heap = unsafe { Heap::<spin::Mutex<()>>::new(pool, size) };
            std::thread::scope(|scope| {
                for thread in 0_u8..4 {
                    let heap = &heap;
                    scope.spawn(move || {
                        let sizes = [16_usize, 96, 48, 128];
                        for round in 0..64 {
                            let size = sizes[(round + usize::from(thread)) % sizes.len()];
                            let ptr = heap.allocate(size).expect("pool large enough");
                            unsafe {
                                ptr.write_bytes(thread, size);
                                for offset in 0..size {
                                    assert_eq!(ptr.add(offset).read(), thread);
                                }
                                heap.deallocate(ptr);
                            }
                        }
                    });
                }
            });

            let summary = heap.usage_summary();
            assert_eq!(summary.used.chunks, 0);
            assert_eq!(summary.free.chunks, 1);
            assert_eq!(total_managed(&summary), size);
        });
    }
}
