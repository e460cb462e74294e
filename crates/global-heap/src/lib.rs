//! [`GlobalAlloc`] adapter for the chunk-ring heap.
//!
//! The core allocator in the [`heap`] crate exposes a plain
//! allocate/deallocate interface and stays out of the global-allocator
//! business on purpose. This crate is the optional integration layer: a
//! [`GlobalHeap`] owns an `N`-byte pool, lazily builds a spinlocked
//! [`heap::Heap`] over it on first use, and forwards the [`GlobalAlloc`]
//! entry points to it, which is what lets `alloc` collections run on
//! `no_std` targets:
//!
//! ```rust,ignore
//! #[global_allocator]
//! static HEAP: global_heap::GlobalHeap<16384> = global_heap::GlobalHeap::new();
//!
//! extern crate alloc;
//! ```
//!
//! The core heap hands out pointers aligned to [`heap::ALIGN`] and nothing
//! stricter, so allocation requests with a larger alignment are refused with
//! a null pointer.

#![no_std]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use core::{
    alloc::{GlobalAlloc, Layout},
    cell::UnsafeCell,
    ptr,
};

use heap::{ALIGN, HEADER_SIZE, Heap, UsageSummary};
use spin::{Mutex, Once};

/// Backing storage carrying the alignment the heap expects, so no pool bytes
/// are lost to alignment trimming.
#[repr(align(16))]
struct Pool<const N: usize>([u8; N]);

const _: () = assert!(align_of::<Pool<0>>() >= ALIGN);

/// A chunk-ring heap over a self-contained `N`-byte pool, usable as the
/// global allocator.
///
/// Construction is `const`, so a `GlobalHeap` can live in a `static`. The
/// inner [`Heap`] is created on the first allocation, when the pool's final
/// address is known.
pub struct GlobalHeap<const N: usize> {
    pool: UnsafeCell<Pool<N>>,
    heap: Once<Heap<Mutex<()>>>,
}

// SAFETY: the pool is only reached through the inner heap, whose operations
// are serialized by its spinlock; `Once` serializes racing initializers.
unsafe impl<const N: usize> Sync for GlobalHeap<N> {}

impl<const N: usize> GlobalHeap<N> {
    /// Creates an empty, uninitialized `GlobalHeap`.
    ///
    /// # Panics
    ///
    /// Panics (at compile time when used in a `static` initializer) if `N`
    /// cannot hold one chunk header plus one alignment unit of payload.
    #[must_use]
    pub const fn new() -> Self {
        assert!(N >= HEADER_SIZE + ALIGN, "pool too small for one chunk");
        Self {
            pool: UnsafeCell::new(Pool([0; N])),
            heap: Once::new(),
        }
    }

    fn heap(&self) -> &Heap<Mutex<()>> {
        self.heap.call_once(|| {
            // SAFETY: the pool lives inside `self`, is exclusively ours, and
            // outlives the heap stored right next to it.
            unsafe { Heap::new(self.pool.get().cast(), N) }
        })
    }

    /// Counts free and allocated chunks in the pool; see
    /// [`Heap::usage_summary`].
    #[must_use]
    pub fn usage_summary(&self) -> UsageSummary {
        self.heap().usage_summary()
    }
}

impl<const N: usize> Default for GlobalHeap<N> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: memory handed out comes exclusively from the pool, stays valid
// until deallocated, and meets the layout's size and alignment whenever the
// request is accepted.
unsafe impl<const N: usize> GlobalAlloc for GlobalHeap<N> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > ALIGN {
            return ptr::null_mut();
        }
        self.heap()
            .allocate(layout.size())
            .unwrap_or(ptr::null_mut())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        unsafe { self.heap().deallocate(ptr) }
    }
}
