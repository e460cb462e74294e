//! Injectable mutual-exclusion capability.
//!
//! The heap never synchronizes on its own; it is generic over a [`RawLock`]
//! supplied by the integration layer. Every public heap operation acquires
//! the lock for its whole duration through a scope-bound guard, so the lock
//! is released on every exit path. Operations never suspend while holding
//! the lock, and locking is not reentrant: calling back into the same heap
//! from a context that already holds its lock deadlocks by design.
//!
//! Two implementations ship with the crate:
//!
//! - [`NoopLock`] for single-context builds. It is deliberately not `Sync`,
//!   so a heap using it cannot be shared across threads by accident.
//! - [`spin::Mutex<()>`] for multi-threaded or interrupt-free contexts,
//!   reusing the `spin` crate's spinlock as the exclusion primitive.

use core::{cell::Cell, marker::PhantomData, mem};

/// A bare lock/unlock capability.
///
/// # Safety
///
/// Implementations must provide mutual exclusion: between a call to
/// [`acquire`](Self::acquire) returning and the matching
/// [`release`](Self::release), no other `acquire` on the same value may
/// return.
pub unsafe trait RawLock {
    /// Initial (unlocked) value, usable in constant context.
    const INIT: Self;

    /// Blocks until the lock is held by the caller.
    fn acquire(&self);

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock via a prior [`acquire`](Self::acquire).
    unsafe fn release(&self);
}

/// Scope-bound acquisition of a [`RawLock`].
///
/// Acquires on construction, releases on drop, so early returns and failure
/// paths cannot leak the lock.
pub(crate) struct LockGuard<'a, L: RawLock>(&'a L);

impl<'a, L: RawLock> LockGuard<'a, L> {
    pub(crate) fn new(lock: &'a L) -> Self {
        lock.acquire();
        Self(lock)
    }
}

impl<L: RawLock> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        // SAFETY: constructed via `new`, which acquired the lock.
        unsafe { self.0.release() }
    }
}

/// No-op lock for heaps confined to a single context.
///
/// The `PhantomData<Cell<()>>` keeps the type `Send` but not `Sync`, so
/// `Heap<NoopLock>` cannot be shared between threads.
pub struct NoopLock {
    _not_sync: PhantomData<Cell<()>>,
}

// SAFETY: with a single context there is nothing to exclude.
unsafe impl RawLock for NoopLock {
    const INIT: Self = Self {
        _not_sync: PhantomData,
    };

    fn acquire(&self) {}

    unsafe fn release(&self) {}
}

// SAFETY: `spin::Mutex` provides mutual exclusion; the guard returned by
// `lock` is forgotten rather than dropped, leaving the mutex held until
// `force_unlock`.
unsafe impl RawLock for spin::Mutex<()> {
    const INIT: Self = Self::new(());

    fn acquire(&self) {
        mem::forget(self.lock());
    }

    unsafe fn release(&self) {
        // SAFETY: the caller holds the lock, per this trait's contract.
        unsafe { self.force_unlock() }
    }
}
