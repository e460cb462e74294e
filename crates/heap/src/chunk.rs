//! Chunk model: the in-pool header and the split/merge operations.
//!
//! A managed pool is a sequence of chunks, each consisting of a [`Header`]
//! immediately followed by its payload bytes. Headers are threaded into a
//! single circular doubly-linked list covering the whole pool (and every
//! attached pool):
//!
//! ```text
//! {Header_0:payload_0}{Header_1:payload_1}...{Header_N:payload_N}
//! ```
//!
//! `next` of the last header points back to the first one, closing the ring.
//! `prev` of the first header points to itself, marking the list origin.
//! Within one pool the list is byte-exact: `HEADER_SIZE + size` of a chunk is
//! exactly the distance to the next header, so neighboring chunks can be
//! merged by address arithmetic alone.

use derive_more::IsVariant;

/// Alignment of every chunk header and payload pointer.
///
/// Matches the strictest alignment of common primitive types, so payloads are
/// usable for any ordinary data.
pub const ALIGN: usize = 16;

/// Size of the per-chunk metadata record.
pub const HEADER_SIZE: usize = size_of::<Header>();

/// Maximum payload size of a single chunk.
///
/// Pools (and attached regions) must not exceed `HEADER_SIZE +
/// MAX_CHUNK_PAYLOAD` bytes; this is enforced when a region is handed to the
/// allocator rather than silently truncated.
pub const MAX_CHUNK_PAYLOAD: usize = (1 << 24) - 1;

const _: () = assert!(align_of::<Header>() == ALIGN);
const _: () = assert!(size_of::<Header>() % ALIGN == 0);

/// Allocation state of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
pub(crate) enum ChunkState {
    Free,
    Allocated,
}

/// Per-chunk metadata record, stored in the pool directly before the payload.
///
/// Headers are never constructed as Rust values on the stack; they are
/// written into pool memory with [`Header::init`] or [`Header::split`] and
/// manipulated through raw pointers from then on. A header is destroyed only
/// by [`Header::merge_with_next`], which absorbs its span into the
/// predecessor and abandons the header bytes.
#[repr(C, align(16))]
pub(crate) struct Header {
    /// Next header in the ring. The last header points back to the first.
    pub(crate) next: *mut Header,
    /// Previous header in the ring. The first header points to itself.
    pub(crate) prev: *mut Header,
    pub(crate) state: ChunkState,
    /// Payload size in bytes, not counting the header itself.
    pub(crate) size: usize,
}

impl Header {
    /// Writes a single free chunk spanning `size` bytes at `region`, linked
    /// to itself as a one-element ring.
    ///
    /// The start of the region is rounded up to [`ALIGN`] and the span is
    /// shrunk accordingly, so callers may pass any byte buffer.
    ///
    /// # Panics
    ///
    /// Panics if `region` is null, if the aligned region is too small to hold
    /// a header plus one alignment unit of payload, or if the resulting
    /// payload would exceed [`MAX_CHUNK_PAYLOAD`].
    ///
    /// # Safety
    ///
    /// `region..region + size` must be valid for reads and writes and not in
    /// use by anything else for the lifetime of the allocator.
    pub(crate) unsafe fn init(region: *mut u8, size: usize) -> *mut Self {
        assert!(!region.is_null(), "pool pointer must not be null");

        let offset = region.align_offset(ALIGN);
        let start = region.map_addr(|addr| addr + offset);
        let size = size.saturating_sub(offset);
        assert!(
            size >= HEADER_SIZE + ALIGN,
            "pool too small for one chunk after alignment"
        );
        assert!(
            size - HEADER_SIZE <= MAX_CHUNK_PAYLOAD,
            "pool exceeds the maximum chunk payload"
        );

        #[expect(clippy::cast_ptr_alignment)]
        let chunk = start.cast::<Self>();
        unsafe {
            chunk.write(Self {
                next: chunk,
                prev: chunk,
                state: ChunkState::Free,
                size: size - HEADER_SIZE,
            });
        }
        chunk
    }

    /// Returns the payload pointer of `chunk`.
    ///
    /// # Safety
    ///
    /// `chunk` must point to a live header.
    pub(crate) unsafe fn payload(chunk: *mut Self) -> *mut u8 {
        unsafe { chunk.byte_add(HEADER_SIZE).cast() }
    }

    /// Recovers the header from a payload pointer previously produced by
    /// [`Header::payload`].
    ///
    /// # Safety
    ///
    /// `ptr` must be at least `HEADER_SIZE` past the start of an allocation
    /// the caller may access; the result is only meaningful if `ptr` actually
    /// came from [`Header::payload`].
    pub(crate) unsafe fn from_payload(ptr: *mut u8) -> *mut Self {
        #[expect(clippy::cast_ptr_alignment)]
        unsafe {
            ptr.byte_sub(HEADER_SIZE).cast()
        }
    }

    /// Address one past the end of this chunk's payload.
    ///
    /// # Safety
    ///
    /// `chunk` must point to a live header.
    pub(crate) unsafe fn end_addr(chunk: *mut Self) -> usize {
        unsafe { chunk.addr() + HEADER_SIZE + (*chunk).size }
    }

    /// Whether `next` starts exactly where `chunk` ends.
    ///
    /// List neighbors within one pool always adjoin (the ring is byte-exact);
    /// list neighbors across an attached pool boundary never do. Merging is
    /// only legal for adjoining chunks.
    ///
    /// # Safety
    ///
    /// Both pointers must point to live headers.
    pub(crate) unsafe fn adjoins(chunk: *mut Self, next: *mut Self) -> bool {
        unsafe { Self::end_addr(chunk) == next.addr() }
    }

    /// Carves a new free chunk out of the tail of `chunk`, truncating `chunk`
    /// to a `required - HEADER_SIZE` payload and marking it allocated.
    ///
    /// `required` is the total span (header plus payload) to keep, a multiple
    /// of [`ALIGN`]. The new chunk takes over the rest of the span and is
    /// spliced into the ring right after `chunk`. The origin's self-looped
    /// `prev` is left untouched when the new chunk closes the ring.
    ///
    /// # Panics
    ///
    /// Panics if `chunk` is not free or the remainder would be too small to
    /// form a valid free chunk.
    ///
    /// # Safety
    ///
    /// `chunk` and `origin` must point to live headers of the same ring.
    pub(crate) unsafe fn split(chunk: *mut Self, required: usize, origin: *mut Self) -> *mut Self {
        unsafe {
            assert!((*chunk).state.is_free(), "split of an allocated chunk");
            assert!(
                (*chunk).size > required + HEADER_SIZE + ALIGN,
                "split remainder would be below the minimum chunk size"
            );

            let new_chunk = chunk.byte_add(required);
            new_chunk.write(Self {
                next: (*chunk).next,
                prev: chunk,
                state: ChunkState::Free,
                size: (*chunk).size - required,
            });

            (*chunk).next = new_chunk;
            (*chunk).size = required - HEADER_SIZE;
            (*chunk).state = ChunkState::Allocated;

            // The origin's prev is a self-loop by invariant; only interior
            // successors carry a real back-pointer.
            let after = (*new_chunk).next;
            if !core::ptr::eq(after, origin) {
                (*after).prev = new_chunk;
            }
            new_chunk
        }
    }

    /// Absorbs the chunk directly after `chunk` into it.
    ///
    /// The successor's header ceases to exist; its span (header and payload)
    /// is added to `chunk`'s payload, keeping the ring byte-exact.
    ///
    /// # Panics
    ///
    /// Panics if the successor is not free or does not adjoin `chunk`.
    ///
    /// # Safety
    ///
    /// `chunk` and `origin` must point to live headers of the same ring, and
    /// the successor must not be `origin`.
    pub(crate) unsafe fn merge_with_next(chunk: *mut Self, origin: *mut Self) {
        unsafe {
            let next = (*chunk).next;
            assert!((*next).state.is_free(), "merge with an allocated chunk");
            assert!(Self::adjoins(chunk, next), "merge across a pool boundary");

            (*chunk).size += HEADER_SIZE + (*next).size;
            let after = (*next).next;
            (*chunk).next = after;
            if !core::ptr::eq(after, origin) {
                (*after).prev = chunk;
            }
        }
    }
}
