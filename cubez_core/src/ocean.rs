use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Rank-local growable byte store accumulating entropy-encoded chunks,
/// plus the chunk LUT recording each chunk's start offset.
///
/// Implements the flush algorithm's reserve-then-copy protocol
/// (SPEC_FULL.md §4.4 step b/c), grounded directly in the
/// `#pragma omp critical` / `#pragma omp atomic` pair around
/// `_encode_and_flush` in `SerializerIO_WaveletCompression_MPI_Simple.h`:
/// bookkeeping (offset allocation, chunk id assignment, capacity growth)
/// runs under a single mutex; the actual byte copy runs outside it so
/// concurrent flushes copy into disjoint ranges in parallel.
///
/// This requires genuine unsafe code: Rust's aliasing rules forbid
/// concurrent `&mut [u8]` access across threads even into disjoint ranges
/// without it. Any concurrent scheme here must still honour the
/// resize-drain rule: a resize never runs while a reserved range still
/// has a write pending against it.
pub struct ByteOcean {
    buf: UnsafeCell<Vec<u8>>,
    written_bytes: AtomicU64,
    pending_writes: AtomicU64,
    completed_writes: AtomicU64,
    bookkeeping: Mutex<Bookkeeping>,
}

struct Bookkeeping {
    chunk_lut: Vec<u64>,
}

// SAFETY: every writer's `dst_offset..dst_offset+zlen` range is reserved
// for it exclusively by `reserve`, which runs under `bookkeeping` and
// never hands out overlapping ranges. `buf` is only resized inside
// `reserve`, and only after observing `pending_writes == completed_writes`
// while still holding `bookkeeping` — so no thread ever holds a raw
// pointer into a buffer that is concurrently reallocated underneath it.
unsafe impl Sync for ByteOcean {}

impl ByteOcean {
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            buf: UnsafeCell::new(vec![0u8; initial_capacity]),
            written_bytes: AtomicU64::new(0),
            pending_writes: AtomicU64::new(0),
            completed_writes: AtomicU64::new(0),
            bookkeeping: Mutex::new(Bookkeeping {
                chunk_lut: Vec::new(),
            }),
        }
    }

    pub fn written_bytes(&self) -> u64 {
        self.written_bytes.load(Ordering::SeqCst)
    }

    /// Flush step (b): reserve `zlen` bytes, allocate the next chunk id,
    /// record its start offset, and grow the ocean first if it would not
    /// fit. Returns `(dst_offset, chunk_id)` for the matching
    /// [`write_at`](Self::write_at) call.
    pub fn reserve(&self, zlen: usize) -> (u64, usize) {
        let mut bk = self.bookkeeping.lock().unwrap();

        let dst_offset = self.written_bytes.load(Ordering::SeqCst);
        let new_written = dst_offset + zlen as u64;

        let capacity = unsafe { (*self.buf.get()).len() as u64 };
        if new_written > capacity {
            // Quiescence wait: every writer that already reserved a range
            // must finish copying into it before we reallocate.
            while self.pending_writes.load(Ordering::SeqCst)
                != self.completed_writes.load(Ordering::SeqCst)
            {
                std::hint::spin_loop();
            }
            unsafe {
                (*self.buf.get()).resize(new_written as usize, 0);
            }
        }

        self.written_bytes.store(new_written, Ordering::SeqCst);
        let chunk_id = bk.chunk_lut.len();
        bk.chunk_lut.push(dst_offset);
        self.pending_writes.fetch_add(1, Ordering::SeqCst);

        (dst_offset, chunk_id)
    }

    /// Flush step (c): copy `data` into the range reserved by `reserve`
    /// and mark the write complete. Must be called exactly once per
    /// `reserve` call with the offset it returned, and `data.len()` must
    /// equal the `zlen` passed to that `reserve` call.
    pub fn write_at(&self, dst_offset: u64, data: &[u8]) {
        unsafe {
            let ptr = (*self.buf.get()).as_mut_ptr().add(dst_offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len());
        }
        self.completed_writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Appends the chunk LUT (array of little-endian `u64` offsets) to the
    /// end of the ocean and returns the chunk count. Call once, after every
    /// flush's `write_at` in the parallel block loop has returned.
    pub fn finalize_chunk_lut(&mut self) -> usize {
        let chunk_lut = self.bookkeeping.get_mut().unwrap().chunk_lut.clone();
        let nchunks = chunk_lut.len();
        let buf = self.buf.get_mut();
        for offset in &chunk_lut {
            buf.extend_from_slice(&offset.to_le_bytes());
        }
        self.written_bytes.store(buf.len() as u64, Ordering::SeqCst);
        nchunks
    }

    /// The ocean's contents up to `written_bytes`. Only valid to call once
    /// all flushes have completed (no outstanding `reserve` without a
    /// matching `write_at`).
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.written_bytes.load(Ordering::SeqCst) as usize;
        unsafe { &(&*self.buf.get())[..len] }
    }
}

/// Parses a chunk LUT of `nchunks` little-endian `u64` offsets from the
/// tail of a rank's byte ocean, as laid down by
/// [`ByteOcean::finalize_chunk_lut`]. Used by the reader to rebuild each
/// rank's chunk table (SPEC_FULL.md §4.8).
pub fn parse_chunk_lut(bytes: &[u8], nchunks: usize) -> Vec<u64> {
    bytes
        .chunks_exact(8)
        .take(nchunks)
        .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn sequential_reserve_and_write_round_trips() {
        let ocean = ByteOcean::new(16);
        let (off_a, chunk_a) = ocean.reserve(4);
        ocean.write_at(off_a, b"abcd");
        let (off_b, chunk_b) = ocean.reserve(4);
        ocean.write_at(off_b, b"efgh");
        assert_eq!(chunk_a, 0);
        assert_eq!(chunk_b, 1);
        assert_eq!(&ocean.as_bytes()[off_a as usize..off_a as usize + 4], b"abcd");
        assert_eq!(&ocean.as_bytes()[off_b as usize..off_b as usize + 4], b"efgh");
    }

    #[test]
    fn grows_past_initial_capacity_without_corrupting_prior_writes() {
        let ocean = ByteOcean::new(4);
        let (off_a, _) = ocean.reserve(4);
        ocean.write_at(off_a, b"1234");
        let (off_b, _) = ocean.reserve(100);
        ocean.write_at(off_b, &vec![b'x'; 100]);
        assert_eq!(&ocean.as_bytes()[0..4], b"1234");
        assert_eq!(ocean.written_bytes(), 104);
    }

    #[test]
    fn concurrent_flushes_land_in_disjoint_ranges() {
        let ocean = ByteOcean::new(0);
        thread::scope(|scope| {
            for i in 0..8u8 {
                let ocean = &ocean;
                scope.spawn(move || {
                    let payload = vec![i; 37];
                    let (off, _chunk) = ocean.reserve(payload.len());
                    ocean.write_at(off, &payload);
                });
            }
        });
        assert_eq!(ocean.written_bytes(), 8 * 37);
        // every byte belongs to exactly one thread's run of identical value
        let bytes = ocean.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let v = bytes[i];
            assert_eq!(&bytes[i..i + 37], &vec![v; 37][..]);
            i += 37;
        }
    }

    #[test]
    fn finalize_chunk_lut_appends_offsets_and_advances_written_bytes() {
        let mut ocean = ByteOcean::new(8);
        let (off_a, _) = ocean.reserve(4);
        ocean.write_at(off_a, b"abcd");
        let (off_b, _) = ocean.reserve(4);
        ocean.write_at(off_b, b"efgh");
        let before = ocean.written_bytes();
        let nchunks = ocean.finalize_chunk_lut();
        assert_eq!(nchunks, 2);
        assert_eq!(ocean.written_bytes(), before + 2 * 8);
        let lut_bytes = &ocean.as_bytes()[before as usize..];
        assert_eq!(parse_chunk_lut(lut_bytes, 2), vec![0, 4]);
    }
}
