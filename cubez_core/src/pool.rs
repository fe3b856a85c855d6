/// Compression Buffer Pool sizing (SPEC_FULL.md §4.3), grounded directly
/// in the `ENTRIES`/`BUFFERSIZE` constants of
/// `SerializerIO_WaveletCompression_MPI_Simple.h`: one buffer should hold
/// about 4 MiB worth of block records before a flush is forced.
const TARGET_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// Little-endian length prefix written before every block's payload inside
/// a compression buffer.
const LENGTH_PREFIX_BYTES: usize = 4;

/// Derived sizing for one worker's compression buffer and its companion
/// hotblock metadata stubs.
#[derive(Debug, Clone, Copy)]
pub struct PoolSizing {
    /// Per-block entry size: codec output bound plus the length prefix.
    pub entry_size: usize,
    /// Number of block records one buffer holds before it is full.
    pub entries_per_buffer: usize,
    /// Total buffer capacity in bytes.
    pub buffer_size: usize,
    /// Fill threshold at which a worker proactively flushes.
    pub alert: usize,
}

impl PoolSizing {
    /// `codec_state_bytes` is the configured codec plugin's
    /// `max_output_bytes()`.
    pub fn new(codec_state_bytes: usize) -> Self {
        let entry_size = codec_state_bytes + LENGTH_PREFIX_BYTES;
        let entries_per_buffer = std::cmp::max(1, TARGET_BUFFER_BYTES / entry_size);
        let buffer_size = entries_per_buffer * entry_size;
        let alert = entries_per_buffer.saturating_sub(1) * entry_size;
        Self {
            entry_size,
            entries_per_buffer,
            buffer_size,
            alert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_codec_output_yields_many_entries_per_buffer() {
        let sizing = PoolSizing::new(60);
        assert_eq!(sizing.entry_size, 64);
        assert!(sizing.entries_per_buffer > 1000);
        assert_eq!(sizing.buffer_size, sizing.entries_per_buffer * 64);
        assert_eq!(sizing.alert, (sizing.entries_per_buffer - 1) * 64);
    }

    #[test]
    fn huge_codec_output_still_yields_at_least_one_entry() {
        let sizing = PoolSizing::new(8 * 1024 * 1024);
        assert_eq!(sizing.entries_per_buffer, 1);
        assert_eq!(sizing.alert, 0);
    }
}
