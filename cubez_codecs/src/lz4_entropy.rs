use lz4_flex::block::{compress_prepend_size, decompress_size_prepended};

use cubez_core::entropy::check_cap;
use cubez_core::{CubezError, EntropyBackend, Result};

/// Entropy backend over `lz4_flex`'s block format. Fastest decode of the
/// bundled backends; prefer it when the worker count is high and decode
/// throughput on `fetch` matters more than the last few percent of ratio.
pub struct Lz4BlockBackend;

impl EntropyBackend for Lz4BlockBackend {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn encode(&self, data: &[u8], cap: usize) -> Result<Vec<u8>> {
        let out = compress_prepend_size(data);
        check_cap(&out, cap)?;
        Ok(out)
    }

    fn decode(&self, data: &[u8], out_cap: usize) -> Result<Vec<u8>> {
        let out = decompress_size_prepended(data)
            .map_err(|e| CubezError::Corruption(format!("lz4 decode failed: {e}")))?;
        check_cap(&out, out_cap)?;
        Ok(out)
    }
}
