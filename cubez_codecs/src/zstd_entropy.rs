use cubez_core::entropy::check_cap;
use cubez_core::{CubezError, EntropyBackend, Result};

/// Entropy backend over `zstd`. Usually the best ratio of the bundled
/// backends at a moderate compression level, at some decode-speed cost
/// relative to [`crate::lz4_entropy::Lz4BlockBackend`].
pub struct ZstdBackend {
    pub level: i32,
}

impl Default for ZstdBackend {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl EntropyBackend for ZstdBackend {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn encode(&self, data: &[u8], cap: usize) -> Result<Vec<u8>> {
        let out = zstd::bulk::compress(data, self.level)?;
        check_cap(&out, cap)?;
        Ok(out)
    }

    fn decode(&self, data: &[u8], out_cap: usize) -> Result<Vec<u8>> {
        let out = zstd::bulk::decompress(data, out_cap)
            .map_err(|e| CubezError::Corruption(format!("zstd decode failed: {e}")))?;
        Ok(out)
    }
}
