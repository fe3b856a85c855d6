use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use cubez_core::entropy::check_cap;
use cubez_core::{CubezError, EntropyBackend, Result};

/// Entropy backend over `flate2`'s raw DEFLATE stream. The general-purpose
/// fallback: no block-size assumptions, works on any byte sequence.
pub struct DeflateBackend {
    pub level: u32,
}

impl Default for DeflateBackend {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl EntropyBackend for DeflateBackend {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn encode(&self, data: &[u8], cap: usize) -> Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data)?;
        let out = encoder.finish()?;
        check_cap(&out, cap)?;
        Ok(out)
    }

    fn decode(&self, data: &[u8], out_cap: usize) -> Result<Vec<u8>> {
        let mut decoder = DeflateDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .by_ref()
            .take(out_cap as u64 + 1)
            .read_to_end(&mut out)
            .map_err(|e| CubezError::Corruption(format!("deflate decode failed: {e}")))?;
        check_cap(&out, out_cap)?;
        Ok(out)
    }
}
