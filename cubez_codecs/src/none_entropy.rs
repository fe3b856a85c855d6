use cubez_core::entropy::check_cap;
use cubez_core::{EntropyBackend, Result};

/// Sentinel backend that performs no entropy coding: `encode`/`decode` are
/// both a copy. Exists so the pipeline and archive format can run with
/// entropy coding disabled entirely, and as the baseline other backends
/// are measured against.
pub struct NoneBackend;

impl EntropyBackend for NoneBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    fn encode(&self, data: &[u8], cap: usize) -> Result<Vec<u8>> {
        check_cap(data, cap)?;
        Ok(data.to_vec())
    }

    fn decode(&self, data: &[u8], out_cap: usize) -> Result<Vec<u8>> {
        check_cap(data, out_cap)?;
        Ok(data.to_vec())
    }
}
