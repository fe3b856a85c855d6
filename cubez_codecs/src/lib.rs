mod deflate_entropy;
mod identity;
mod identity_half;
mod lz4_entropy;
mod none_entropy;
mod wavelet_quant;
mod zstd_entropy;

pub use deflate_entropy::DeflateBackend;
pub use identity::IdentityCodec;
pub use identity_half::IdentityHalfCodec;
pub use lz4_entropy::Lz4BlockBackend;
pub use none_entropy::NoneBackend;
pub use wavelet_quant::WaveletQuantCodec;
pub use zstd_entropy::ZstdBackend;

use std::sync::Arc;

use cubez_core::{CodecPlugin, CubezError, EntropyBackend, Result};

/// Resolve a codec plugin from the name an archive's `Wavelets:` header
/// field stores. Called by the CLI when opening an existing archive, so
/// the reader can be initialized with the right plugin automatically.
pub fn codec_by_name(name: &str) -> Result<Arc<dyn CodecPlugin>> {
    match name {
        "identity" => Ok(Arc::new(IdentityCodec)),
        "identity-half" => Ok(Arc::new(IdentityHalfCodec)),
        "haar-quant" => Ok(Arc::new(WaveletQuantCodec)),
        _ => Err(CubezError::Configuration(format!(
            "unknown codec '{name}'; this build bundles 'identity', 'identity-half', and 'haar-quant'"
        ))),
    }
}

/// Resolve an entropy backend from the name an archive's `Encoder:` header
/// field stores.
pub fn entropy_by_name(name: &str) -> Result<Arc<dyn EntropyBackend>> {
    match name {
        "none" => Ok(Arc::new(NoneBackend)),
        "deflate" => Ok(Arc::new(DeflateBackend::default())),
        "lz4" => Ok(Arc::new(Lz4BlockBackend)),
        "zstd" => Ok(Arc::new(ZstdBackend::default())),
        _ => Err(CubezError::Configuration(format!(
            "unknown entropy backend '{name}'; this build bundles 'none', 'deflate', 'lz4', 'zstd'"
        ))),
    }
}
