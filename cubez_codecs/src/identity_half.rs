use half::f16;

use cubez_core::{CodecPlugin, Cube, CubezError, Result, BLOCK_EDGE};

/// Lossless-in-transform-sense codec that stores every sample as IEEE
/// `binary16` instead of `binary32`: halves the footprint before any
/// entropy coding runs, at the cost of `f16`'s ~3 decimal digits of
/// precision. Distinct from [`crate::WaveletQuantCodec`]: no spatial
/// transform, so its error is a fixed per-sample rounding rather than
/// something `precision` can tune — archives using this codec should
/// record `HalfFloat: yes` in their header.
pub struct IdentityHalfCodec;

impl CodecPlugin for IdentityHalfCodec {
    fn name(&self) -> &'static str {
        "identity-half"
    }

    fn max_output_bytes(&self) -> usize {
        BLOCK_EDGE * BLOCK_EDGE * BLOCK_EDGE * 2
    }

    fn compress(&self, cube: &Cube, _precision: f64) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(cube.data.len() * 2);
        for v in &cube.data {
            out.extend_from_slice(&f16::from_f32(*v).to_le_bytes());
        }
        Ok(out)
    }

    fn decompress(&self, bytes: &[u8], edge: usize, _precision: f64) -> Result<Cube> {
        let expected = edge * edge * edge * 2;
        if bytes.len() != expected {
            return Err(CubezError::Corruption(format!(
                "identity-half payload is {} bytes, expected {}",
                bytes.len(),
                expected
            )));
        }
        let mut cube = Cube::zeros(edge);
        for (v, chunk) in cube.data.iter_mut().zip(bytes.chunks_exact(2)) {
            *v = f16::from_le_bytes(chunk.try_into().unwrap()).to_f32();
        }
        Ok(cube)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_within_half_precision() {
        let mut cube = Cube::zeros(BLOCK_EDGE);
        for (i, v) in cube.data.iter_mut().enumerate() {
            *v = i as f32 * 0.25;
        }
        let codec = IdentityHalfCodec;
        let bytes = codec.compress(&cube, 0.0).unwrap();
        let back = codec.decompress(&bytes, BLOCK_EDGE, 0.0).unwrap();
        for (a, b) in cube.data.iter().zip(back.data.iter()) {
            assert!((a - b).abs() <= a.abs() * 0.01 + 0.1, "{a} vs {b}");
        }
    }
}
