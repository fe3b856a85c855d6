use cubez_core::{CodecPlugin, Cube, CubezError, Result, BLOCK_EDGE};

/// Lossless codec: stores every sample verbatim as little-endian `f32`
/// bytes. `precision` is ignored — identity means full fidelity regardless
/// of the requested tolerance. Useful for verifying the archive format's
/// round trip independently of any lossy transform, and for fields where
/// further approximation is unacceptable.
pub struct IdentityCodec;

impl CodecPlugin for IdentityCodec {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn max_output_bytes(&self) -> usize {
        BLOCK_EDGE * BLOCK_EDGE * BLOCK_EDGE * 4
    }

    fn compress(&self, cube: &Cube, _precision: f64) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(cube.data.len() * 4);
        for v in &cube.data {
            out.extend_from_slice(&v.to_le_bytes());
        }
        Ok(out)
    }

    fn decompress(&self, bytes: &[u8], edge: usize, _precision: f64) -> Result<Cube> {
        let expected = edge * edge * edge * 4;
        if bytes.len() != expected {
            return Err(CubezError::Corruption(format!(
                "identity payload is {} bytes, expected {}",
                bytes.len(),
                expected
            )));
        }
        let mut cube = Cube::zeros(edge);
        for (v, chunk) in cube.data.iter_mut().zip(bytes.chunks_exact(4)) {
            *v = f32::from_le_bytes(chunk.try_into().unwrap());
        }
        Ok(cube)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_samples() {
        let mut cube = Cube::zeros(BLOCK_EDGE);
        for (i, v) in cube.data.iter_mut().enumerate() {
            *v = i as f32 * 0.5 - 10.0;
        }
        let codec = IdentityCodec;
        let bytes = codec.compress(&cube, 0.0).unwrap();
        let back = codec.decompress(&bytes, BLOCK_EDGE, 0.0).unwrap();
        assert_eq!(cube, back);
    }

    #[test]
    fn rejects_truncated_payload() {
        let codec = IdentityCodec;
        assert!(codec.decompress(&[0u8; 4], BLOCK_EDGE, 0.0).is_err());
    }
}
