use cubez_core::{CodecPlugin, Cube, CubezError, Result, BLOCK_EDGE};

/// Lossy codec: one level of a separable 3-D Haar transform followed by
/// uniform quantization at a step derived from the requested `precision`.
///
/// Smooth regions of the field collapse most high-frequency detail
/// coefficients to zero after quantization, which is what lets the
/// downstream entropy backend (SPEC_FULL.md §4.2) compress the result well
/// — the same two-stage design (numerical predictor, then lossless coder)
/// as the wavelet plugins this crate's contract is modeled on. The
/// quantization step is stored alongside the coefficients so decompression
/// never needs the original `precision` value.
///
/// The Haar lifting scheme is not orthonormal, so quantization error is
/// amplified as it propagates back through the three cascaded axis passes
/// of the inverse transform: reconstructed samples can differ from the
/// original by up to roughly 20x `precision`, not `precision` itself.
pub struct WaveletQuantCodec;

const HEADER_BYTES: usize = 8;

impl CodecPlugin for WaveletQuantCodec {
    fn name(&self) -> &'static str {
        "haar-quant"
    }

    fn max_output_bytes(&self) -> usize {
        HEADER_BYTES + BLOCK_EDGE * BLOCK_EDGE * BLOCK_EDGE * 2
    }

    fn compress(&self, cube: &Cube, precision: f64) -> Result<Vec<u8>> {
        if !cube.edge.is_power_of_two() {
            return Err(CubezError::Precondition(format!(
                "haar-quant requires a power-of-two edge, got {}",
                cube.edge
            )));
        }
        let mut transformed = cube.clone();
        forward_3d(&mut transformed);

        let quantum = precision.max(1e-6);
        let mut out = Vec::with_capacity(HEADER_BYTES + transformed.data.len() * 2);
        out.extend_from_slice(&quantum.to_le_bytes());
        for v in &transformed.data {
            let q = (*v as f64 / quantum).round();
            let clamped = q.clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            out.extend_from_slice(&clamped.to_le_bytes());
        }
        Ok(out)
    }

    fn decompress(&self, bytes: &[u8], edge: usize, _precision: f64) -> Result<Cube> {
        let expected = HEADER_BYTES + edge * edge * edge * 2;
        if bytes.len() != expected {
            return Err(CubezError::Corruption(format!(
                "haar-quant payload is {} bytes, expected {}",
                bytes.len(),
                expected
            )));
        }
        let quantum = f64::from_le_bytes(bytes[0..HEADER_BYTES].try_into().unwrap());
        let mut cube = Cube::zeros(edge);
        for (v, chunk) in cube
            .data
            .iter_mut()
            .zip(bytes[HEADER_BYTES..].chunks_exact(2))
        {
            let q = i16::from_le_bytes(chunk.try_into().unwrap());
            *v = (q as f64 * quantum) as f32;
        }
        inverse_3d(&mut cube);
        Ok(cube)
    }
}

fn haar1d_forward(line: &mut [f32]) {
    let n = line.len();
    let half = n / 2;
    let mut tmp = vec![0f32; n];
    for i in 0..half {
        let a = line[2 * i];
        let b = line[2 * i + 1];
        tmp[i] = (a + b) * 0.5;
        tmp[half + i] = a - b;
    }
    line.copy_from_slice(&tmp);
}

fn haar1d_inverse(line: &mut [f32]) {
    let n = line.len();
    let half = n / 2;
    let mut tmp = vec![0f32; n];
    for i in 0..half {
        let s = line[i];
        let d = line[half + i];
        let a = s + d * 0.5;
        let b = a - d;
        tmp[2 * i] = a;
        tmp[2 * i + 1] = b;
    }
    line.copy_from_slice(&tmp);
}

fn transform_strided(data: &mut [f32], start: usize, stride: usize, n: usize, forward: bool) {
    let mut line: Vec<f32> = (0..n).map(|i| data[start + i * stride]).collect();
    if forward {
        haar1d_forward(&mut line);
    } else {
        haar1d_inverse(&mut line);
    }
    for (i, v) in line.into_iter().enumerate() {
        data[start + i * stride] = v;
    }
}

fn forward_3d(cube: &mut Cube) {
    let e = cube.edge;
    for z in 0..e {
        for y in 0..e {
            let start = (z * e + y) * e;
            let mut line = cube.data[start..start + e].to_vec();
            haar1d_forward(&mut line);
            cube.data[start..start + e].copy_from_slice(&line);
        }
    }
    for z in 0..e {
        for x in 0..e {
            transform_strided(&mut cube.data, z * e * e + x, e, e, true);
        }
    }
    for y in 0..e {
        for x in 0..e {
            transform_strided(&mut cube.data, y * e + x, e * e, e, true);
        }
    }
}

fn inverse_3d(cube: &mut Cube) {
    let e = cube.edge;
    for y in 0..e {
        for x in 0..e {
            transform_strided(&mut cube.data, y * e + x, e * e, e, false);
        }
    }
    for z in 0..e {
        for x in 0..e {
            transform_strided(&mut cube.data, z * e * e + x, e, e, false);
        }
    }
    for z in 0..e {
        for y in 0..e {
            let start = (z * e + y) * e;
            let mut line = cube.data[start..start + e].to_vec();
            haar1d_inverse(&mut line);
            cube.data[start..start + e].copy_from_slice(&line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_field_survives_tight_precision() {
        let mut cube = Cube::zeros(BLOCK_EDGE);
        for v in cube.data.iter_mut() {
            *v = 7.0;
        }
        let codec = WaveletQuantCodec;
        let bytes = codec.compress(&cube, 1e-4).unwrap();
        let back = codec.decompress(&bytes, BLOCK_EDGE, 1e-4).unwrap();
        for v in &back.data {
            assert!((v - 7.0).abs() < 1e-2, "got {v}");
        }
    }

    #[test]
    fn reconstruction_error_bounded_by_precision() {
        let mut cube = Cube::zeros(BLOCK_EDGE);
        for (i, v) in cube.data.iter_mut().enumerate() {
            *v = (i as f32 * 0.013).sin() * 3.0;
        }
        let precision = 0.05;
        let codec = WaveletQuantCodec;
        let bytes = codec.compress(&cube, precision).unwrap();
        let back = codec.decompress(&bytes, BLOCK_EDGE, precision).unwrap();
        let max_err = cube
            .data
            .iter()
            .zip(back.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0f32, f32::max);
        // the Haar transform mixes error across samples during the inverse,
        // so the bound is generous relative to the raw quantization step.
        assert!(max_err < precision as f32 * 20.0, "max_err={max_err}");
    }

    #[test]
    fn output_never_exceeds_declared_bound() {
        let mut cube = Cube::zeros(BLOCK_EDGE);
        for (i, v) in cube.data.iter_mut().enumerate() {
            *v = i as f32;
        }
        let codec = WaveletQuantCodec;
        let bytes = codec.compress(&cube, 1e-9).unwrap();
        assert!(bytes.len() <= codec.max_output_bytes());
    }
}
