//! Compares a candidate archive against a reference archive, block by
//! block, and reports the same error metrics CubismZ's `cz2diff` tool
//! does: compression rate, the l-infinity/l1/l2 error norms (absolute and
//! relative to the reference field's own magnitude), bits per sample, and
//! PSNR. Single-process: no MPI reduction, just a local accumulation.

use std::path::PathBuf;

use clap::Parser;

use cubez_codecs::{codec_by_name, entropy_by_name};
use cubez_core::ArchiveReader;

#[derive(Parser)]
#[command(
    name = "cz2diff",
    about = "Compare a candidate cubez archive against a reference archive"
)]
struct Cli {
    /// Candidate archive (e.g. produced at a coarser precision)
    #[arg(long)]
    file1: PathBuf,
    /// Reference archive (the ground truth field)
    #[arg(long)]
    file2: PathBuf,
}

fn open(path: &PathBuf) -> anyhow::Result<ArchiveReader> {
    let header = cubez_core::peek_header(path)?;
    let codec = codec_by_name(&header.wavelets)?;
    let entropy = entropy_by_name(&header.encoder)?;
    Ok(ArchiveReader::open(
        path,
        codec,
        entropy,
        header.wavelet_threshold,
    )?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut reader1 = open(&cli.file1)?;
    let mut reader2 = open(&cli.file2)?;

    if reader1.index().len() != reader2.index().len() {
        anyhow::bail!(
            "block counts differ: {} vs {}",
            reader1.index().len(),
            reader2.index().len()
        );
    }

    let coords2: Vec<(i32, i32, i32)> = reader2
        .index()
        .iter()
        .map(|r| (r.ix, r.iy, r.iz))
        .collect();

    let mut n: u64 = 0;
    let mut e_inf = 0f64;
    let mut e_1 = 0f64;
    let mut e_2 = 0f64;
    let mut n_inf = 0f64;
    let mut n_1 = 0f64;
    let mut n_2 = 0f64;
    let mut mindata = f64::MAX;
    let mut maxdata = f64::MIN;

    for (ix, iy, iz) in coords2 {
        let cube1 = reader1.fetch(ix, iy, iz)?;
        let cube2 = reader2.fetch(ix, iy, iz)?;
        if cube1.data.len() != cube2.data.len() {
            anyhow::bail!("block ({ix},{iy},{iz}) has mismatched sample counts");
        }
        for (a, b) in cube1.data.iter().zip(cube2.data.iter()) {
            let f1 = *a as f64;
            let f2 = *b as f64;
            if f2 > maxdata {
                maxdata = f2;
            }
            if f2 < mindata {
                mindata = f2;
            }
            let v = f2.abs();
            if v > n_inf {
                n_inf = v;
            }
            n_1 += v;
            n_2 += v * v;

            let err = (f1 - f2).abs();
            if err > e_inf {
                e_inf = err;
            }
            e_1 += err;
            e_2 += err * err;
            n += 1;
        }
    }

    let uncompressed_footprint = std::mem::size_of::<f32>() as u64 * n;
    let compressed_footprint = std::fs::metadata(&cli.file1)?.len();
    let compression_rate = uncompressed_footprint as f64 / compressed_footprint as f64;

    let rel_e_inf = e_inf / n_inf;
    let rel_e_1 = e_1 / n_1;
    let mean_e_1 = e_1 / n as f64;
    let rel_e_2 = e_2.sqrt() / n_2.sqrt();
    let mean_e_2 = e_2.sqrt() / n as f64;
    let bits_per_sample = compressed_footprint as f64 * 8.0 / n as f64;
    let mse = e_2 / n as f64;
    let psnr = 20.0 * ((maxdata - mindata) / (2.0 * mse.sqrt())).log10();

    println!(
        "compression-rate: {:.2} rel-linf-error: {:e} rel-mean-error: {:e}",
        compression_rate, rel_e_inf, mean_e_1
    );
    println!(
        "RES: {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "CR", "rel(e_inf)", "rel(e_1)", "mean(e_1)", "rel(e_2)", "mean(e_2)", "BPS", "PSNR"
    );
    println!(
        "RES: {:>12.2} {:>12.6e} {:>12.6e} {:>12.6e} {:>12.6e} {:>12.6e} {:>12.4} {:>12.4}",
        compression_rate, rel_e_inf, rel_e_1, mean_e_1, rel_e_2, mean_e_2, bits_per_sample, psnr
    );

    Ok(())
}
