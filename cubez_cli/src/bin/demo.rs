//! cubez proof-of-concept demo.
//!
//! Writes a synthetic 3-D scalar field to a cubez archive at two different
//! precisions, then demonstrates the core access-native claim: fetching
//! one block by coordinate touches only that block's chunk, independent
//! of how many other blocks the archive holds.

#[path = "../synthetic.rs"]
mod synthetic;

use std::path::Path;
use std::time::{Duration, Instant};

use cubez_codecs::{codec_by_name, entropy_by_name, IdentityCodec, NoneBackend};
use cubez_core::{
    write_channel, ArchiveReader, BlockSource, CodecPlugin, EntropyBackend, SingleRankTopology,
    Triple, WriteOptions,
};

use synthetic::SyntheticField;

const BLOCKS_PER_AXIS: u32 = 8;

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut v = n as f64;
    let mut u = 0;
    while v >= 1024.0 && u < UNITS.len() - 1 {
        v /= 1024.0;
        u += 1;
    }
    if u == 0 {
        format!("{n} B")
    } else {
        format!("{v:.2} {}", UNITS[u])
    }
}

fn fmt_duration(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms < 1.0 {
        format!("{:.1} us", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{ms:.1} ms")
    } else {
        format!("{:.2} s", d.as_secs_f64())
    }
}

fn speedup(slow: Duration, fast: Duration) -> f64 {
    slow.as_secs_f64() / fast.as_secs_f64().max(1e-9)
}

fn write_archive(
    path: &Path,
    field: &SyntheticField,
    codec_name: &str,
    entropy_name: &str,
    precision: f64,
) -> anyhow::Result<Duration> {
    let (ex, ey, ez) = field.extent();
    let (bx, by, bz) = field.global_blocks();
    let options = WriteOptions {
        codec: codec_by_name(codec_name)?,
        entropy: entropy_by_name(entropy_name)?,
        precision,
        worker_count: 4,
        global_blocks: Triple::new(bx, by, bz),
        extent: Triple::new(ex, ey, ez),
        subdomain_blocks: Triple::new(bx, by, bz),
        half_float: false,
        wavelet_threshold: precision,
    };
    std::fs::File::create(path)?;
    let topology = SingleRankTopology;
    let t0 = Instant::now();
    write_channel(path, field, 0, &topology, &options)?;
    Ok(t0.elapsed())
}

fn main() -> anyhow::Result<()> {
    println!("=== cubez proof-of-concept demo ===\n");

    let field = SyntheticField::new(BLOCKS_PER_AXIS, BLOCKS_PER_AXIS, BLOCKS_PER_AXIS);
    let total_blocks = field.resident_blocks().len();
    let raw_bytes = total_blocks as u64 * cubez_core::BLOCK_EDGE.pow(3) as u64 * 4;

    println!(
        "generating {}x{}x{} blocks ({} total, {} raw)...\n",
        BLOCKS_PER_AXIS,
        BLOCKS_PER_AXIS,
        BLOCKS_PER_AXIS,
        total_blocks,
        human_bytes(raw_bytes)
    );

    let lossless_path = std::env::temp_dir().join("cubez_demo_lossless.cz");
    let lossy_path = std::env::temp_dir().join("cubez_demo_lossy.cz");

    let t_lossless = write_archive(&lossless_path, &field, IdentityCodec.name(), NoneBackend.name(), 0.0)?;
    let t_lossy = write_archive(&lossy_path, &field, "haar-quant", "zstd", 1e-3)?;

    let lossless_size = std::fs::metadata(&lossless_path)?.len();
    let lossy_size = std::fs::metadata(&lossy_path)?.len();

    println!("--- write ---");
    println!(
        "  identity + none : {} in {}",
        human_bytes(lossless_size),
        fmt_duration(t_lossless)
    );
    println!(
        "  haar-quant+zstd : {} in {}  ({:.1}x smaller)",
        human_bytes(lossy_size),
        fmt_duration(t_lossy),
        lossless_size as f64 / lossy_size as f64
    );

    println!("\n--- random access ---");
    let codec = codec_by_name("haar-quant")?;
    let entropy = entropy_by_name("zstd")?;
    let mut reader = ArchiveReader::open(&lossy_path, codec, entropy, 1e-3)?;

    let target = (BLOCKS_PER_AXIS as i32 / 2, BLOCKS_PER_AXIS as i32 / 2, 0);
    let t0 = Instant::now();
    let _single = reader.fetch(target.0, target.1, target.2)?;
    let single_fetch = t0.elapsed();

    let t0 = Instant::now();
    let _all = reader.scan_all()?;
    let full_scan = t0.elapsed();

    println!(
        "  single fetch({},{},{}) : {}",
        target.0,
        target.1,
        target.2,
        fmt_duration(single_fetch)
    );
    println!(
        "  full sequential scan    : {} ({} blocks)",
        fmt_duration(full_scan),
        total_blocks
    );
    println!(
        "  speedup                 : {:.1}x",
        speedup(full_scan, single_fetch)
    );

    std::fs::remove_file(&lossless_path).ok();
    std::fs::remove_file(&lossy_path).ok();

    Ok(())
}
