#[path = "synthetic.rs"]
mod synthetic;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use cubez_codecs::{codec_by_name, entropy_by_name};
use cubez_core::{
    peek_header, write_channel, ArchiveReader, BlockSource, SingleRankTopology, Triple,
    WriteOptions,
};

use synthetic::SyntheticField;

#[derive(Parser)]
#[command(
    name = "cubez",
    about = "Parallel lossy+lossless compressor for block-structured 3-D scalar fields",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic field to a cubez archive (one rank, one channel)
    Write {
        /// Destination archive file (must already exist, e.g. via `touch`)
        output: PathBuf,
        /// Blocks along each axis of the synthetic grid
        #[arg(long, default_value_t = 4)]
        blocks_x: u32,
        #[arg(long, default_value_t = 4)]
        blocks_y: u32,
        #[arg(long, default_value_t = 4)]
        blocks_z: u32,
        /// Codec plugin: identity | identity-half | haar-quant
        #[arg(long, default_value = "haar-quant")]
        wavelet: String,
        /// Entropy backend: none | deflate | lz4 | zstd
        #[arg(long, default_value = "zstd")]
        entropy: String,
        /// Target precision/error bound passed to the codec plugin
        #[arg(long, default_value_t = 1e-3)]
        threshold: f64,
        /// Record `HalfFloat: yes` in the archive header (informational
        /// only — does not change how samples are stored; to actually
        /// store samples as half-float, pass `--wavelet identity-half`)
        #[arg(long)]
        half_float: bool,
        /// Block edge length; must equal the compiled-in edge (archive
        /// format records it, but this crate fixes it at compile time)
        #[arg(long, default_value_t = cubez_core::BLOCK_EDGE as u32)]
        block_size: u32,
        /// Worker thread count for the block pipeline
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Run the block pipeline but skip the File Assembler entirely —
        /// useful for measuring compression throughput without I/O
        #[arg(long)]
        skip_io: bool,
        /// Print per-stage timing and size diagnostics
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print an archive's ASCII header and, optionally, its block index
    Inspect {
        file: PathBuf,
        #[arg(long)]
        blocks: bool,
    },
    /// Randomly access a single block by grid coordinate
    Fetch {
        file: PathBuf,
        #[arg(long)]
        codec: String,
        #[arg(long)]
        entropy: String,
        #[arg(long, default_value_t = 1e-3)]
        precision: f64,
        ix: i32,
        iy: i32,
        iz: i32,
        /// Write the decoded block as raw little-endian f32 to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Benchmark random-access fetches across N randomly chosen blocks
    Bench {
        file: PathBuf,
        #[arg(long)]
        codec: String,
        #[arg(long)]
        entropy: String,
        #[arg(long, default_value_t = 1e-3)]
        precision: f64,
        #[arg(short, long, default_value_t = 1000)]
        count: u64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{v:.2} {}", UNITS[unit])
    }
}

#[allow(clippy::too_many_arguments)]
fn run_write(
    output: PathBuf,
    blocks_x: u32,
    blocks_y: u32,
    blocks_z: u32,
    wavelet_name: &str,
    entropy_name: &str,
    threshold: f64,
    half_float: bool,
    block_size: u32,
    workers: usize,
    skip_io: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    if block_size as usize != cubez_core::BLOCK_EDGE {
        anyhow::bail!(
            "--block-size {} does not match this build's compiled-in edge {}",
            block_size,
            cubez_core::BLOCK_EDGE
        );
    }

    let field = SyntheticField::new(blocks_x, blocks_y, blocks_z);
    let codec = codec_by_name(wavelet_name)?;
    let entropy = entropy_by_name(entropy_name)?;
    let (ex, ey, ez) = field.extent();

    let options = WriteOptions {
        codec: codec.clone(),
        entropy: entropy.clone(),
        precision: threshold,
        worker_count: workers,
        global_blocks: Triple::new(blocks_x, blocks_y, blocks_z),
        extent: Triple::new(ex, ey, ez),
        subdomain_blocks: Triple::new(blocks_x, blocks_y, blocks_z),
        half_float,
        wavelet_threshold: threshold,
    };

    let topology = SingleRankTopology;
    let t0 = Instant::now();

    if skip_io {
        let config = cubez_core::PipelineConfig {
            codec,
            entropy,
            precision: threshold,
            worker_count: workers,
        };
        let (ocean, index) = cubez_core::compress_channel(&field, 0, &config)?;
        let elapsed = t0.elapsed();
        eprintln!("  mode        : pipeline only, no file assembly");
        eprintln!("  blocks      : {}", index.len());
        eprintln!("  byte ocean  : {}", human_bytes(ocean.written_bytes()));
        eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
        return Ok(());
    }

    std::fs::File::create(&output)
        .with_context(|| format!("creating output file {:?}", output))?;
    write_channel(&output, &field, 0, &topology, &options)?;
    let elapsed = t0.elapsed();

    let raw_bytes = field.resident_blocks().len() as u64 * cubez_core::BLOCK_EDGE.pow(3) as u64 * 4;
    let on_disk = std::fs::metadata(&output)?.len();

    if verbose {
        eprintln!("  wavelet     : {}", wavelet_name);
        eprintln!("  entropy     : {}", entropy_name);
        eprintln!("  threshold   : {}", threshold);
        eprintln!("  half-float  : {}", half_float);
        eprintln!("  workers     : {}", workers);
    }
    eprintln!("  blocks      : {}", field.resident_blocks().len());
    eprintln!("  raw size    : {}", human_bytes(raw_bytes));
    eprintln!("  archive     : {}", human_bytes(on_disk));
    eprintln!("  ratio       : {:.2}x", raw_bytes as f64 / on_disk as f64);
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf, show_blocks: bool) -> anyhow::Result<()> {
    let header = peek_header(&file)?;
    let file_size = std::fs::metadata(&file)?.len();

    println!("=== cubez archive: {:?} ===", file);
    println!();
    println!("  sample width   : {} bytes", header.sizeof_real);
    println!(
        "  blocksize      : {} (edge {})",
        header.block_edge, header.block_edge
    );
    println!(
        "  blocks         : {} {} {}",
        header.blocks.x, header.blocks.y, header.blocks.z
    );
    println!(
        "  extent         : {} {} {}",
        header.extent.x, header.extent.y, header.extent.z
    );
    println!(
        "  subdomain      : {} {} {}",
        header.subdomain_blocks.x, header.subdomain_blocks.y, header.subdomain_blocks.z
    );
    println!("  half float     : {}", header.half_float);
    println!("  wavelets       : {}", header.wavelets);
    println!("  wavelet thresh : {}", header.wavelet_threshold);
    println!("  encoder        : {}", header.encoder);
    println!("  file on disk   : {}", human_bytes(file_size));

    if show_blocks {
        let codec = codec_by_name(&header.wavelets)?;
        let entropy = entropy_by_name(&header.encoder)?;
        let reader = ArchiveReader::open(&file, codec, entropy, header.wavelet_threshold)?;
        println!();
        println!(
            "  {:>10}  {:>6}  {:>6}  {:>6}  {:>10}  {:>10}",
            "global_id", "ix", "iy", "iz", "sub_id", "chunk_id"
        );
        println!("  {}", "-".repeat(58));
        for rec in reader.index() {
            println!(
                "  {:>10}  {:>6}  {:>6}  {:>6}  {:>10}  {:>10}",
                rec.global_block_id, rec.ix, rec.iy, rec.iz, rec.sub_id, rec.chunk_id
            );
        }
    }
    Ok(())
}

fn open_reader(
    file: &PathBuf,
    codec_name: &str,
    entropy_name: &str,
    precision: f64,
) -> anyhow::Result<ArchiveReader> {
    let codec = codec_by_name(codec_name)?;
    let entropy = entropy_by_name(entropy_name)?;
    Ok(ArchiveReader::open(file, codec, entropy, precision)?)
}

fn run_fetch(
    file: PathBuf,
    codec: &str,
    entropy: &str,
    precision: f64,
    ix: i32,
    iy: i32,
    iz: i32,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut reader = open_reader(&file, codec, entropy, precision)?;
    let t0 = Instant::now();
    let cube = reader.fetch(ix, iy, iz)?;
    let elapsed = t0.elapsed();

    eprintln!(
        "  fetched block ({ix},{iy},{iz}): {} samples in {:.3}ms",
        cube.data.len(),
        elapsed.as_secs_f64() * 1000.0
    );

    match output {
        Some(path) => {
            let mut bytes = Vec::with_capacity(cube.data.len() * 4);
            for v in &cube.data {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            std::fs::write(&path, &bytes)?;
            eprintln!("  written to {:?}", path);
        }
        None => {
            let preview: Vec<f32> = cube.data.iter().take(8).copied().collect();
            println!("  first samples: {:?}", preview);
        }
    }
    Ok(())
}

fn run_bench(
    file: PathBuf,
    codec: &str,
    entropy: &str,
    precision: f64,
    count: u64,
    seed: u64,
) -> anyhow::Result<()> {
    let mut reader = open_reader(&file, codec, entropy, precision)?;
    let coords: Vec<(i32, i32, i32)> = reader
        .index()
        .iter()
        .map(|r| (r.ix, r.iy, r.iz))
        .collect();
    if coords.is_empty() {
        anyhow::bail!("archive has no resident blocks");
    }

    let indices: Vec<usize> = {
        let mut rng = seed;
        (0..count)
            .map(|_| {
                rng = rng
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((rng >> 33) % coords.len() as u64) as usize
            })
            .collect()
    };

    eprintln!(
        "benchmarking {} random fetches across {} blocks...",
        count,
        coords.len()
    );

    let t0 = Instant::now();
    let mut latencies_us: Vec<u64> = Vec::with_capacity(count as usize);
    for &idx in &indices {
        let (ix, iy, iz) = coords[idx];
        let t = Instant::now();
        reader.fetch(ix, iy, iz)?;
        latencies_us.push(t.elapsed().as_micros() as u64);
    }
    let elapsed = t0.elapsed();
    latencies_us.sort_unstable();

    let p50 = latencies_us[latencies_us.len() / 2];
    let p95 = latencies_us[(latencies_us.len() as f64 * 0.95) as usize];
    let max = *latencies_us.last().unwrap();

    println!();
    println!("=== Random Block Access Benchmark ===");
    println!("  fetches     : {}", count);
    println!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    println!("  latency:");
    println!("    min  : {} us", latencies_us[0]);
    println!("    p50  : {} us", p50);
    println!("    p95  : {} us", p95);
    println!("    max  : {} us", max);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Write {
            output,
            blocks_x,
            blocks_y,
            blocks_z,
            wavelet,
            entropy,
            threshold,
            half_float,
            block_size,
            workers,
            skip_io,
            verbose,
        } => run_write(
            output, blocks_x, blocks_y, blocks_z, &wavelet, &entropy, threshold, half_float,
            block_size, workers, skip_io, verbose,
        ),
        Commands::Inspect { file, blocks } => run_inspect(file, blocks),
        Commands::Fetch {
            file,
            codec,
            entropy,
            precision,
            ix,
            iy,
            iz,
            output,
        } => run_fetch(file, &codec, &entropy, precision, ix, iy, iz, output),
        Commands::Bench {
            file,
            codec,
            entropy,
            precision,
            count,
            seed,
        } => run_bench(file, &codec, &entropy, precision, count, seed),
    }
}
