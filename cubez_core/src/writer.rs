use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use crate::codec::CodecPlugin;
use crate::entropy::EntropyBackend;
use crate::error::Result;
use crate::format::{AsciiHeader, Triple, SIZEOF_BLOCK_METADATA, SIZEOF_HEADER_LUT, SIZEOF_REAL};
use crate::pipeline::{compress_channel, PipelineConfig};
use crate::streamer::BlockSource;
use crate::topology::Topology;

/// Knobs that do not change per channel: the codec/entropy pair, the
/// precision target passed through to the codec, worker count, and the
/// domain geometry recorded into the ASCII header.
pub struct WriteOptions {
    pub codec: Arc<dyn CodecPlugin>,
    pub entropy: Arc<dyn EntropyBackend>,
    pub precision: f64,
    pub worker_count: usize,
    pub global_blocks: Triple<u32>,
    pub extent: Triple<f32>,
    pub subdomain_blocks: Triple<u32>,
    pub half_float: bool,
    pub wavelet_threshold: f64,
}

/// Top-level write entry point (SPEC_FULL.md §4.10): runs the Block
/// Pipeline for one channel, then the File Assembler, producing one
/// complete, self-describing archive at `path`. One archive holds one
/// channel's data; a multi-channel source is written with one call per
/// channel, each to its own path (see [`write_all_channels`]).
///
/// `path` must already exist and be writable by every rank in `topology`
/// before this is called (DESIGN.md, Open Question 2) — this function
/// does not create it, since a collective create race across ranks has
/// no single owner to resolve it safely.
pub fn write_channel(
    path: &Path,
    source: &dyn BlockSource,
    channel: usize,
    topology: &dyn Topology,
    options: &WriteOptions,
) -> Result<()> {
    let config = PipelineConfig {
        codec: options.codec.clone(),
        entropy: options.entropy.clone(),
        precision: options.precision,
        worker_count: options.worker_count,
    };

    let (mut ocean, index) = compress_channel(source, channel, &config)?;
    let nchunks = ocean.finalize_chunk_lut();

    let codec_name = options.codec.name();
    let entropy_name = options.entropy.name();
    let max_output_bytes = options.codec.max_output_bytes();
    let header_template = move || AsciiHeader {
        little_endian: true,
        sizeof_real: SIZEOF_REAL,
        sizeof_size_t: std::mem::size_of::<u64>(),
        sizeof_block_metadata: SIZEOF_BLOCK_METADATA,
        sizeof_header_lut: SIZEOF_HEADER_LUT,
        sizeof_compressed_block: max_output_bytes,
        block_edge: crate::format::BLOCK_EDGE,
        blocks: options.global_blocks,
        extent: options.extent,
        subdomain_blocks: options.subdomain_blocks,
        half_float: options.half_float,
        wavelets: codec_name.to_string(),
        wavelet_threshold: options.wavelet_threshold,
        encoder: entropy_name.to_string(),
    };

    crate::assembler::assemble(path, topology, &ocean, nchunks, &index, header_template)
}

/// Creates `path` (truncating any existing contents) and writes every
/// channel of `source` to it in turn, one channel per call to
/// [`write_channel`]. `path_for_channel` maps a channel index to the
/// archive path it should be written to, since each channel is its own
/// self-describing archive.
pub fn write_all_channels(
    source: &dyn BlockSource,
    topology: &dyn Topology,
    options: &WriteOptions,
    path_for_channel: impl Fn(usize) -> std::path::PathBuf,
) -> Result<()> {
    for channel in 0..source.channel_count() {
        let path = path_for_channel(channel);
        File::create(&path)?;
        write_channel(&path, source, channel, topology, options)?;
    }
    Ok(())
}
