use crate::codec::{Cube, CodecPlugin};
use crate::entropy::{check_cap, EntropyBackend};
use crate::error::Result;
use crate::format::{BlockMetadata, BLOCK_EDGE};
use crate::index::BlockIndex;
use crate::ocean::ByteOcean;
use crate::pool::PoolSizing;
use crate::streamer::BlockSource;

/// Knobs for one archive write, shared by every worker.
pub struct PipelineConfig {
    pub codec: std::sync::Arc<dyn CodecPlugin>,
    pub entropy: std::sync::Arc<dyn EntropyBackend>,
    pub precision: f64,
    pub worker_count: usize,
}

/// Runs the Block Pipeline (SPEC_FULL.md §4.4) for one channel: a static,
/// disjoint work split of the resident block set across `worker_count`
/// `std::thread::scope` workers (not a work-stealing pool, so the split
/// stays exactly as static as required), each compressing its
/// blocks, buffering them, and flushing through the entropy encoder into
/// the shared [`ByteOcean`] whenever its buffer nears capacity.
///
/// Returns the rank-local byte ocean and the dense block index (one
/// record per resident block, in `source.resident_blocks()` order).
pub fn compress_channel(
    source: &dyn BlockSource,
    channel: usize,
    config: &PipelineConfig,
) -> Result<(ByteOcean, BlockIndex)> {
    let blocks = source.resident_blocks();
    let pool = PoolSizing::new(config.codec.max_output_bytes());
    let ocean = ByteOcean::new(blocks.len() * BLOCK_EDGE.pow(3) * 4 + 4 * 1024 * 1024);
    let mut index_records = vec![BlockMetadata::default(); blocks.len()];

    let worker_count = config.worker_count.max(1).min(blocks.len().max(1));
    let chunk_len = ((blocks.len() + worker_count - 1) / worker_count).max(1);

    let mut remaining_blocks = blocks;
    let mut remaining_index = index_records.as_mut_slice();
    let mut slices: Vec<(usize, &[crate::streamer::ResidentBlock], &mut [BlockMetadata])> =
        Vec::new();
    let mut base = 0usize;
    while !remaining_blocks.is_empty() {
        let take = chunk_len.min(remaining_blocks.len());
        let (b_head, b_tail) = remaining_blocks.split_at(take);
        let (i_head, i_tail) = remaining_index.split_at_mut(take);
        slices.push((base, b_head, i_head));
        remaining_blocks = b_tail;
        remaining_index = i_tail;
        base += take;
    }

    let error: std::sync::Mutex<Option<crate::error::CubezError>> = std::sync::Mutex::new(None);

    std::thread::scope(|scope| {
        for (base, worker_blocks, worker_index) in slices {
            let ocean = &ocean;
            let error = &error;
            scope.spawn(move || {
                if let Err(e) = run_worker(source, channel, config, &pool, base, worker_blocks, worker_index, ocean)
                {
                    let mut slot = error.lock().unwrap();
                    if slot.is_none() {
                        *slot = Some(e);
                    }
                }
            });
        }
    });

    if let Some(e) = error.into_inner().unwrap() {
        return Err(e);
    }

    let mut index = BlockIndex::with_capacity(index_records.len());
    for r in index_records.drain(..) {
        index.push(r);
    }
    Ok((ocean, index))
}

struct HotBlock {
    local_position: usize,
    global_block_id: i32,
    ix: i32,
    iy: i32,
    iz: i32,
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    source: &dyn BlockSource,
    channel: usize,
    config: &PipelineConfig,
    pool: &PoolSizing,
    base: usize,
    worker_blocks: &[crate::streamer::ResidentBlock],
    worker_index: &mut [BlockMetadata],
    ocean: &ByteOcean,
) -> Result<()> {
    let mut buffer: Vec<u8> = Vec::with_capacity(pool.buffer_size);
    let mut hotblocks: Vec<HotBlock> = Vec::with_capacity(pool.entries_per_buffer);
    let mut cube = Cube::zeros(BLOCK_EDGE);

    for (i, block) in worker_blocks.iter().enumerate() {
        source.extract(block, channel, &mut cube);
        let payload = config.codec.compress(&cube, config.precision)?;

        buffer.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buffer.extend_from_slice(&payload);
        hotblocks.push(HotBlock {
            local_position: base + i,
            global_block_id: block.global_block_id,
            ix: block.ix,
            iy: block.iy,
            iz: block.iz,
        });

        if buffer.len() >= pool.alert || hotblocks.len() == pool.entries_per_buffer {
            flush(&mut buffer, &mut hotblocks, config, pool, ocean, worker_index, base)?;
        }
    }

    if !buffer.is_empty() {
        flush(&mut buffer, &mut hotblocks, config, pool, ocean, worker_index, base)?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn flush(
    buffer: &mut Vec<u8>,
    hotblocks: &mut Vec<HotBlock>,
    config: &PipelineConfig,
    pool: &PoolSizing,
    ocean: &ByteOcean,
    worker_index: &mut [BlockMetadata],
    base: usize,
) -> Result<()> {
    let cap = 2 * pool.buffer_size;
    let encoded = config.entropy.encode(buffer, cap)?;
    check_cap(&encoded, cap)?;

    let (dst_offset, chunk_id) = ocean.reserve(encoded.len());
    ocean.write_at(dst_offset, &encoded);

    for (sub_id, hb) in hotblocks.iter().enumerate() {
        worker_index[hb.local_position - base] = BlockMetadata {
            global_block_id: hb.global_block_id,
            sub_id: sub_id as i32,
            ix: hb.ix,
            iy: hb.iy,
            iz: hb.iz,
            chunk_id: chunk_id as i32,
        };
    }

    buffer.clear();
    hotblocks.clear();
    Ok(())
}
