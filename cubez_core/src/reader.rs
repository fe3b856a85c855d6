use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use crate::codec::{Cube, CodecPlugin};
use crate::entropy::EntropyBackend;
use crate::error::{CubezError, Result};
use crate::format::{
    AsciiHeader, BlockMetadata, HeaderLut, BINARY_LUT_TITLE, BINARY_OCEAN_TITLE,
    SIZEOF_BLOCK_METADATA, SIZEOF_HEADER_LUT, SIZEOF_SIZE_T,
};
use crate::ocean::parse_chunk_lut;
use crate::pool::PoolSizing;

/// Random-access reader (SPEC_FULL.md §4.8): performs the sequential
/// index-assembly pass once on open, then serves [`fetch`](Self::fetch)
/// calls by seeking directly to the owning chunk and decoding only that
/// chunk's bytes.
pub struct ArchiveReader {
    file: File,
    pub header: AsciiHeader,
    index: Vec<BlockMetadata>,
    coord_lookup: HashMap<(i32, i32, i32), usize>,
    global_chunks: Vec<u64>,
    codec: Arc<dyn CodecPlugin>,
    entropy: Arc<dyn EntropyBackend>,
    precision: f64,
    pool: PoolSizing,
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("header", &self.header)
            .field("index_len", &self.index.len())
            .field("global_chunks_len", &self.global_chunks.len())
            .field("codec", &self.codec.name())
            .field("entropy", &self.entropy.name())
            .field("precision", &self.precision)
            .field("pool", &self.pool)
            .finish()
    }
}

impl ArchiveReader {
    pub fn open(
        path: impl AsRef<Path>,
        codec: Arc<dyn CodecPlugin>,
        entropy: Arc<dyn EntropyBackend>,
        precision: f64,
    ) -> Result<Self> {
        let mut file = File::open(path)?;
        let (global_header_displacement, header_text) = read_mini_header_and_text(&mut file)?;
        let header = AsciiHeader::parse(&header_text, codec.name(), entropy.name())?;

        let blocks_per_rank = (header.subdomain_blocks.x as u64
            * header.subdomain_blocks.y as u64
            * header.subdomain_blocks.z as u64) as usize;
        let total_blocks = (header.blocks.x as u64 * header.blocks.y as u64 * header.blocks.z as u64)
            as usize;
        if blocks_per_rank == 0 || total_blocks % blocks_per_rank != 0 {
            return Err(CubezError::Corruption(
                "Blocks is not an integer multiple of SubdomainBlocks".into(),
            ));
        }
        let nranks = total_blocks / blocks_per_rank;

        let header_end = global_header_displacement + header_text.len() as u64;
        let metadata_bytes_per_rank = (blocks_per_rank * SIZEOF_BLOCK_METADATA) as u64;

        file.seek(SeekFrom::Start(header_end))?;
        let mut index_bytes = vec![0u8; (nranks as u64 * metadata_bytes_per_rank) as usize];
        file.read_exact(&mut index_bytes)?;
        let mut index: Vec<BlockMetadata> = index_bytes
            .chunks_exact(SIZEOF_BLOCK_METADATA)
            .map(|c| BlockMetadata::from_bytes(&c.try_into().unwrap()))
            .collect();

        let lut_title_start = header_end + nranks as u64 * metadata_bytes_per_rank;
        file.seek(SeekFrom::Start(lut_title_start))?;
        let mut title_buf = vec![0u8; BINARY_LUT_TITLE.len()];
        file.read_exact(&mut title_buf)?;
        if title_buf != BINARY_LUT_TITLE.as_bytes() {
            return Err(CubezError::Corruption(
                "binary LUT title marker mismatch".into(),
            ));
        }

        let lut_start = lut_title_start + BINARY_LUT_TITLE.len() as u64;
        file.seek(SeekFrom::Start(lut_start))?;
        let mut header_luts = Vec::with_capacity(nranks);
        for _ in 0..nranks {
            let mut buf = [0u8; SIZEOF_HEADER_LUT];
            file.read_exact(&mut buf)?;
            header_luts.push(HeaderLut::from_bytes(&buf));
        }

        let mini_header_end = SIZEOF_SIZE_T as u64 + BINARY_OCEAN_TITLE.len() as u64;

        let mut global_chunks: Vec<u64> = Vec::new();
        let mut rank_ocean_base = mini_header_end;
        let mut chunks_before_rank = 0i32;

        for (rank, lut) in header_luts.iter().enumerate() {
            let nchunks = lut.nchunks as usize;
            let chunk_lut_bytes_len = (nchunks * SIZEOF_SIZE_T) as u64;
            if chunk_lut_bytes_len > lut.aggregate_bytes {
                return Err(CubezError::Corruption(format!(
                    "rank {rank} chunk LUT larger than its aggregate byte count"
                )));
            }
            let chunk_lut_file_offset =
                rank_ocean_base + lut.aggregate_bytes - chunk_lut_bytes_len;
            file.seek(SeekFrom::Start(chunk_lut_file_offset))?;
            let mut buf = vec![0u8; chunk_lut_bytes_len as usize];
            file.read_exact(&mut buf)?;
            let local_offsets = parse_chunk_lut(&buf, nchunks);

            let mut prev = 0u64;
            for (i, local) in local_offsets.iter().enumerate() {
                if i > 0 && *local <= prev {
                    return Err(CubezError::Corruption(format!(
                        "rank {rank} chunk LUT offsets are not strictly increasing"
                    )));
                }
                prev = *local;
                global_chunks.push(rank_ocean_base + local);
            }

            for rec in &mut index[rank * blocks_per_rank..(rank + 1) * blocks_per_rank] {
                rec.chunk_id += chunks_before_rank;
            }

            chunks_before_rank += lut.nchunks;
            rank_ocean_base += lut.aggregate_bytes;
        }
        global_chunks.push(global_header_displacement);

        let mut coord_lookup = HashMap::with_capacity(index.len());
        for (pos, rec) in index.iter().enumerate() {
            coord_lookup.insert((rec.ix, rec.iy, rec.iz), pos);
        }

        let pool = PoolSizing::new(codec.max_output_bytes());

        Ok(Self {
            file,
            header,
            index,
            coord_lookup,
            global_chunks,
            codec,
            entropy,
            precision,
            pool,
        })
    }

    pub fn block_count(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &[BlockMetadata] {
        &self.index
    }

    /// Random-access fetch (SPEC_FULL.md §4.8): decode and return exactly
    /// the block at `(ix, iy, iz)`, touching only its owning chunk.
    pub fn fetch(&mut self, ix: i32, iy: i32, iz: i32) -> Result<Cube> {
        let pos = *self
            .coord_lookup
            .get(&(ix, iy, iz))
            .ok_or_else(|| CubezError::Precondition(format!("no resident block at ({ix},{iy},{iz})")))?;
        self.fetch_by_position(pos)
    }

    fn fetch_by_position(&mut self, pos: usize) -> Result<Cube> {
        let meta = self.index[pos];
        let chunk_id = meta.chunk_id as usize;
        if chunk_id + 1 >= self.global_chunks.len() {
            return Err(CubezError::Corruption(format!(
                "chunk id {chunk_id} out of range"
            )));
        }
        let start = self.global_chunks[chunk_id];
        let end = self.global_chunks[chunk_id + 1];
        if end <= start {
            return Err(CubezError::Corruption(format!(
                "chunk {chunk_id} has non-positive extent"
            )));
        }

        self.file.seek(SeekFrom::Start(start))?;
        let mut chunk_bytes = vec![0u8; (end - start) as usize];
        self.file.read_exact(&mut chunk_bytes)?;

        let out_cap = self.pool.buffer_size.max(4 * 1024 * 1024);
        let decoded = self.entropy.decode(&chunk_bytes, out_cap)?;

        let mut cursor = 0usize;
        let target_sub_id = meta.sub_id as usize;
        for sub_id in 0.. {
            if cursor + 4 > decoded.len() {
                return Err(CubezError::Corruption(
                    "truncated chunk: missing length prefix".into(),
                ));
            }
            let len = u32::from_le_bytes(decoded[cursor..cursor + 4].try_into().unwrap()) as usize;
            cursor += 4;
            if cursor + len > decoded.len() {
                return Err(CubezError::Corruption(
                    "truncated chunk: payload shorter than declared length".into(),
                ));
            }
            let payload = &decoded[cursor..cursor + len];
            if sub_id == target_sub_id {
                return self
                    .codec
                    .decompress(payload, self.header.block_edge, self.precision);
            }
            cursor += len;
        }
        unreachable!()
    }

    /// Sequential scan over every resident block, in index order. Used to
    /// verify random access and sequential decode agree (SPEC_FULL.md P7).
    pub fn scan_all(&mut self) -> Result<Vec<(BlockMetadata, Cube)>> {
        let mut out = Vec::with_capacity(self.index.len());
        for pos in 0..self.index.len() {
            let meta = self.index[pos];
            let cube = self.fetch_by_position(pos)?;
            out.push((meta, cube));
        }
        Ok(out)
    }
}

/// Reads just enough of an archive to return its ASCII header, without
/// validating it against any configured codec or entropy backend. Used by
/// tools that want to display what an archive claims about itself before
/// deciding how (or whether) to open it for real reads.
pub fn peek_header(path: impl AsRef<Path>) -> Result<AsciiHeader> {
    let mut file = File::open(path)?;
    let (_, header_text) = read_mini_header_and_text(&mut file)?;
    AsciiHeader::parse_unchecked(&header_text)
}

fn read_mini_header_and_text(file: &mut File) -> Result<(u64, String)> {
    let mut disp_buf = [0u8; SIZEOF_SIZE_T];
    file.read_exact(&mut disp_buf)?;
    let global_header_displacement = u64::from_le_bytes(disp_buf);
    let header_text = read_ascii_header_text(file, global_header_displacement)?;
    Ok((global_header_displacement, header_text))
}

fn read_ascii_header_text(file: &mut File, start: u64) -> Result<String> {
    let file_len = file.metadata()?.len();
    if start >= file_len {
        return Err(CubezError::Corruption(
            "global header displacement is beyond end of file".into(),
        ));
    }
    let mut window = 4096usize;
    loop {
        let to_read = (window as u64).min(file_len - start) as usize;
        file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; to_read];
        file.read_exact(&mut buf)?;
        if let Ok(text) = std::str::from_utf8(&buf) {
            if let Some(pos) = text.find(crate::format::ASCII_HEADER_END) {
                let mut end = pos + crate::format::ASCII_HEADER_END.len();
                if text.as_bytes().get(end) == Some(&b'\n') {
                    end += 1;
                }
                return Ok(text[..end].to_string());
            }
        }
        if to_read as u64 >= file_len - start {
            return Err(CubezError::Corruption(
                "ASCII header end marker not found before end of file".into(),
            ));
        }
        window *= 2;
    }
}
