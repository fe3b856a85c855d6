use std::fs::File;
use std::path::Path;

use crate::error::{CubezError, Result};
use crate::format::{
    AsciiHeader, HeaderLut, BINARY_LUT_TITLE, BINARY_OCEAN_TITLE, SIZEOF_BLOCK_METADATA,
    SIZEOF_HEADER_LUT, SIZEOF_SIZE_T,
};
use crate::index::BlockIndex;
use crate::ocean::ByteOcean;
use crate::topology::Topology;

#[cfg(unix)]
fn pwrite_all(file: &File, offset: u64, buf: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn pwrite_all(file: &File, offset: u64, buf: &[u8]) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut written = 0usize;
    while written < buf.len() {
        let n = file.seek_write(&buf[written..], offset + written as u64)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "failed to write whole buffer",
            ));
        }
        written += n;
    }
    Ok(())
}

/// Collective File Assembler (SPEC_FULL.md §4.7). Every rank calls this
/// with its own finalized byte ocean (chunk LUT already appended, see
/// DESIGN.md Open Question (a)) and block index; only rank 0 writes the
/// rank-independent sections (mini-header, ASCII header, LUT title).
///
/// Each rank opens its own handle to `path` and writes at explicit
/// positions (self-only open, DESIGN.md Open Question 2) — the file
/// itself must already exist and be writable before any rank calls this,
/// since creating it is outside the collective's scope here.
pub fn assemble(
    path: &Path,
    topology: &dyn Topology,
    ocean: &ByteOcean,
    nchunks: usize,
    index: &BlockIndex,
    header_template: impl FnOnce() -> AsciiHeader,
) -> Result<()> {
    let file = File::options().write(true).open(path)?;

    let mini_header_size = (SIZEOF_SIZE_T + BINARY_OCEAN_TITLE.len()) as u64;
    let written_bytes = ocean.written_bytes();

    // Step 2: exclusive prefix sum places this rank's byte ocean.
    let myfileoffset = topology.exclusive_prefix_sum(written_bytes);
    pwrite_all(&file, mini_header_size + myfileoffset, ocean.as_bytes())?;

    let total_ocean_bytes =
        topology.broadcast(myfileoffset + written_bytes, topology.size() - 1);

    let global_header_displacement = mini_header_size + total_ocean_bytes;

    if topology.rank() == 0 {
        let mut mini = Vec::with_capacity(mini_header_size as usize);
        mini.extend_from_slice(&global_header_displacement.to_le_bytes());
        mini.extend_from_slice(BINARY_OCEAN_TITLE.as_bytes());
        pwrite_all(&file, 0, &mini)?;
    }

    // header_template is a pure closure over fields of the shared
    // &WriteOptions every rank holds identically, so every rank renders
    // the same header text locally instead of broadcasting its length.
    let header_text = header_template().render();
    let header_len = header_text.len() as u64;

    if topology.rank() == 0 {
        pwrite_all(&file, global_header_displacement, header_text.as_bytes())?;
    }

    let header_end = global_header_displacement + header_len;
    let metadata_bytes_per_rank = index.len() as u64 * SIZEOF_BLOCK_METADATA as u64;

    pwrite_all(
        &file,
        header_end + topology.rank() as u64 * metadata_bytes_per_rank,
        &index.to_bytes(),
    )?;

    let lut_title_start =
        header_end + topology.size() as u64 * metadata_bytes_per_rank;
    if topology.rank() == 0 {
        pwrite_all(&file, lut_title_start, BINARY_LUT_TITLE.as_bytes())?;
    }

    let lut_start = lut_title_start + BINARY_LUT_TITLE.len() as u64;
    let header_lut = HeaderLut {
        aggregate_bytes: written_bytes,
        nchunks: nchunks as i32,
    };
    pwrite_all(
        &file,
        lut_start + topology.rank() as u64 * SIZEOF_HEADER_LUT as u64,
        &header_lut.to_bytes(),
    )?;

    Ok(())
}

/// Precondition check for SPEC_FULL.md §4.7 step 5's rank-homogeneous
/// layout: every rank must own the same number of resident blocks.
pub fn check_homogeneous_layout(per_rank_block_counts: &[usize]) -> Result<()> {
    if let Some(first) = per_rank_block_counts.first() {
        if per_rank_block_counts.iter().any(|&n| n != *first) {
            return Err(CubezError::Precondition(format!(
                "ranks have differing resident block counts {:?}; this archive layout requires uniform counts",
                per_rank_block_counts
            )));
        }
    }
    Ok(())
}
