use crate::error::{CubezError, Result};

/// Edge length of one sample cube. Fixed at compile time, matching the
/// distilled format's "Blocksize" field, which records this constant into
/// every archive for the reader to validate against.
pub const BLOCK_EDGE: usize = 32;

/// Byte width of this crate's fixed sample type (see DESIGN.md, Open
/// Question 1). Written into the header as `sizeofReal` so the format
/// itself still documents its own sample width rather than assuming it.
pub const SIZEOF_REAL: usize = std::mem::size_of::<f32>();

/// Width used for every on-disk offset/size field ("size_t" in the
/// original sources).
pub const SIZEOF_SIZE_T: usize = std::mem::size_of::<u64>();

/// Serialized size of one [`BlockMetadata`] record.
pub const SIZEOF_BLOCK_METADATA: usize = 24;

/// Serialized size of one [`HeaderLut`] record.
pub const SIZEOF_HEADER_LUT: usize = 12;

pub const ASCII_HEADER_START: &str = "==============START-ASCI-HEADER==============";
pub const ASCII_HEADER_END: &str = "==============START-BINARY-METABLOCKS==============";
pub const BINARY_OCEAN_TITLE: &str = "==============START-BINARY-OCEAN==============\n";
pub const BINARY_LUT_TITLE: &str = "==============START-BINARY-LUT==============\n";

/// One entry in the rank-local, later file-global, block index.
///
/// Fixed 24-byte layout: six little-endian `i32` fields. `chunk_id` starts
/// rank-local during compression and is rewritten to a file-global chunk id
/// by the reader during index assembly (never by the writer — a rank does
/// not know the chunk counts of ranks before it).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockMetadata {
    pub global_block_id: i32,
    pub sub_id: i32,
    pub ix: i32,
    pub iy: i32,
    pub iz: i32,
    pub chunk_id: i32,
}

impl BlockMetadata {
    pub fn to_bytes(&self) -> [u8; SIZEOF_BLOCK_METADATA] {
        let mut buf = [0u8; SIZEOF_BLOCK_METADATA];
        buf[0..4].copy_from_slice(&self.global_block_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.sub_id.to_le_bytes());
        buf[8..12].copy_from_slice(&self.ix.to_le_bytes());
        buf[12..16].copy_from_slice(&self.iy.to_le_bytes());
        buf[16..20].copy_from_slice(&self.iz.to_le_bytes());
        buf[20..24].copy_from_slice(&self.chunk_id.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; SIZEOF_BLOCK_METADATA]) -> Self {
        Self {
            global_block_id: i32::from_le_bytes(buf[0..4].try_into().unwrap()),
            sub_id: i32::from_le_bytes(buf[4..8].try_into().unwrap()),
            ix: i32::from_le_bytes(buf[8..12].try_into().unwrap()),
            iy: i32::from_le_bytes(buf[12..16].try_into().unwrap()),
            iz: i32::from_le_bytes(buf[16..20].try_into().unwrap()),
            chunk_id: i32::from_le_bytes(buf[20..24].try_into().unwrap()),
        }
    }
}

/// Per-rank summary written near the end of the file: how many bytes this
/// rank's byte ocean occupies (including its appended chunk LUT) and how
/// many chunks it produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderLut {
    pub aggregate_bytes: u64,
    pub nchunks: i32,
}

impl HeaderLut {
    pub fn to_bytes(&self) -> [u8; SIZEOF_HEADER_LUT] {
        let mut buf = [0u8; SIZEOF_HEADER_LUT];
        buf[0..8].copy_from_slice(&self.aggregate_bytes.to_le_bytes());
        buf[8..12].copy_from_slice(&self.nchunks.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; SIZEOF_HEADER_LUT]) -> Self {
        Self {
            aggregate_bytes: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            nchunks: i32::from_le_bytes(buf[8..12].try_into().unwrap()),
        }
    }
}

/// Per-axis block/extent triples used by the ASCII header's `Blocks`,
/// `Extent`, and `SubdomainBlocks` fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triple<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T: Copy> Triple<T> {
    pub fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }
}

/// Everything recorded in the ASCII header, in the exact field order the
/// reader validates against.
#[derive(Debug, Clone)]
pub struct AsciiHeader {
    pub little_endian: bool,
    pub sizeof_real: usize,
    pub sizeof_size_t: usize,
    pub sizeof_block_metadata: usize,
    pub sizeof_header_lut: usize,
    pub sizeof_compressed_block: usize,
    pub block_edge: usize,
    pub blocks: Triple<u32>,
    pub extent: Triple<f32>,
    pub subdomain_blocks: Triple<u32>,
    pub half_float: bool,
    pub wavelets: String,
    pub wavelet_threshold: f64,
    pub encoder: String,
}

impl AsciiHeader {
    pub fn render(&self) -> String {
        let mut s = String::new();
        s.push_str(ASCII_HEADER_START);
        s.push('\n');
        s.push_str(&format!(
            "Endianess: {}\n",
            if self.little_endian { "little" } else { "big" }
        ));
        s.push_str(&format!("sizeofReal: {}\n", self.sizeof_real));
        s.push_str(&format!("sizeofsize_t: {}\n", self.sizeof_size_t));
        s.push_str(&format!(
            "sizeofBlockMetadata: {}\n",
            self.sizeof_block_metadata
        ));
        s.push_str(&format!("sizeofHeaderLUT: {}\n", self.sizeof_header_lut));
        s.push_str(&format!(
            "sizeofCompressedBlock: {}\n",
            self.sizeof_compressed_block
        ));
        s.push_str(&format!("Blocksize: {}\n", self.block_edge));
        s.push_str(&format!(
            "Blocks: {} {} {}\n",
            self.blocks.x, self.blocks.y, self.blocks.z
        ));
        s.push_str(&format!(
            "Extent: {} {} {}\n",
            self.extent.x, self.extent.y, self.extent.z
        ));
        s.push_str(&format!(
            "SubdomainBlocks: {} {} {}\n",
            self.subdomain_blocks.x, self.subdomain_blocks.y, self.subdomain_blocks.z
        ));
        s.push_str(&format!(
            "HalfFloat: {}\n",
            if self.half_float { "yes" } else { "no" }
        ));
        s.push_str(&format!("Wavelets: {}\n", self.wavelets));
        s.push_str(&format!("WaveletThreshold: {}\n", self.wavelet_threshold));
        s.push_str(&format!("Encoder: {}\n", self.encoder));
        s.push_str(ASCII_HEADER_END);
        s.push('\n');
        s
    }

    /// Parse a header string produced by [`render`] without checking it
    /// against the runtime's own constants or a configured codec/backend.
    /// Used by tools (e.g. `cubez inspect`) that want to display whatever
    /// an archive claims about itself even if the local build cannot open
    /// it for reading.
    pub fn parse_unchecked(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let first = lines.next().unwrap_or("");
        if first != ASCII_HEADER_START {
            return Err(CubezError::Corruption(
                "missing ASCII header start marker".into(),
            ));
        }

        let mut fields = std::collections::HashMap::new();
        for line in lines {
            if line == ASCII_HEADER_END {
                break;
            }
            let Some((k, v)) = line.split_once(':') else {
                continue;
            };
            fields.insert(k.trim().to_string(), v.trim().to_string());
        }

        let get = |key: &str| -> Result<&String> {
            fields
                .get(key)
                .ok_or_else(|| CubezError::Corruption(format!("missing header field {key}")))
        };
        let parse_usize = |key: &str| -> Result<usize> {
            get(key)?
                .parse::<usize>()
                .map_err(|_| CubezError::Corruption(format!("bad integer for {key}")))
        };
        let parse_triple_u32 = |key: &str| -> Result<Triple<u32>> {
            let raw = get(key)?;
            let mut it = raw.split_whitespace();
            let (x, y, z) = (it.next(), it.next(), it.next());
            match (x, y, z) {
                (Some(x), Some(y), Some(z)) => {
                    let parse_one = |s: &str| {
                        s.parse::<u32>()
                            .map_err(|_| CubezError::Corruption(format!("bad triple for {key}")))
                    };
                    Ok(Triple::new(parse_one(x)?, parse_one(y)?, parse_one(z)?))
                }
                _ => Err(CubezError::Corruption(format!("bad triple for {key}"))),
            }
        };
        let parse_triple_f32 = |key: &str| -> Result<Triple<f32>> {
            let raw = get(key)?;
            let mut it = raw.split_whitespace();
            let (x, y, z) = (it.next(), it.next(), it.next());
            match (x, y, z) {
                (Some(x), Some(y), Some(z)) => {
                    let parse_one = |s: &str| {
                        s.parse::<f32>()
                            .map_err(|_| CubezError::Corruption(format!("bad triple for {key}")))
                    };
                    Ok(Triple::new(parse_one(x)?, parse_one(y)?, parse_one(z)?))
                }
                _ => Err(CubezError::Corruption(format!("bad triple for {key}"))),
            }
        };

        let little_endian = get("Endianess")?.as_str() == "little";
        if !little_endian {
            return Err(CubezError::Configuration(
                "archive is big-endian; this build only reads little-endian archives".into(),
            ));
        }

        let header = AsciiHeader {
            little_endian,
            sizeof_real: parse_usize("sizeofReal")?,
            sizeof_size_t: parse_usize("sizeofsize_t")?,
            sizeof_block_metadata: parse_usize("sizeofBlockMetadata")?,
            sizeof_header_lut: parse_usize("sizeofHeaderLUT")?,
            sizeof_compressed_block: parse_usize("sizeofCompressedBlock")?,
            block_edge: parse_usize("Blocksize")?,
            blocks: parse_triple_u32("Blocks")?,
            extent: parse_triple_f32("Extent")?,
            subdomain_blocks: parse_triple_u32("SubdomainBlocks")?,
            half_float: get("HalfFloat")?.as_str() == "yes",
            wavelets: get("Wavelets")?.clone(),
            wavelet_threshold: get("WaveletThreshold")?
                .parse::<f64>()
                .map_err(|_| CubezError::Corruption("bad WaveletThreshold".into()))?,
            encoder: get("Encoder")?.clone(),
        };

        Ok(header)
    }

    /// Parse a header string and validate it against the runtime's own
    /// constants and configured codec/backend names. This is what
    /// [`crate::reader::ArchiveReader::open`] uses: a mismatch here means
    /// the runtime cannot correctly decode the archive, not just that it
    /// looks unusual.
    pub fn parse(text: &str, expect_wavelets: &str, expect_encoder: &str) -> Result<Self> {
        let header = Self::parse_unchecked(text)?;

        if header.sizeof_real != SIZEOF_REAL {
            return Err(CubezError::Configuration(format!(
                "sizeofReal mismatch: archive has {}, runtime expects {}",
                header.sizeof_real, SIZEOF_REAL
            )));
        }
        if header.block_edge != BLOCK_EDGE {
            return Err(CubezError::Configuration(format!(
                "Blocksize mismatch: archive has {}, runtime expects {}",
                header.block_edge, BLOCK_EDGE
            )));
        }
        if header.wavelets != expect_wavelets {
            return Err(CubezError::Configuration(format!(
                "Wavelets mismatch: archive has '{}', runtime was given codec '{}'",
                header.wavelets, expect_wavelets
            )));
        }
        if header.encoder != expect_encoder {
            return Err(CubezError::Configuration(format!(
                "Encoder mismatch: archive has '{}', runtime was given backend '{}'",
                header.encoder, expect_encoder
            )));
        }

        Ok(header)
    }
}
