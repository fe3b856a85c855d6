pub mod assembler;
pub mod codec;
pub mod entropy;
pub mod error;
pub mod format;
pub mod index;
pub mod ocean;
pub mod pipeline;
pub mod pool;
pub mod reader;
pub mod streamer;
pub mod topology;
pub mod writer;

pub use codec::{CodecPlugin, Cube};
pub use entropy::{check_cap, EntropyBackend};
pub use error::{CubezError, Result};
pub use format::{
    AsciiHeader, BlockMetadata, HeaderLut, Triple, BLOCK_EDGE, SIZEOF_BLOCK_METADATA,
    SIZEOF_HEADER_LUT, SIZEOF_REAL, SIZEOF_SIZE_T,
};
pub use index::BlockIndex;
pub use ocean::{parse_chunk_lut, ByteOcean};
pub use pipeline::{compress_channel, PipelineConfig};
pub use pool::PoolSizing;
pub use reader::{peek_header, ArchiveReader};
pub use streamer::{BlockSource, ResidentBlock};
pub use topology::{RendezvousTopology, SingleRankTopology, Topology};
pub use writer::{write_all_channels, write_channel, WriteOptions};
