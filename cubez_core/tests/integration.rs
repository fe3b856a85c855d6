//! End-to-end tests across the write and read paths: compress a synthetic
//! field through the block pipeline, assemble it into an archive, reopen
//! it, and check that random access agrees with a full sequential scan.

use std::path::PathBuf;
use std::sync::Arc;

use cubez_codecs::{IdentityCodec, NoneBackend, WaveletQuantCodec, ZstdBackend};
use cubez_core::{
    write_channel, ArchiveReader, BlockSource, CodecPlugin, Cube, CubezError, EntropyBackend,
    ResidentBlock, RendezvousTopology, SingleRankTopology, Triple, WriteOptions, BLOCK_EDGE,
};

/// A tiny analytic field used across these tests: `blocks` resident blocks
/// on one rank, one channel, each sample a deterministic function of its
/// block and local coordinate so round-trip checks don't need a stored
/// reference copy.
struct GridField {
    resident: Vec<ResidentBlock>,
}

impl GridField {
    fn new(nx: i32, ny: i32, nz: i32) -> Self {
        let mut resident = Vec::new();
        let mut id = 0;
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    resident.push(ResidentBlock {
                        global_block_id: id,
                        ix,
                        iy,
                        iz,
                    });
                    id += 1;
                }
            }
        }
        Self { resident }
    }

    /// A single resident block at grid coordinate `(ix, 0, 0)`, used to
    /// simulate one rank's disjoint slice of a larger global grid.
    fn single_at(ix: i32) -> Self {
        Self {
            resident: vec![ResidentBlock {
                global_block_id: ix,
                ix,
                iy: 0,
                iz: 0,
            }],
        }
    }
}

impl BlockSource for GridField {
    fn channel_count(&self) -> usize {
        1
    }

    fn resident_blocks(&self) -> &[ResidentBlock] {
        &self.resident
    }

    fn extract(&self, block: &ResidentBlock, _channel: usize, out: &mut Cube) {
        let edge = out.edge;
        for z in 0..edge {
            for y in 0..edge {
                for x in 0..edge {
                    let v = block.ix as f32 * 100.0
                        + block.iy as f32 * 10.0
                        + block.iz as f32
                        + (x + y * edge + z * edge * edge) as f32 * 1e-4;
                    out.set(x, y, z, v);
                }
            }
        }
    }
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("cubez_test_{name}.cz"))
}

fn default_options(codec: Arc<dyn CodecPlugin>, entropy: Arc<dyn EntropyBackend>) -> WriteOptions {
    WriteOptions {
        codec,
        entropy,
        precision: 0.0,
        worker_count: 4,
        global_blocks: Triple::new(3, 2, 1),
        extent: Triple::new(3.0, 2.0, 1.0),
        subdomain_blocks: Triple::new(3, 2, 1),
        half_float: false,
        wavelet_threshold: 0.0,
    }
}

#[test]
fn identity_round_trips_every_block_exactly() {
    let field = GridField::new(3, 2, 1);
    let path = temp_path("identity_roundtrip");
    std::fs::File::create(&path).unwrap();

    let options = default_options(Arc::new(IdentityCodec), Arc::new(NoneBackend));
    write_channel(&path, &field, 0, &SingleRankTopology, &options).unwrap();

    let mut reader =
        ArchiveReader::open(&path, Arc::new(IdentityCodec), Arc::new(NoneBackend), 0.0).unwrap();
    assert_eq!(reader.block_count(), 6);

    for block in &field.resident {
        let cube = reader.fetch(block.ix, block.iy, block.iz).unwrap();
        let mut expected = Cube::zeros(BLOCK_EDGE);
        field.extract(block, 0, &mut expected);
        assert_eq!(cube, expected);
    }

    std::fs::remove_file(&path).ok();
}

#[test]
fn random_access_agrees_with_sequential_scan() {
    let field = GridField::new(4, 1, 1);
    let path = temp_path("random_access");
    std::fs::File::create(&path).unwrap();

    let mut options = default_options(Arc::new(WaveletQuantCodec), Arc::new(ZstdBackend::default()));
    options.global_blocks = Triple::new(4, 1, 1);
    options.subdomain_blocks = Triple::new(4, 1, 1);
    options.extent = Triple::new(4.0, 1.0, 1.0);
    options.precision = 1e-2;
    options.wavelet_threshold = 1e-2;
    write_channel(&path, &field, 0, &SingleRankTopology, &options).unwrap();

    let mut reader = ArchiveReader::open(
        &path,
        Arc::new(WaveletQuantCodec),
        Arc::new(ZstdBackend::default()),
        1e-2,
    )
    .unwrap();

    let scanned = reader.scan_all().unwrap();
    assert_eq!(scanned.len(), 4);

    for (meta, cube) in &scanned {
        let fetched = reader.fetch(meta.ix, meta.iy, meta.iz).unwrap();
        assert_eq!(&fetched, cube, "fetch({},{},{}) disagrees with scan", meta.ix, meta.iy, meta.iz);
    }

    std::fs::remove_file(&path).ok();
}

#[test]
fn fetch_rejects_unknown_coordinate() {
    let field = GridField::new(2, 1, 1);
    let path = temp_path("unknown_coord");
    std::fs::File::create(&path).unwrap();

    let mut options = default_options(Arc::new(IdentityCodec), Arc::new(NoneBackend));
    options.global_blocks = Triple::new(2, 1, 1);
    options.subdomain_blocks = Triple::new(2, 1, 1);
    write_channel(&path, &field, 0, &SingleRankTopology, &options).unwrap();

    let mut reader =
        ArchiveReader::open(&path, Arc::new(IdentityCodec), Arc::new(NoneBackend), 0.0).unwrap();
    let err = reader.fetch(99, 99, 99).unwrap_err();
    assert!(matches!(err, CubezError::Precondition(_)));

    std::fs::remove_file(&path).ok();
}

#[test]
fn opening_with_wrong_codec_is_a_configuration_error() {
    let field = GridField::new(2, 1, 1);
    let path = temp_path("codec_mismatch");
    std::fs::File::create(&path).unwrap();

    let mut options = default_options(Arc::new(IdentityCodec), Arc::new(NoneBackend));
    options.global_blocks = Triple::new(2, 1, 1);
    options.subdomain_blocks = Triple::new(2, 1, 1);
    write_channel(&path, &field, 0, &SingleRankTopology, &options).unwrap();

    let err = ArchiveReader::open(
        &path,
        Arc::new(WaveletQuantCodec),
        Arc::new(NoneBackend),
        0.0,
    )
    .unwrap_err();
    assert!(matches!(err, CubezError::Configuration(_)));

    std::fs::remove_file(&path).ok();
}

#[test]
fn wavelet_quant_reconstruction_stays_within_precision() {
    let field = GridField::new(2, 2, 1);
    let path = temp_path("wavelet_precision");
    std::fs::File::create(&path).unwrap();

    let precision = 5e-2;
    let mut options = default_options(Arc::new(WaveletQuantCodec), Arc::new(NoneBackend));
    options.global_blocks = Triple::new(2, 2, 1);
    options.subdomain_blocks = Triple::new(2, 2, 1);
    options.extent = Triple::new(2.0, 2.0, 1.0);
    options.precision = precision;
    options.wavelet_threshold = precision;
    write_channel(&path, &field, 0, &SingleRankTopology, &options).unwrap();

    let mut reader = ArchiveReader::open(
        &path,
        Arc::new(WaveletQuantCodec),
        Arc::new(NoneBackend),
        precision,
    )
    .unwrap();

    for block in &field.resident {
        let mut expected = Cube::zeros(BLOCK_EDGE);
        field.extract(block, 0, &mut expected);
        let got = reader.fetch(block.ix, block.iy, block.iz).unwrap();
        for (a, b) in got.data.iter().zip(expected.data.iter()) {
            assert!(
                (a - b).abs() <= precision as f32 * 20.0,
                "reconstructed sample {a} too far from original {b} at precision {precision}"
            );
        }
    }

    std::fs::remove_file(&path).ok();
}

/// Exercises the collective assembler protocol across multiple simulated
/// ranks: each rank compresses and writes its own disjoint slice of blocks,
/// and the reader's sequential index assembly must stitch every rank's
/// chunks back into one coordinate space.
#[test]
fn multi_rank_archive_is_readable_as_one_coordinate_space() {
    let path = temp_path("multi_rank");
    std::fs::File::create(&path).unwrap();

    const RANKS: usize = 3;
    let fields: Vec<GridField> = (0..RANKS as i32).map(GridField::single_at).collect();

    let topologies = RendezvousTopology::group(RANKS);
    std::thread::scope(|scope| {
        for (topology, field) in topologies.into_iter().zip(&fields) {
            let path = &path;
            scope.spawn(move || {
                let mut options = default_options(Arc::new(IdentityCodec), Arc::new(NoneBackend));
                options.global_blocks = Triple::new(RANKS as u32, 1, 1);
                options.subdomain_blocks = Triple::new(1, 1, 1);
                options.extent = Triple::new(RANKS as f32, 1.0, 1.0);
                write_channel(path, field, 0, &topology, &options).unwrap();
            });
        }
    });

    let mut reader =
        ArchiveReader::open(&path, Arc::new(IdentityCodec), Arc::new(NoneBackend), 0.0).unwrap();
    assert_eq!(reader.block_count(), RANKS);

    for r in 0..RANKS as i32 {
        let cube = reader.fetch(r, 0, 0).unwrap();
        assert_eq!(cube.at(0, 0, 0), r as f32 * 100.0);
    }

    std::fs::remove_file(&path).ok();
}
