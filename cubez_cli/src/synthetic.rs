//! A synthetic [`BlockSource`] standing in for the external grid
//! collaborator (SPEC_FULL.md §1): a deterministic analytic field sampled
//! onto a block-structured grid, used by the CLI's `write` subcommand and
//! by the demo binary when no real simulation output is available.

use cubez_core::{BlockSource, Cube, ResidentBlock, BLOCK_EDGE};

/// A single-rank synthetic field of `blocks_x * blocks_y * blocks_z` blocks,
/// one channel, sampling `f(x, y, z) = sin(x) * cos(y) * sin(z) + noise`
/// over the unit cube. Deterministic: the same block always produces the
/// same samples, so round-trip tests don't need to persist a reference.
pub struct SyntheticField {
    blocks_x: u32,
    blocks_y: u32,
    blocks_z: u32,
    resident: Vec<ResidentBlock>,
}

impl SyntheticField {
    pub fn new(blocks_x: u32, blocks_y: u32, blocks_z: u32) -> Self {
        let mut resident = Vec::with_capacity((blocks_x * blocks_y * blocks_z) as usize);
        let mut global_block_id = 0i32;
        for iz in 0..blocks_z as i32 {
            for iy in 0..blocks_y as i32 {
                for ix in 0..blocks_x as i32 {
                    resident.push(ResidentBlock {
                        global_block_id,
                        ix,
                        iy,
                        iz,
                    });
                    global_block_id += 1;
                }
            }
        }
        Self {
            blocks_x,
            blocks_y,
            blocks_z,
            resident,
        }
    }

    pub fn extent(&self) -> (f32, f32, f32) {
        (
            self.blocks_x as f32,
            self.blocks_y as f32,
            self.blocks_z as f32,
        )
    }

    pub fn global_blocks(&self) -> (u32, u32, u32) {
        (self.blocks_x, self.blocks_y, self.blocks_z)
    }
}

impl BlockSource for SyntheticField {
    fn channel_count(&self) -> usize {
        1
    }

    fn resident_blocks(&self) -> &[ResidentBlock] {
        &self.resident
    }

    fn extract(&self, block: &ResidentBlock, _channel: usize, out: &mut Cube) {
        let edge = out.edge as f32;
        for z in 0..out.edge {
            for y in 0..out.edge {
                for x in 0..out.edge {
                    let gx = block.ix as f32 + x as f32 / edge;
                    let gy = block.iy as f32 + y as f32 / edge;
                    let gz = block.iz as f32 + z as f32 / edge;
                    let base = (gx * std::f32::consts::TAU).sin()
                        * (gy * std::f32::consts::TAU).cos()
                        * (gz * std::f32::consts::TAU).sin();
                    // cheap deterministic high-frequency jitter, like sensor
                    // or discretization noise riding on a smooth field
                    let jitter_seed = (block.global_block_id as u32)
                        .wrapping_mul(2654435761)
                        .wrapping_add((x * BLOCK_EDGE * BLOCK_EDGE + y * BLOCK_EDGE + z) as u32);
                    let jitter = ((jitter_seed >> 16) & 0xff) as f32 / 255.0 - 0.5;
                    out.set(x, y, z, base + jitter * 0.01);
                }
            }
        }
    }
}
