//! Terrain generator collaborators: a closed set of variants chosen at
//! engine construction. Every variant is deterministic per coordinate and
//! safe to call concurrently from worker threads.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use serde::Deserialize;

use strata_chunk::{Block, CHUNK_SIZE, ChunkBuf, ChunkCoord};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkGenerator {
    /// Solid slab below a fixed world height.
    Flat { ground_height: i32 },
    /// Rolling hills from a product of sines, for tests and demos.
    Sine { amplitude: f32, period: f32 },
    /// OpenSimplex2 heightmap terrain.
    Noise {
        seed: i32,
        frequency: f32,
        height_scale: f32,
    },
}

impl Default for ChunkGenerator {
    fn default() -> Self {
        ChunkGenerator::Noise {
            seed: 1337,
            frequency: 0.01,
            height_scale: 24.0,
        }
    }
}

impl ChunkGenerator {
    /// Produces the dense voxel data for one chunk. Stateless across calls.
    pub fn generate(&self, coord: ChunkCoord) -> ChunkBuf {
        let base = coord.base_world();
        let heights = self.column_heights(base.x, base.z);
        let mut buf = ChunkBuf::air();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let h = heights[z * CHUNK_SIZE + x];
                for y in 0..CHUNK_SIZE {
                    let wy = base.y as i32 + y as i32;
                    if wy < h {
                        buf.set(x, y, z, column_block(wy, h));
                    }
                }
            }
        }
        buf
    }

    /// Ground height for every column of a chunk footprint, x fastest.
    fn column_heights(&self, base_x: f32, base_z: f32) -> Vec<i32> {
        let mut heights = vec![0i32; CHUNK_SIZE * CHUNK_SIZE];
        match self {
            ChunkGenerator::Flat { ground_height } => {
                heights.fill(*ground_height);
            }
            ChunkGenerator::Sine { amplitude, period } => {
                for z in 0..CHUNK_SIZE {
                    for x in 0..CHUNK_SIZE {
                        let wx = base_x + x as f32;
                        let wz = base_z + z as f32;
                        let h = amplitude * (wx / period).sin() * (wz / period).cos();
                        heights[z * CHUNK_SIZE + x] = h.round() as i32;
                    }
                }
            }
            ChunkGenerator::Noise {
                seed,
                frequency,
                height_scale,
            } => {
                let mut terrain = FastNoiseLite::with_seed(*seed);
                terrain.set_noise_type(Some(NoiseType::OpenSimplex2));
                terrain.set_frequency(Some(*frequency));
                for z in 0..CHUNK_SIZE {
                    for x in 0..CHUNK_SIZE {
                        let wx = base_x + x as f32;
                        let wz = base_z + z as f32;
                        let n = terrain.get_noise_2d(wx, wz);
                        heights[z * CHUNK_SIZE + x] = (n * height_scale).round() as i32;
                    }
                }
            }
        }
        heights
    }
}

fn column_block(wy: i32, surface: i32) -> Block {
    if wy >= surface - 1 {
        Block::GRASS
    } else if wy >= surface - 4 {
        Block::DIRT
    } else {
        Block::STONE
    }
}
