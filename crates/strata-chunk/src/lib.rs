//! Voxel tags, chunk coordinates, and the dense chunk buffer.
#![forbid(unsafe_code)]

use strata_geom::{Aabb, Vec3};

/// Cubic chunk edge length in voxels. Must stay a power of two so the octree
/// codec can halve it down to single cells.
pub const CHUNK_SIZE: usize = 32;

/// Voxel count of one chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// A voxel tag. Plain integer id; equality is identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block(pub u16);

impl Block {
    pub const AIR: Block = Block(0);
    pub const STONE: Block = Block(1);
    pub const DIRT: Block = Block(2);
    pub const GRASS: Block = Block(3);
    pub const SAND: Block = Block(4);
    pub const WATER: Block = Block(5);
    /// Reserved sentinel, never stored as terrain. The octree uses it to mark
    /// internal nodes.
    pub const INVALID: Block = Block(u16::MAX);

    #[inline]
    pub fn is_air(self) -> bool {
        self == Block::AIR
    }

    #[inline]
    pub fn is_solid(self) -> bool {
        self != Block::AIR && self != Block::WATER && self != Block::INVALID
    }
}

/// Position of a chunk in chunk-grid space (not world units).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dy = i64::from(self.cy - other.cy);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dy * dy + dz * dz
    }

    /// World-space position of the chunk's minimum corner.
    #[inline]
    pub fn base_world(self) -> Vec3 {
        let s = CHUNK_SIZE as f32;
        Vec3::new(
            self.cx as f32 * s,
            self.cy as f32 * s,
            self.cz as f32 * s,
        )
    }

    /// World-space position of the chunk's center.
    #[inline]
    pub fn center_world(self) -> Vec3 {
        let h = CHUNK_SIZE as f32 * 0.5;
        self.base_world() + Vec3::splat(h)
    }

    /// World-space bounding box of the chunk.
    #[inline]
    pub fn aabb_world(self) -> Aabb {
        let min = self.base_world();
        Aabb::new(min, min + Vec3::splat(CHUNK_SIZE as f32))
    }
}

impl From<(i32, i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkCoord> for (i32, i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cy, value.cz)
    }
}

/// Dense voxel storage for one chunk, linearized x fastest, then y, then z.
///
/// Owned by exactly one pipeline stage at a time (generation, codec, unpack);
/// it is never shared across threads while mutable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkBuf {
    blocks: Vec<Block>,
}

impl ChunkBuf {
    pub fn filled(block: Block) -> Self {
        debug_assert!(block != Block::INVALID);
        Self {
            blocks: vec![block; CHUNK_VOLUME],
        }
    }

    pub fn air() -> Self {
        Self::filled(Block::AIR)
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut b = blocks;
        if b.len() != CHUNK_VOLUME {
            b.resize(CHUNK_VOLUME, Block::AIR);
        }
        Self { blocks: b }
    }

    #[inline]
    pub fn idx(x: usize, y: usize, z: usize) -> usize {
        (z * CHUNK_SIZE + y) * CHUNK_SIZE + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Block {
        self.blocks[Self::idx(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: Block) {
        debug_assert!(block != Block::INVALID);
        self.blocks[Self::idx(x, y, z)] = block;
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn has_non_air(&self) -> bool {
        self.blocks.iter().any(|b| *b != Block::AIR)
    }

    #[inline]
    pub fn is_all_air(&self) -> bool {
        !self.has_non_air()
    }
}
