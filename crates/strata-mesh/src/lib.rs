//! CPU tesselation: turns a chunk's octree (plus neighbor snapshots) into a
//! renderer-agnostic geometry artifact.
#![forbid(unsafe_code)]

use std::sync::Arc;

use strata_chunk::{Block, CHUNK_SIZE, ChunkCoord};
use strata_geom::Vec3;
use strata_octree::Octree;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Opaque tesselation result for one chunk. The scheduler installs it on the
/// chunk without looking inside.
#[derive(Clone, Debug, Default)]
pub struct GeometryArtifact {
    pub coord: ChunkCoord,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl GeometryArtifact {
    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Read-only 3x3x3 neighborhood of octree snapshots, centered on the chunk
/// being tesselated. `None` entries read as all-AIR.
pub struct NeighborOctrees {
    trees: [Option<Arc<Octree>>; 27],
}

impl NeighborOctrees {
    pub fn new(trees: [Option<Arc<Octree>>; 27]) -> Self {
        Self { trees }
    }

    pub fn empty() -> Self {
        Self {
            trees: std::array::from_fn(|_| None),
        }
    }

    /// Builds the neighborhood by asking `lookup` for each offset's octree.
    pub fn collect<F>(mut lookup: F) -> Self
    where
        F: FnMut(i32, i32, i32) -> Option<Arc<Octree>>,
    {
        let mut trees: [Option<Arc<Octree>>; 27] = std::array::from_fn(|_| None);
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    trees[Self::slot(dx, dy, dz)] = lookup(dx, dy, dz);
                }
            }
        }
        Self { trees }
    }

    /// Installs one neighbor snapshot.
    pub fn set(&mut self, dx: i32, dy: i32, dz: i32, tree: Option<Arc<Octree>>) {
        self.trees[Self::slot(dx, dy, dz)] = tree;
    }

    #[inline]
    fn slot(dx: i32, dy: i32, dz: i32) -> usize {
        debug_assert!((-1..=1).contains(&dx) && (-1..=1).contains(&dy) && (-1..=1).contains(&dz));
        (((dz + 1) * 3 + (dy + 1)) * 3 + (dx + 1)) as usize
    }

    pub fn get(&self, dx: i32, dy: i32, dz: i32) -> Option<&Arc<Octree>> {
        self.trees[Self::slot(dx, dy, dz)].as_ref()
    }

    pub fn center(&self) -> Option<&Arc<Octree>> {
        self.get(0, 0, 0)
    }

    /// Block at a position in the center chunk's local space, which may fall
    /// one chunk outside it on any axis.
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Block {
        let s = CHUNK_SIZE as i32;
        let dx = x.div_euclid(s);
        let dy = y.div_euclid(s);
        let dz = z.div_euclid(s);
        match self.get(dx, dy, dz) {
            Some(tree) => tree.get_block(
                x.rem_euclid(s) as u32,
                y.rem_euclid(s) as u32,
                z.rem_euclid(s) as u32,
            ),
            None => Block::AIR,
        }
    }
}

/// Tesselation collaborator contract. Implementations run on worker threads
/// and must only read the snapshots they are handed.
pub trait Tesselator: Send + Sync {
    fn tesselate(&self, coord: ChunkCoord, neighbors: &NeighborOctrees) -> GeometryArtifact;
}

const FACES: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Naive visible-face mesher: one quad for every solid cell face that borders
/// AIR, consulting neighbor chunks across the seams.
#[derive(Clone, Copy, Debug, Default)]
pub struct FaceTesselator;

impl Tesselator for FaceTesselator {
    fn tesselate(&self, coord: ChunkCoord, neighbors: &NeighborOctrees) -> GeometryArtifact {
        let mut out = GeometryArtifact {
            coord,
            vertices: Vec::new(),
            indices: Vec::new(),
        };
        let Some(center) = neighbors.center() else {
            return out;
        };
        if center.is_empty() {
            return out;
        }
        let base = coord.base_world();
        let s = CHUNK_SIZE as i32;
        for z in 0..s {
            for y in 0..s {
                for x in 0..s {
                    let block = center.get_block(x as u32, y as u32, z as u32);
                    if !block.is_solid() {
                        continue;
                    }
                    for (dx, dy, dz) in FACES {
                        if neighbors.block_at(x + dx, y + dy, z + dz).is_air() {
                            emit_quad(&mut out, base, x, y, z, dx, dy, dz);
                        }
                    }
                }
            }
        }
        out
    }
}

fn emit_quad(out: &mut GeometryArtifact, base: Vec3, x: i32, y: i32, z: i32, dx: i32, dy: i32, dz: i32) {
    let normal = Vec3::new(dx as f32, dy as f32, dz as f32);
    let cell = base + Vec3::new(x as f32, y as f32, z as f32);
    // Two edge vectors spanning the face plane.
    let (u, v) = if dx != 0 {
        (Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0))
    } else if dy != 0 {
        (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0))
    } else {
        (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0))
    };
    let origin = if dx + dy + dz > 0 {
        cell + normal
    } else {
        cell
    };
    let first = out.vertices.len() as u32;
    for corner in [Vec3::ZERO, u, u + v, v] {
        out.vertices.push(Vertex {
            position: origin + corner,
            normal,
        });
    }
    out.indices
        .extend_from_slice(&[first, first + 1, first + 2, first, first + 2, first + 3]);
}
