//! Sparse voxel octree codec: lossless compression of a dense chunk buffer
//! with point lookup directly on the compressed form.
#![forbid(unsafe_code)]

use strata_chunk::{Block, CHUNK_SIZE, ChunkBuf};

/// One region descriptor. Leaf iff `block != Block::INVALID`; internal nodes
/// carry `Block::INVALID` and eight child slots.
///
/// Children are indices into the owning [`Octree`]'s node array, never
/// references: construction appends nodes and the array may reallocate. A
/// child index of 0 anywhere but the root means "no child", i.e. implicit
/// AIR for that octant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OctreeNode {
    pub block: Block,
    pub children: [u32; 8],
}

impl OctreeNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.block != Block::INVALID
    }

    const fn leaf(block: Block) -> Self {
        Self {
            block,
            children: [0; 8],
        }
    }

    const PLACEHOLDER: Self = Self {
        block: Block::INVALID,
        children: [0; 8],
    };
}

/// Result of a point lookup: the block plus the uniform cell that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OctreeCell {
    pub block: Block,
    /// Minimum corner of the uniform cell, in chunk-local voxels.
    pub base: [u32; 3],
    /// Cell edge length in voxels.
    pub size: u32,
}

/// Compressed, loss-free representation of exactly one [`ChunkBuf`].
///
/// Node 0, if present, is the root; an empty node array encodes an all-AIR
/// chunk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
}

impl Octree {
    /// Compresses a dense chunk buffer.
    pub fn build(raw: &ChunkBuf) -> Octree {
        let mut nodes = Vec::new();
        let root = build_region(&mut nodes, raw, 0, 0, 0, CHUNK_SIZE);
        debug_assert!(root == 0 || !nodes.is_empty());
        Octree { nodes }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// Point lookup on the compressed form. Returns the block at `(x, y, z)`
    /// together with the uniform cell that covers it.
    pub fn sample(&self, x: u32, y: u32, z: u32) -> OctreeCell {
        debug_assert!(
            (x as usize) < CHUNK_SIZE && (y as usize) < CHUNK_SIZE && (z as usize) < CHUNK_SIZE
        );
        let mut size = CHUNK_SIZE as u32;
        if self.nodes.is_empty() {
            return OctreeCell {
                block: Block::AIR,
                base: [0, 0, 0],
                size,
            };
        }
        let mut idx = 0usize;
        let mut base = [0u32; 3];
        loop {
            let node = self.nodes[idx];
            if node.is_leaf() {
                return OctreeCell {
                    block: node.block,
                    base,
                    size,
                };
            }
            let half = size / 2;
            let mut oct = 0usize;
            if x >= base[0] + half {
                oct |= 1;
                base[0] += half;
            }
            if y >= base[1] + half {
                oct |= 2;
                base[1] += half;
            }
            if z >= base[2] + half {
                oct |= 4;
                base[2] += half;
            }
            size = half;
            let child = node.children[oct];
            if child == 0 {
                // Absent child: the octant is implicit AIR.
                return OctreeCell {
                    block: Block::AIR,
                    base,
                    size,
                };
            }
            debug_assert!((child as usize) < self.nodes.len());
            idx = child as usize;
        }
    }

    #[inline]
    pub fn get_block(&self, x: u32, y: u32, z: u32) -> Block {
        self.sample(x, y, z).block
    }

    /// Decompresses back into a dense chunk buffer.
    pub fn unpack(&self) -> ChunkBuf {
        let mut buf = ChunkBuf::air();
        if !self.nodes.is_empty() {
            self.unpack_region(&mut buf, 0, 0, 0, 0, CHUNK_SIZE);
        }
        buf
    }

    fn unpack_region(&self, buf: &mut ChunkBuf, idx: usize, x: usize, y: usize, z: usize, s: usize) {
        let node = self.nodes[idx];
        if node.is_leaf() {
            fill_region(buf, node.block, x, y, z, s);
            return;
        }
        let half = s / 2;
        for (oct, &child) in node.children.iter().enumerate() {
            // Absent children stay AIR, which the buffer already holds.
            if child == 0 {
                continue;
            }
            debug_assert!((child as usize) < self.nodes.len());
            let cx = x + if oct & 1 != 0 { half } else { 0 };
            let cy = y + if oct & 2 != 0 { half } else { 0 };
            let cz = z + if oct & 4 != 0 { half } else { 0 };
            self.unpack_region(buf, child as usize, cx, cy, cz, half);
        }
    }
}

/// Builds the node for the `s`-sized region at `(x, y, z)` and returns its
/// index, or 0 when the region is all AIR and needs no node.
fn build_region(nodes: &mut Vec<OctreeNode>, raw: &ChunkBuf, x: usize, y: usize, z: usize, s: usize) -> u32 {
    let first = raw.get(x, y, z);
    if s == 1 {
        if first == Block::AIR {
            return 0;
        }
        nodes.push(OctreeNode::leaf(first));
        return (nodes.len() - 1) as u32;
    }

    if region_is_uniform(raw, first, x, y, z, s) {
        if first == Block::AIR {
            return 0;
        }
        // Whole region collapses to one leaf: the compression win.
        nodes.push(OctreeNode::leaf(first));
        return (nodes.len() - 1) as u32;
    }

    // Reserve the internal node by index before recursing; recursion appends
    // to `nodes` and may reallocate, so no reference is held across it.
    let slot = nodes.len();
    nodes.push(OctreeNode::PLACEHOLDER);

    let half = s / 2;
    let mut children = [0u32; 8];
    for (oct, child) in children.iter_mut().enumerate() {
        let cx = x + if oct & 1 != 0 { half } else { 0 };
        let cy = y + if oct & 2 != 0 { half } else { 0 };
        let cz = z + if oct & 4 != 0 { half } else { 0 };
        *child = build_region(nodes, raw, cx, cy, cz, half);
    }
    nodes[slot].children = children;
    slot as u32
}

fn region_is_uniform(raw: &ChunkBuf, first: Block, x: usize, y: usize, z: usize, s: usize) -> bool {
    for cz in z..z + s {
        for cy in y..y + s {
            for cx in x..x + s {
                if raw.get(cx, cy, cz) != first {
                    return false;
                }
            }
        }
    }
    true
}

fn fill_region(buf: &mut ChunkBuf, block: Block, x: usize, y: usize, z: usize, s: usize) {
    for cz in z..z + s {
        for cy in y..y + s {
            for cx in x..x + s {
                buf.set(cx, cy, cz, block);
            }
        }
    }
}
