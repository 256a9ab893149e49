use proptest::prelude::*;
use strata_chunk::{Block, CHUNK_SIZE, ChunkBuf};
use strata_octree::Octree;

fn cell() -> impl Strategy<Value = usize> {
    0usize..CHUNK_SIZE
}

fn block() -> impl Strategy<Value = Block> {
    // Real terrain tags only; INVALID is reserved for internal nodes.
    prop_oneof![
        Just(Block::AIR),
        Just(Block::STONE),
        Just(Block::DIRT),
        Just(Block::GRASS),
        Just(Block::SAND),
        Just(Block::WATER),
    ]
}

fn writes() -> impl Strategy<Value = Vec<(usize, usize, usize, Block)>> {
    prop::collection::vec((cell(), cell(), cell(), block()), 0..200)
}

fn buf_from_writes(writes: &[(usize, usize, usize, Block)]) -> ChunkBuf {
    let mut buf = ChunkBuf::air();
    for &(x, y, z, b) in writes {
        buf.set(x, y, z, b);
    }
    buf
}

proptest! {
    // unpack(build(raw)) reproduces raw cell for cell
    #[test]
    fn round_trip(ws in writes()) {
        let raw = buf_from_writes(&ws);
        let tree = Octree::build(&raw);
        prop_assert_eq!(tree.unpack(), raw);
    }

    // a filled slab round-trips too (exercises large uniform leaves)
    #[test]
    fn round_trip_slab(height in 0usize..=CHUNK_SIZE, b in block()) {
        let mut raw = ChunkBuf::air();
        for z in 0..CHUNK_SIZE { for y in 0..height { for x in 0..CHUNK_SIZE {
            raw.set(x, y, z, b);
        }}}
        let tree = Octree::build(&raw);
        prop_assert_eq!(tree.unpack(), raw);
    }

    // compressed lookup agrees with the dense buffer at sampled positions
    #[test]
    fn lookup_matches_raw(ws in writes(), probes in prop::collection::vec((cell(), cell(), cell()), 1..64)) {
        let raw = buf_from_writes(&ws);
        let tree = Octree::build(&raw);
        for (x, y, z) in probes {
            prop_assert_eq!(tree.get_block(x as u32, y as u32, z as u32), raw.get(x, y, z));
        }
    }

    // the cell returned by sample is genuinely uniform in the source data
    #[test]
    fn sample_cell_is_uniform(ws in writes(), x in cell(), y in cell(), z in cell()) {
        let raw = buf_from_writes(&ws);
        let tree = Octree::build(&raw);
        let cell = tree.sample(x as u32, y as u32, z as u32);
        let b = cell.base;
        let s = cell.size as usize;
        prop_assert!(b[0] as usize <= x && x < b[0] as usize + s);
        prop_assert!(b[1] as usize <= y && y < b[1] as usize + s);
        prop_assert!(b[2] as usize <= z && z < b[2] as usize + s);
        for cz in b[2] as usize..b[2] as usize + s {
            for cy in b[1] as usize..b[1] as usize + s {
                for cx in b[0] as usize..b[0] as usize + s {
                    prop_assert_eq!(raw.get(cx, cy, cz), cell.block);
                }
            }
        }
    }

    // node indices never point outside the node array
    #[test]
    fn child_indices_in_bounds(ws in writes()) {
        let raw = buf_from_writes(&ws);
        let tree = Octree::build(&raw);
        for node in tree.nodes() {
            for &child in &node.children {
                prop_assert!((child as usize) < tree.node_count().max(1));
            }
        }
    }
}
