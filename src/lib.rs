//! Strata: streams an effectively infinite voxel world by generating,
//! compressing, and tesselating cubic chunks on demand under a fixed memory
//! budget.
//!
//! The controlling thread drives a [`ChunkManager`] with `sow()` / `reap()`
//! once per tick; worker threads generate terrain and build meshes, and the
//! bounded [`ChunkMap`] keeps the most relevant chunks resident.
#![forbid(unsafe_code)]

mod config;
mod generator;
mod manager;
mod stats;
mod viewsphere;

pub use config::EngineConfig;
pub use generator::ChunkGenerator;
pub use manager::ChunkManager;
pub use stats::{SchedulerStats, SchedulerStatsSnapshot};
pub use viewsphere::ViewSphere;

pub use strata_cache::{CacheStats, CacheStatsSnapshot, Chunk, ChunkMap, ChunkPriorityFn, ChunkState};
pub use strata_chunk::{Block, CHUNK_SIZE, CHUNK_VOLUME, ChunkBuf, ChunkCoord};
pub use strata_geom::{Aabb, Vec3};
pub use strata_mesh::{FaceTesselator, GeometryArtifact, NeighborOctrees, Tesselator, Vertex};
pub use strata_octree::{Octree, OctreeCell, OctreeNode};
pub use strata_queue::{ComputedQueue, KeyedQueue, OrdQueue};
pub use strata_runtime::{Finalizer, JobPool};

/// Initializes env_logger once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env().try_init();
}
