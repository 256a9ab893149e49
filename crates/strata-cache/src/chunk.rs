use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use strata_chunk::ChunkCoord;
use strata_mesh::GeometryArtifact;
use strata_octree::Octree;

/// Lifecycle stage of a chunk. Ordered: a chunk only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChunkState {
    New = 0,
    Generated = 1,
    Tesselated = 2,
}

impl ChunkState {
    pub const TERMINAL: ChunkState = ChunkState::Tesselated;

    pub fn next(self) -> Option<ChunkState> {
        match self {
            ChunkState::New => Some(ChunkState::Generated),
            ChunkState::Generated => Some(ChunkState::Tesselated),
            ChunkState::Tesselated => None,
        }
    }

    fn from_u8(v: u8) -> ChunkState {
        match v {
            0 => ChunkState::New,
            1 => ChunkState::Generated,
            _ => ChunkState::Tesselated,
        }
    }
}

/// Shared chunk handle. Lifecycle fields advance only inside finalizers run
/// by the controlling thread; worker threads take octree snapshots through
/// [`octree_snapshot`](Chunk::octree_snapshot) and read nothing else.
pub struct Chunk {
    coord: ChunkCoord,
    state: AtomicU8,
    upgrading: AtomicBool,
    octree: RwLock<Option<Arc<Octree>>>,
    geometry: Mutex<Option<GeometryArtifact>>,
}

impl Chunk {
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            state: AtomicU8::new(ChunkState::New as u8),
            upgrading: AtomicBool::new(false),
            octree: RwLock::new(None),
            geometry: Mutex::new(None),
        }
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        ChunkState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_upgrading(&self) -> bool {
        self.upgrading.load(Ordering::Acquire)
    }

    /// Claims the chunk for a job dispatch. Fails if a job is already
    /// outstanding; a claimed chunk must never be dispatched again until
    /// its finalizer clears the flag.
    pub fn begin_upgrade(&self) -> bool {
        self.upgrading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish_upgrade(&self) {
        let was = self.upgrading.swap(false, Ordering::AcqRel);
        debug_assert!(was, "finish_upgrade without begin_upgrade");
    }

    /// Installs the generation result and advances NEW -> GENERATED.
    /// Finalizer-only.
    pub fn mark_generated(&self, octree: Octree) {
        debug_assert_eq!(self.state(), ChunkState::New);
        *self.octree.write().unwrap() = Some(Arc::new(octree));
        self.state
            .store(ChunkState::Generated as u8, Ordering::Release);
        self.finish_upgrade();
    }

    /// Installs the tesselation result and advances GENERATED -> TESSELATED.
    /// Finalizer-only.
    pub fn mark_tesselated(&self, geometry: GeometryArtifact) {
        debug_assert_eq!(self.state(), ChunkState::Generated);
        *self.geometry.lock().unwrap() = Some(geometry);
        self.state
            .store(ChunkState::Tesselated as u8, Ordering::Release);
        self.finish_upgrade();
    }

    /// Shared-lock read path used by worker threads.
    pub fn octree_snapshot(&self) -> Option<Arc<Octree>> {
        self.octree.read().unwrap().clone()
    }

    pub fn has_geometry(&self) -> bool {
        self.geometry.lock().unwrap().is_some()
    }

    /// Borrow-free copy-out for callers that consume the mesh (e.g. an
    /// upload step). Leaves the chunk TESSELATED.
    pub fn take_geometry(&self) -> Option<GeometryArtifact> {
        self.geometry.lock().unwrap().take()
    }
}
