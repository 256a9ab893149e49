//! Chunk scheduler: decides each tick which chunks advance a lifecycle
//! stage, dispatches jobs into the worker pool, and applies completed
//! results back onto the cache.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use strata_cache::{Chunk, ChunkMap, ChunkState};
use strata_chunk::{CHUNK_SIZE, ChunkCoord};
use strata_geom::Vec3;
use strata_mesh::Tesselator;
use strata_octree::Octree;
use strata_queue::KeyedQueue;
use strata_runtime::JobPool;

use crate::config::EngineConfig;
use crate::generator::ChunkGenerator;
use crate::stats::SchedulerStats;
use crate::viewsphere::ViewSphere;

/// Drives the NEW -> GENERATED -> TESSELATED lifecycle.
///
/// One controlling thread owns the manager and calls [`sow`](Self::sow) and
/// [`reap`](Self::reap) once per tick; finalizers run inside `reap` are the
/// only code that advances chunk state.
pub struct ChunkManager {
    map: Arc<ChunkMap>,
    pool: JobPool,
    generator: Arc<ChunkGenerator>,
    tesselator: Arc<dyn Tesselator>,
    spheres: Vec<Weak<ViewSphere>>,
    stats: Arc<SchedulerStats>,
}

impl ChunkManager {
    pub fn new(config: &EngineConfig, tesselator: Arc<dyn Tesselator>) -> Self {
        Self::with_stats(config, tesselator, Arc::new(SchedulerStats::default()))
    }

    pub fn with_stats(
        config: &EngineConfig,
        tesselator: Arc<dyn Tesselator>,
        stats: Arc<SchedulerStats>,
    ) -> Self {
        let workers = config.workers.unwrap_or_else(JobPool::default_workers);
        // Until a caller supplies a viewpoint, eviction priority is plain
        // proximity to the origin.
        let map = Arc::new(ChunkMap::new(
            config.cache_capacity,
            Arc::new(|center: Vec3| 1.0 / center.length().max(1.0)),
        ));
        Self {
            map,
            pool: JobPool::new(workers),
            generator: Arc::new(config.generator.clone()),
            tesselator,
            spheres: Vec::new(),
            stats,
        }
    }

    pub fn map(&self) -> &Arc<ChunkMap> {
        &self.map
    }

    pub fn pool(&self) -> &JobPool {
        &self.pool
    }

    pub fn stats(&self) -> &Arc<SchedulerStats> {
        &self.stats
    }

    /// Registers interest. The sphere stays externally owned; the expired
    /// weak reference is pruned on a later [`sow`](Self::sow).
    pub fn add_view_sphere(&mut self, sphere: &Arc<ViewSphere>) {
        self.spheres.push(Arc::downgrade(sphere));
    }

    pub fn view_sphere_count(&self) -> usize {
        self.spheres.len()
    }

    /// Replaces the cache eviction priority function (full recompute). Call
    /// when the reference viewpoint has moved meaningfully.
    pub fn set_priority_fn(&self, priority: strata_cache::ChunkPriorityFn) {
        self.map.set_priority_fn(priority);
    }

    /// Dispatches upgrade jobs for the most relevant chunks, up to the worker
    /// pool's free capacity at the time of the call.
    pub fn sow(&mut self) {
        let mut free = self.pool.free_slots();
        if free == 0 {
            return;
        }
        let mut candidates = self.collect_candidates();
        while free > 0 {
            let Some((coord, priority)) = candidates.pop_back() else {
                break;
            };
            if self.try_upgrade(&mut candidates, coord, priority) {
                free -= 1;
            }
        }
    }

    /// Applies every completed job's result on the calling thread, in
    /// completion order. Returns how many finalizers ran.
    pub fn reap(&self) -> usize {
        self.pool.drain_finalizers()
    }

    /// Candidate chunks of every live view sphere, prioritized by distance
    /// from the sphere center (lower = scheduled sooner). Expired spheres
    /// are dropped from the registry here.
    fn collect_candidates(&mut self) -> KeyedQueue<ChunkCoord> {
        self.spheres.retain(|w| w.strong_count() > 0);
        let mut candidates = KeyedQueue::new();
        let s = CHUNK_SIZE as f32;
        for weak in &self.spheres {
            let Some(sphere) = weak.upgrade() else {
                continue;
            };
            let center = sphere.center();
            let bb = sphere.aabb();
            let min = [
                (bb.min.x / s).floor() as i32,
                (bb.min.y / s).floor() as i32,
                (bb.min.z / s).floor() as i32,
            ];
            let max = [
                (bb.max.x / s).floor() as i32,
                (bb.max.y / s).floor() as i32,
                (bb.max.z / s).floor() as i32,
            ];
            for cz in min[2]..=max[2] {
                for cy in min[1]..=max[1] {
                    for cx in min[0]..=max[0] {
                        let coord = ChunkCoord::new(cx, cy, cz);
                        candidates.insert(coord, center.distance(coord.center_world()));
                    }
                }
            }
        }
        candidates
    }

    /// Attempts to advance `coord` one lifecycle stage. On a neighbor-state
    /// deficit the blocking neighbors are re-enqueued at this candidate's
    /// priority and the call fails without consuming a slot.
    fn try_upgrade(
        &self,
        candidates: &mut KeyedQueue<ChunkCoord>,
        coord: ChunkCoord,
        priority: f32,
    ) -> bool {
        let Some(chunk) = self.map.get_or_create(coord) else {
            self.stats.capacity_skips.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        let state = chunk.state();
        let Some(next) = state.next() else {
            return false;
        };
        if chunk.is_upgrading() {
            return false;
        }

        // Tesselation reads across the seams, so all 26 neighbors must be
        // generated first; generation has no neighbor constraint.
        if next == ChunkState::Tesselated {
            let mut blocked = false;
            for dz in -1..=1 {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if dx == 0 && dy == 0 && dz == 0 {
                            continue;
                        }
                        let ncoord = coord.offset(dx, dy, dz);
                        let nstate = self
                            .map
                            .get(ncoord)
                            .map(|n| n.state())
                            .unwrap_or(ChunkState::New);
                        if nstate < state {
                            candidates.insert(ncoord, priority);
                            self.stats.precondition_retries.fetch_add(1, Ordering::Relaxed);
                            blocked = true;
                        }
                    }
                }
            }
            if blocked {
                log::debug!(target: "sched", "tesselation of {coord:?} blocked on neighbors");
                return false;
            }
        }

        if !chunk.begin_upgrade() {
            return false;
        }
        match next {
            ChunkState::Generated => self.dispatch_generation(chunk),
            ChunkState::Tesselated => self.dispatch_tesselation(chunk),
            ChunkState::New => unreachable!("no upgrade targets NEW"),
        }
        true
    }

    fn dispatch_generation(&self, chunk: Arc<Chunk>) {
        let coord = chunk.coord();
        let generator = self.generator.clone();
        let stats = self.stats.clone();
        let spheres = self.spheres.clone();
        let was_covered = covered_by_any(&spheres, coord);
        self.stats.generation_jobs.fetch_add(1, Ordering::Relaxed);
        log::debug!(target: "sched", "dispatch generate {coord:?}");
        self.pool.submit(move || {
            let raw = generator.generate(coord);
            let octree = Octree::build(&raw);
            Box::new(move || {
                chunk.mark_generated(octree);
                if was_covered && !covered_by_any(&spheres, coord) {
                    stats.wasted_finalizers.fetch_add(1, Ordering::Relaxed);
                }
                log::debug!(target: "sched", "generated {coord:?}");
            })
        });
    }

    fn dispatch_tesselation(&self, chunk: Arc<Chunk>) {
        let coord = chunk.coord();
        let map = self.map.clone();
        let tesselator = self.tesselator.clone();
        let stats = self.stats.clone();
        let spheres = self.spheres.clone();
        let was_covered = covered_by_any(&spheres, coord);
        self.stats.tesselation_jobs.fetch_add(1, Ordering::Relaxed);
        log::debug!(target: "sched", "dispatch tesselate {coord:?}");
        self.pool.submit(move || {
            // Shared-lock snapshot; workers never touch the write path.
            let neighbors = map.neighbor_octrees(coord);
            let geometry = tesselator.tesselate(coord, &neighbors);
            Box::new(move || {
                chunk.mark_tesselated(geometry);
                if was_covered && !covered_by_any(&spheres, coord) {
                    stats.wasted_finalizers.fetch_add(1, Ordering::Relaxed);
                }
                log::debug!(target: "sched", "tesselated {coord:?}");
            })
        });
    }
}

/// Whether any still-live view sphere overlaps the chunk. Used to count
/// wasted work; a dead sphere never cancels a job.
fn covered_by_any(spheres: &[Weak<ViewSphere>], coord: ChunkCoord) -> bool {
    let bb = coord.aabb_world();
    spheres.iter().any(|weak| {
        weak.upgrade()
            .is_some_and(|sphere| sphere.aabb().intersects(bb))
    })
}
