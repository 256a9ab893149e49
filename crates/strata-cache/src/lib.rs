//! Bounded concurrent chunk cache with priority-driven eviction.
#![forbid(unsafe_code)]

mod chunk;

pub use chunk::{Chunk, ChunkState};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use hashbrown::HashMap;
use strata_chunk::ChunkCoord;
use strata_geom::Vec3;
use strata_mesh::NeighborOctrees;
use strata_queue::ComputedQueue;

/// Priority of a chunk given its world-space center. Higher keeps the chunk
/// resident longer; the lowest-priority resident is evicted first.
pub type ChunkPriorityFn = Arc<dyn Fn(Vec3) -> f32 + Send + Sync>;

#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub refusals: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// Metrics collector for one cache, injected at construction and read or
/// reset by the owner.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    refusals: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.refusals.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

struct MapInner {
    chunks: HashMap<ChunkCoord, Arc<Chunk>>,
    evict: ComputedQueue<ChunkCoord>,
}

/// Capacity-bounded map from chunk coordinate to chunk handle.
///
/// Reads go through the shared side of one `RwLock`; creation, eviction and
/// priority-function swaps hold the exclusive side. The eviction queue is
/// only ever touched under the exclusive lock.
pub struct ChunkMap {
    inner: RwLock<MapInner>,
    capacity: usize,
    stats: Arc<CacheStats>,
}

fn evict_fn(priority: ChunkPriorityFn) -> strata_queue::PriorityFn<ChunkCoord> {
    Box::new(move |coord: &ChunkCoord| priority(coord.center_world()))
}

impl ChunkMap {
    pub fn new(capacity: usize, priority: ChunkPriorityFn) -> Self {
        Self::with_stats(capacity, priority, Arc::new(CacheStats::default()))
    }

    pub fn with_stats(capacity: usize, priority: ChunkPriorityFn, stats: Arc<CacheStats>) -> Self {
        debug_assert!(capacity > 0);
        Self {
            inner: RwLock::new(MapInner {
                chunks: HashMap::new(),
                evict: ComputedQueue::new(evict_fn(priority)),
            }),
            capacity,
            stats,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shared-lock membership test, no side effects.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.inner.read().unwrap().chunks.contains_key(&coord)
    }

    /// Shared-lock lookup, no side effects.
    pub fn get(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.inner.read().unwrap().chunks.get(&coord).cloned()
    }

    /// Looks the chunk up, creating it on miss. Returns `None` when the map
    /// is at capacity and the newcomer would not outrank the worst evictable
    /// resident; the caller skips that chunk this pass. A returned handle is
    /// always resident at the time of return.
    pub fn get_or_create(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        if let Some(chunk) = self.inner.read().unwrap().chunks.get(&coord) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Some(chunk.clone());
        }

        let mut inner = self.inner.write().unwrap();
        // Raced with another creator between the two locks.
        if let Some(chunk) = inner.chunks.get(&coord) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Some(chunk.clone());
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        if inner.chunks.len() >= self.capacity {
            let newcomer = inner.evict.priority_of(&coord);
            // Pinned residents cannot be evicted, so the newcomer must
            // outrank the worst chunk trim could actually remove; otherwise
            // the newcomer would become its own trim victim.
            let worst_evictable = inner.evict.iter().find_map(|(c, p)| {
                let pinned = inner.chunks.get(c).is_some_and(|chunk| chunk.is_upgrading());
                (!pinned).then_some(p)
            });
            match worst_evictable {
                Some(worst) if newcomer > worst => {}
                _ => {
                    self.stats.refusals.fetch_add(1, Ordering::Relaxed);
                    log::debug!(target: "cache", "refused {coord:?} (priority {newcomer})");
                    return None;
                }
            }
        }

        let chunk = Arc::new(Chunk::new(coord));
        inner.chunks.insert(coord, chunk.clone());
        inner.evict.insert(coord);
        self.trim_locked(&mut inner);
        Some(chunk)
    }

    /// Evicts lowest-priority chunks until the map fits its capacity.
    /// Chunks with an outstanding job are pinned: they are set aside and
    /// reinserted, and the map may transiently stay over capacity when only
    /// pinned chunks remain.
    fn trim_locked(&self, inner: &mut MapInner) {
        let mut pinned: Vec<ChunkCoord> = Vec::new();
        while inner.chunks.len() > self.capacity {
            let Some((victim, priority)) = inner.evict.pop_back() else {
                break;
            };
            let upgrading = inner
                .chunks
                .get(&victim)
                .is_some_and(|c| c.is_upgrading());
            if upgrading {
                pinned.push(victim);
                continue;
            }
            if inner.chunks.remove(&victim).is_some() {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                log::debug!(target: "cache", "evicted {victim:?} (priority {priority})");
            }
        }
        for coord in pinned {
            inner.evict.insert(coord);
        }
    }

    /// Swaps the eviction priority function; every resident is rescored.
    pub fn set_priority_fn(&self, priority: ChunkPriorityFn) {
        let mut inner = self.inner.write().unwrap();
        inner.evict.set_priority_fn(evict_fn(priority));
    }

    /// 3x3x3 octree snapshot around `coord`, through the shared-lock read
    /// path. Safe to call from worker threads.
    pub fn neighbor_octrees(&self, coord: ChunkCoord) -> NeighborOctrees {
        let inner = self.inner.read().unwrap();
        NeighborOctrees::collect(|dx, dy, dz| {
            inner
                .chunks
                .get(&coord.offset(dx, dy, dz))
                .and_then(|c| c.octree_snapshot())
        })
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            refusals: self.stats.refusals.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inverse_distance_from_origin() -> ChunkPriorityFn {
        Arc::new(|center: Vec3| 1.0 / center.length().max(1e-3))
    }

    fn map(capacity: usize) -> ChunkMap {
        ChunkMap::new(capacity, inverse_distance_from_origin())
    }

    #[test]
    fn nearest_two_survive_capacity_two() {
        // Chunks along +x at grid distances 1, 2, 3 from the origin chunk.
        let m = map(2);
        let near = ChunkCoord::new(1, 0, 0);
        let mid = ChunkCoord::new(2, 0, 0);
        let far = ChunkCoord::new(3, 0, 0);
        assert!(m.get_or_create(near).is_some());
        assert!(m.get_or_create(mid).is_some());
        // Not competitive: worse priority than both residents.
        assert!(m.get_or_create(far).is_none());
        assert_eq!(m.len(), 2);
        assert!(m.contains(near));
        assert!(m.contains(mid));
        assert!(!m.contains(far));
        let stats = m.stats();
        assert_eq!(stats.refusals, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn competitive_newcomer_evicts_worst() {
        let m = map(2);
        let mid = ChunkCoord::new(2, 0, 0);
        let far = ChunkCoord::new(3, 0, 0);
        let near = ChunkCoord::new(1, 0, 0);
        assert!(m.get_or_create(mid).is_some());
        assert!(m.get_or_create(far).is_some());
        // Near chunk outranks both; the farthest resident goes.
        assert!(m.get_or_create(near).is_some());
        assert_eq!(m.len(), 2);
        assert!(!m.contains(far));
        assert!(m.contains(near));
        assert!(m.contains(mid));
        assert_eq!(m.stats().evictions, 1);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let m = map(4);
        for x in -6..=6 {
            for z in -6..=6 {
                m.get_or_create(ChunkCoord::new(x, 0, z));
                assert!(m.len() <= 4, "over capacity after insert ({x},{z})");
            }
        }
        assert_eq!(m.stats().entries, m.len());
    }

    #[test]
    fn eviction_removes_globally_worst() {
        let m = map(3);
        for x in 1..=3 {
            m.get_or_create(ChunkCoord::new(x, 0, 0)).unwrap();
        }
        // Inserting a closer chunk must evict x=3, the lowest priority.
        m.get_or_create(ChunkCoord::new(0, 1, 0)).unwrap();
        assert!(!m.contains(ChunkCoord::new(3, 0, 0)));
        assert!(m.contains(ChunkCoord::new(1, 0, 0)));
        assert!(m.contains(ChunkCoord::new(2, 0, 0)));
    }

    #[test]
    fn trim_skips_upgrading_chunks() {
        let m = map(2);
        let far = ChunkCoord::new(5, 0, 0);
        let mid = ChunkCoord::new(2, 0, 0);
        let near = ChunkCoord::new(1, 0, 0);
        let far_chunk = m.get_or_create(far).unwrap();
        assert!(m.get_or_create(mid).is_some());
        // Pin the would-be victim with an outstanding job.
        assert!(far_chunk.begin_upgrade());
        assert!(m.get_or_create(near).is_some());
        // The pinned chunk survives; the next-worst unpinned one went.
        assert!(m.contains(far));
        assert!(!m.contains(mid));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn newcomer_outranking_only_pinned_chunks_is_refused() {
        // Larger x means lower priority here, so the pinned chunk is the
        // globally worst resident.
        let m = ChunkMap::new(2, Arc::new(|center: Vec3| -center.x));
        let far = ChunkCoord::new(3, 0, 0);
        let near = ChunkCoord::new(1, 0, 0);
        let mid = ChunkCoord::new(2, 0, 0);
        let far_chunk = m.get_or_create(far).unwrap();
        assert!(m.get_or_create(near).is_some());
        assert!(far_chunk.begin_upgrade());
        // The newcomer outranks only the pinned chunk. Admitting it would
        // make it trim's own victim, so it must be refused and both
        // residents must stay.
        assert!(m.get_or_create(mid).is_none());
        assert!(m.contains(far));
        assert!(m.contains(near));
        assert!(!m.contains(mid));
        assert_eq!(m.len(), 2);
        assert_eq!(m.stats().refusals, 1);
        assert_eq!(m.stats().evictions, 0);
    }

    #[test]
    fn priority_swap_reorders_eviction() {
        let m = map(2);
        let a = ChunkCoord::new(1, 0, 0);
        let b = ChunkCoord::new(2, 0, 0);
        assert!(m.get_or_create(a).is_some());
        assert!(m.get_or_create(b).is_some());
        // Reverse the viewpoint: now larger x ranks higher.
        m.set_priority_fn(Arc::new(|center: Vec3| center.x));
        let c = ChunkCoord::new(3, 0, 0);
        assert!(m.get_or_create(c).is_some());
        assert!(!m.contains(a));
        assert!(m.contains(b));
        assert!(m.contains(c));
    }

    #[test]
    fn get_does_not_create() {
        let m = map(2);
        assert!(m.get(ChunkCoord::new(0, 0, 0)).is_none());
        assert!(m.is_empty());
    }
}
