//! Scheduler metrics collector. Injected at construction; the owner reads a
//! snapshot or resets it between frames.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStatsSnapshot {
    pub generation_jobs: u64,
    pub tesselation_jobs: u64,
    pub wasted_finalizers: u64,
    pub capacity_skips: u64,
    pub precondition_retries: u64,
}

#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub(crate) generation_jobs: AtomicU64,
    pub(crate) tesselation_jobs: AtomicU64,
    pub(crate) wasted_finalizers: AtomicU64,
    pub(crate) capacity_skips: AtomicU64,
    pub(crate) precondition_retries: AtomicU64,
}

impl SchedulerStats {
    pub fn snapshot(&self) -> SchedulerStatsSnapshot {
        SchedulerStatsSnapshot {
            generation_jobs: self.generation_jobs.load(Ordering::Relaxed),
            tesselation_jobs: self.tesselation_jobs.load(Ordering::Relaxed),
            wasted_finalizers: self.wasted_finalizers.load(Ordering::Relaxed),
            capacity_skips: self.capacity_skips.load(Ordering::Relaxed),
            precondition_retries: self.precondition_retries.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.generation_jobs.store(0, Ordering::Relaxed);
        self.tesselation_jobs.store(0, Ordering::Relaxed);
        self.wasted_finalizers.store(0, Ordering::Relaxed);
        self.capacity_skips.store(0, Ordering::Relaxed);
        self.precondition_retries.store(0, Ordering::Relaxed);
    }
}
