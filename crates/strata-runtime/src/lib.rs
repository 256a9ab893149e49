//! Worker pool and finalizer queue: jobs run on background threads, results
//! are applied on a single controlling thread.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

/// Completion callback posted by a finished job. Runs on whichever thread
/// calls [`JobPool::drain_finalizers`]; that is the only place job results
/// may touch shared engine state.
pub type Finalizer = Box<dyn FnOnce() + Send + 'static>;

type Job = Box<dyn FnOnce() -> Finalizer + Send + 'static>;

/// Fixed pool of worker threads plus an unbounded finalizer queue.
///
/// The result side is unbounded on purpose: a bounded queue could leave a
/// worker blocked on a full channel after the controlling thread has already
/// gone away, and shutdown would never join it.
pub struct JobPool {
    job_tx: Option<Sender<Job>>,
    done_rx: Receiver<Finalizer>,
    workers: Vec<JoinHandle<()>>,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
    capacity: usize,
}

impl JobPool {
    /// Spawns `workers` threads. Zero is clamped to one.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (job_tx, job_rx) = unbounded::<Job>();
        let (done_tx, done_rx) = unbounded::<Finalizer>();
        let queued = Arc::new(AtomicUsize::new(0));
        let inflight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let rx = job_rx.clone();
            let tx = done_tx.clone();
            let queued = queued.clone();
            let inflight = inflight.clone();
            let handle = thread::Builder::new()
                .name(format!("strata-worker-{i}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        queued.fetch_sub(1, Ordering::Relaxed);
                        inflight.fetch_add(1, Ordering::Relaxed);
                        let finalizer = job();
                        // Send can only fail once the pool is gone; the
                        // result is simply dropped then.
                        let _ = tx.send(finalizer);
                        inflight.fetch_sub(1, Ordering::Relaxed);
                    }
                })
                .expect("spawn worker thread");
            handles.push(handle);
        }

        Self {
            job_tx: Some(job_tx),
            done_rx,
            workers: handles,
            queued,
            inflight,
            capacity: workers,
        }
    }

    /// Worker count: available parallelism minus one for the controlling
    /// thread, floor one.
    pub fn default_workers() -> usize {
        thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    }

    /// Submits a job. It runs on any free worker; its returned finalizer is
    /// queued for [`drain_finalizers`](Self::drain_finalizers).
    pub fn submit<J>(&self, job: J)
    where
        J: FnOnce() -> Finalizer + Send + 'static,
    {
        let Some(tx) = self.job_tx.as_ref() else {
            log::warn!("job submitted after shutdown, dropped");
            return;
        };
        self.queued.fetch_add(1, Ordering::Relaxed);
        if tx.send(Box::new(job)).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Runs every currently queued finalizer on the calling thread, in the
    /// order jobs completed. Returns how many ran. Does not block waiting
    /// for more.
    pub fn drain_finalizers(&self) -> usize {
        let mut ran = 0;
        while let Ok(finalizer) = self.done_rx.try_recv() {
            finalizer();
            ran += 1;
        }
        ran
    }

    /// Like [`drain_finalizers`](Self::drain_finalizers) but waits up to
    /// `timeout` for results to arrive, draining as they do.
    pub fn drain_finalizers_for(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut ran = 0;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.done_rx.recv_timeout(deadline - now) {
                Ok(finalizer) => {
                    finalizer();
                    ran += 1;
                    ran += self.drain_finalizers();
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        ran
    }

    /// Jobs submitted but not yet finalized into the result queue: waiting
    /// plus running.
    pub fn pending(&self) -> usize {
        self.queued.load(Ordering::Relaxed) + self.inflight.load(Ordering::Relaxed)
    }

    /// Submission slots currently free.
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.pending())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stops accepting work and joins every worker. In-flight jobs finish
    /// first; their finalizers stay queued and can still be drained.
    pub fn shutdown(&mut self) {
        // Dropping the sender ends each worker's recv loop.
        self.job_tx.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::warn!("worker thread panicked");
            }
        }
    }
}

impl Default for JobPool {
    fn default() -> Self {
        Self::new(Self::default_workers())
    }
}

impl Drop for JobPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn jobs_run_and_finalize_on_caller() {
        let pool = JobPool::new(2);
        let results: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));
        let caller = thread::current().id();
        for i in 0..8 {
            let results = results.clone();
            pool.submit(move || {
                let value = i * 2;
                Box::new(move || {
                    // Finalizers must run on the draining thread.
                    assert_eq!(thread::current().id(), caller);
                    results.lock().unwrap().push(value);
                })
            });
        }
        let mut ran = 0;
        let deadline = Instant::now() + Duration::from_secs(5);
        while ran < 8 && Instant::now() < deadline {
            ran += pool.drain_finalizers_for(Duration::from_millis(50));
        }
        assert_eq!(ran, 8);
        let mut got = results.lock().unwrap().clone();
        got.sort();
        assert_eq!(got, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[test]
    fn free_slots_reflect_load() {
        let pool = JobPool::new(2);
        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.free_slots(), 2);
        let (gate_tx, gate_rx) = unbounded::<()>();
        for _ in 0..2 {
            let gate = gate_rx.clone();
            pool.submit(move || {
                let _ = gate.recv();
                Box::new(|| {})
            });
        }
        // Both workers are occupied until the gate opens.
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.free_slots() != 0 && Instant::now() < deadline {
            thread::yield_now();
        }
        assert_eq!(pool.free_slots(), 0);
        drop(gate_tx);
        assert_eq!(pool.drain_finalizers_for(Duration::from_secs(5)), 2);
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.pending() != 0 && Instant::now() < deadline {
            thread::yield_now();
        }
        assert_eq!(pool.free_slots(), 2);
    }

    #[test]
    fn completion_order_not_submission_order() {
        let pool = JobPool::new(2);
        let (gate_tx, gate_rx) = unbounded::<()>();
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        // Submitted first, completes last: held until the gate opens.
        let o = order.clone();
        pool.submit(move || {
            let _ = gate_rx.recv();
            Box::new(move || o.lock().unwrap().push("slow"))
        });
        let o = order.clone();
        pool.submit(move || Box::new(move || o.lock().unwrap().push("fast")));

        // The fast job's finalizer is drainable while the slow one is stuck.
        let mut ran = 0;
        let deadline = Instant::now() + Duration::from_secs(5);
        while ran < 1 && Instant::now() < deadline {
            ran += pool.drain_finalizers_for(Duration::from_millis(50));
        }
        assert_eq!(*order.lock().unwrap(), vec!["fast"]);

        drop(gate_tx);
        while ran < 2 && Instant::now() < deadline {
            ran += pool.drain_finalizers_for(Duration::from_millis(50));
        }
        assert_eq!(ran, 2);
        assert_eq!(*order.lock().unwrap(), vec!["fast", "slow"]);
    }

    #[test]
    fn shutdown_joins_workers_and_keeps_results() {
        let mut pool = JobPool::new(3);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..6 {
            let counter = counter.clone();
            pool.submit(move || {
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            });
        }
        pool.shutdown();
        // All workers joined; every queued finalizer is still applicable.
        assert_eq!(pool.drain_finalizers(), 6);
        assert_eq!(counter.load(Ordering::SeqCst), 6);
        // Submissions after shutdown are dropped, not panics.
        pool.submit(|| Box::new(|| {}));
        assert_eq!(pool.drain_finalizers(), 0);
    }
}
