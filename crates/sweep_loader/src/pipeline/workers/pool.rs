//! Thread pool for background production.
//!
//! Spawns a fixed number of named worker threads that share one shutdown
//! flag, and joins them when dropped. Used by the [`Pipeline`] producers and
//! by the [`BatchLoader`] collation threads.
//!
//! [`Pipeline`]: crate::pipeline::Pipeline
//! [`BatchLoader`]: crate::pipeline::BatchLoader

use anyhow::{anyhow, Context, Result};
use log::debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::pipeline::common::thread::WORKER_ID;

/// Fixed set of worker threads with cooperative shutdown.
///
/// - Shutdown flag: workers poll it between units of work.
/// - Active counter: number of worker functions that have not returned yet.
pub(crate) struct WorkerPool {
    pub(crate) workers: Vec<thread::JoinHandle<()>>,
    pub(crate) shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawns `num_workers` threads named `{name}-{worker_id}`, each running
    /// `worker_fn(worker_id)`.
    pub(crate) fn spawn<F>(
        name: &str,
        num_workers: usize,
        shutdown: Arc<AtomicBool>,
        worker_fn: F,
    ) -> Result<Self>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        if num_workers == 0 {
            return Err(anyhow!(
                "Cannot create WorkerPool with 0 workers. \
                Either set worker_count > 0 or use single-threaded mode."
            ));
        }

        let worker_fn = Arc::new(worker_fn);
        let active = Arc::new(AtomicUsize::new(0));
        let mut pool = Self {
            workers: Vec::with_capacity(num_workers),
            shutdown,
            active,
        };

        for worker_id in 0..num_workers {
            let worker_fn = worker_fn.clone();
            let active = pool.active.clone();
            active.fetch_add(1, Ordering::SeqCst);

            let spawned = thread::Builder::new()
                .name(format!("{}-{}", name, worker_id))
                .spawn(move || {
                    WORKER_ID.with(|id| *id.borrow_mut() = worker_id);
                    let _exit = ActiveGuard { active, worker_id };
                    worker_fn(worker_id);
                });

            match spawned {
                Ok(handle) => pool.workers.push(handle),
                Err(err) => {
                    pool.active.fetch_sub(1, Ordering::SeqCst);
                    // Dropping the partial pool stops and joins what was spawned.
                    return Err(err)
                        .with_context(|| format!("Failed to spawn worker thread {}", worker_id));
                }
            }
        }

        Ok(pool)
    }

    /// Number of workers whose function is still running.
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Decrements the active count when a worker function returns or unwinds.
struct ActiveGuard {
    active: Arc<AtomicUsize>,
    worker_id: usize,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        debug!("Worker {} exited", self.worker_id);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Signal shutdown to all workers
        self.shutdown.store(true, Ordering::Release);

        // Wait for workers to finish
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
