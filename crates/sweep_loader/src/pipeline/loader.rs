//! src/pipeline/loader.rs
//!
//! The `Pipeline` struct, the `Producer` trait it drives, and the
//! production loop run by every worker.
//!
//! # Modes
//! - `worker_count > 0`: [`Pipeline::start`] spawns that many workers. Each
//!   waits for room below capacity, calls [`Producer::produce`], appends the
//!   result and wakes consumers.
//! - `worker_count = 0`: no threads. [`Pipeline::next`] calls the producer on
//!   the consumer's thread until an item is available, with the pipeline's
//!   own seeded RNG installed as the worker RNG.
//!
//! # Shutdown
//! [`Pipeline::shutdown`] flips the shutdown flag, clears the buffer and wakes
//! every waiter. A worker inside `produce()` finishes that call, sees the flag
//! when it tries to append, drops the result and exits. Dropping the pipeline
//! shuts it down and joins the workers.

use anyhow::{anyhow, Context, Error, Result};
use log::{debug, error};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::buffer::PipelineBuffer;
use super::common::thread::{current_worker_id, init_worker_rng, with_rng_installed};
use super::config::PipelineConfig;
use super::workers::pool::WorkerPool;

/// Result of one production step.
///
/// `Many` is unpacked: every element becomes its own buffered item. A
/// producer that wants a whole list delivered as one item uses a `Vec` as its
/// item type and returns `One`.
#[derive(Debug)]
pub enum Production<T> {
    Empty,
    One(T),
    Many(Vec<T>),
}

impl<T> Production<T> {
    pub fn len(&self) -> usize {
        match self {
            Production::Empty => 0,
            Production::One(_) => 1,
            Production::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> IntoIterator for Production<T> {
    type Item = T;
    type IntoIter = std::iter::Flatten<std::option::IntoIter<Vec<T>>>;

    fn into_iter(self) -> Self::IntoIter {
        let items = match self {
            Production::Empty => None,
            Production::One(item) => Some(vec![item]),
            Production::Many(items) => Some(items),
        };
        items.into_iter().flatten()
    }
}

impl<T> From<Vec<T>> for Production<T> {
    fn from(items: Vec<T>) -> Self {
        Production::Many(items)
    }
}

impl<T> From<Option<T>> for Production<T> {
    fn from(item: Option<T>) -> Self {
        item.map_or(Production::Empty, Production::One)
    }
}

/// A pluggable production step.
///
/// `produce` is called repeatedly and concurrently from every worker. It gets
/// the pipeline's buffer so it can reach the shared `State` (through
/// [`PipelineBuffer::with_state`]) under the same lock as the buffered items.
///
/// Returning `Err` is reserved for faults that make further production
/// pointless: the pipeline records the error, logs it and shuts down.
/// Recoverable problems (a bad input file) should be handled inside
/// `produce`.
pub trait Producer: Send + Sync + 'static {
    type Item: Send + 'static;
    type State: Send + 'static;

    fn produce(
        &self,
        buffer: &PipelineBuffer<Self::Item, Self::State>,
    ) -> Result<Production<Self::Item>>;
}

/// Bounded producer/consumer pipeline.
///
/// # Thread safety:
/// - All methods take `&self`; a `Pipeline` can be shared through an `Arc`
///   by several consumers.
/// - Items come out oldest-first per worker. Across workers productions
///   interleave in whatever order they finish.
pub struct Pipeline<P: Producer> {
    producer: Arc<P>,
    buffer: Arc<PipelineBuffer<P::Item, P::State>>,
    config: PipelineConfig,
    base_seed: u64,
    /// Randomness for production on consumer threads (`worker_count = 0`).
    inline_rng: Mutex<StdRng>,
    workers: Mutex<Option<WorkerPool>>,
}

impl<P: Producer> Pipeline<P> {
    /// Creates a pipeline without starting any workers.
    ///
    /// # Errors
    /// - Returns error if `buffer_capacity` is 0 or `idle_interval` is zero.
    pub fn new(producer: P, state: P::State, config: PipelineConfig) -> Result<Self> {
        config.validate().context("Invalid pipeline configuration")?;
        let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let shutdown = Arc::new(AtomicBool::new(false));

        Ok(Self {
            producer: Arc::new(producer),
            buffer: Arc::new(PipelineBuffer::new(config.buffer_capacity, state, shutdown)),
            config,
            base_seed,
            inline_rng: Mutex::new(StdRng::seed_from_u64(base_seed)),
            workers: Mutex::new(None),
        })
    }

    /// Creates a pipeline and starts it.
    pub fn spawn(producer: P, state: P::State, config: PipelineConfig) -> Result<Self> {
        let pipeline = Self::new(producer, state, config)?;
        pipeline.start()?;
        Ok(pipeline)
    }

    /// Starts the background workers.
    ///
    /// With `worker_count = 0` no thread is spawned. Production then runs on
    /// consumer threads with the pipeline's own RNG seeded from `base_seed`,
    /// whichever thread calls [`Pipeline::next`].
    ///
    /// # Errors
    /// - Returns error if the pipeline was already started or shut down.
    /// - Worker thread creation failure
    pub fn start(&self) -> Result<()> {
        if !self.buffer.is_alive() {
            return Err(anyhow!("Cannot start a pipeline that has been shut down"));
        }

        if self.config.worker_count == 0 {
            return Ok(());
        }

        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        if workers.is_some() {
            return Err(anyhow!("Pipeline workers are already running"));
        }

        let producer = self.producer.clone();
        let buffer = self.buffer.clone();
        let idle_interval = self.config.idle_interval;
        let base_seed = self.base_seed;

        let pool = WorkerPool::spawn(
            "pipeline-worker",
            self.config.worker_count,
            self.buffer.shutdown_flag(),
            move |worker_id| {
                init_worker_rng(worker_id, base_seed);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_worker(producer.as_ref(), &buffer, idle_interval)
                }));
                if outcome.is_err() {
                    error!("Pipeline worker {} panicked", worker_id);
                    buffer.fail(anyhow!("Pipeline worker {} panicked", worker_id));
                }
            },
        )
        .context("Failed to start pipeline workers")?;

        debug!(
            "Started {} pipeline workers (capacity {}, seed {})",
            self.config.worker_count, self.config.buffer_capacity, base_seed
        );
        *workers = Some(pool);
        Ok(())
    }

    /// Takes the oldest buffered item.
    ///
    /// - `blocking = true`: waits until an item is available.
    /// - `blocking = false`: returns `None` immediately if the buffer is empty.
    ///
    /// With `worker_count = 0` the producer runs on this thread until it
    /// yields something, regardless of `blocking`. Returns `None` once the
    /// pipeline is shut down, and does not wait on a pipeline whose workers
    /// were never started.
    pub fn next(&self, blocking: bool) -> Option<P::Item> {
        if self.config.worker_count == 0 {
            return self.produce_inline();
        }
        if blocking && self.is_started() {
            self.buffer.pop_wait(None)
        } else {
            self.buffer.try_pop()
        }
    }

    /// Like a blocking [`Pipeline::next`], but gives up after `timeout`.
    pub fn next_timeout(&self, timeout: Duration) -> Option<P::Item> {
        if self.config.worker_count == 0 {
            return self.produce_inline();
        }
        self.buffer.pop_wait(Some(Instant::now() + timeout))
    }

    fn is_started(&self) -> bool {
        self.workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn produce_inline(&self) -> Option<P::Item> {
        loop {
            if !self.buffer.is_alive() {
                return None;
            }
            if let Some(item) = self.buffer.try_pop() {
                return Some(item);
            }
            let produced = {
                let mut rng = self.inline_rng.lock().unwrap_or_else(|e| e.into_inner());
                with_rng_installed(&mut rng, || self.producer.produce(&self.buffer))
            };
            match produced {
                Ok(production) => {
                    self.buffer.push_all(production);
                }
                Err(err) => {
                    error!("Pipeline producer failed: {:#}", err);
                    self.buffer.fail(err);
                    return None;
                }
            }
        }
    }

    /// Number of buffered items. Advisory only.
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_alive(&self) -> bool {
        self.buffer.is_alive()
    }

    /// Number of workers still running their production loop.
    pub fn active_workers(&self) -> usize {
        self.workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(0, WorkerPool::active)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The buffer shared with the workers, for access to the shared state.
    pub fn buffer(&self) -> &PipelineBuffer<P::Item, P::State> {
        &self.buffer
    }

    /// Runs `f` on the shared state and buffered items in one critical section.
    pub fn with_state<R>(
        &self,
        f: impl FnOnce(&mut P::State, &mut std::collections::VecDeque<P::Item>) -> R,
    ) -> R {
        self.buffer.with_state(f)
    }

    /// Stops production and discards buffered items.
    ///
    /// Workers exit on their next loop iteration; a worker waiting for room
    /// notices within one idle interval. Does not wait for them to exit.
    pub fn shutdown(&self) {
        if self.buffer.is_alive() {
            debug!("Shutting down pipeline");
        }
        self.buffer.close();
    }

    /// Returns the error that stopped the pipeline, if any.
    pub fn take_fault(&self) -> Option<Error> {
        self.buffer.take_fault()
    }
}

impl<P: Producer> Drop for Pipeline<P> {
    fn drop(&mut self) {
        self.buffer.close();
        // Joins the workers.
        self.workers
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }
}

/// Production loop of one worker.
fn run_worker<P: Producer>(
    producer: &P,
    buffer: &PipelineBuffer<P::Item, P::State>,
    idle_interval: Duration,
) {
    let worker_id = current_worker_id();
    while buffer.wait_for_room(idle_interval) {
        match producer.produce(buffer) {
            Ok(production) => {
                if !buffer.push_all(production) {
                    debug!("Worker {} dropped its last production on shutdown", worker_id);
                    break;
                }
            }
            Err(err) => {
                error!("Pipeline worker {} failed: {:#}", worker_id, err);
                buffer.fail(err);
                break;
            }
        }
    }
}
