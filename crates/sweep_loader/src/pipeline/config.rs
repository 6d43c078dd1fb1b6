//! src/pipeline/config.rs
//!
//! Configuration for Pipeline and BatchLoader behaviour
//!
//! Example:
//! ```ignore
//! let config = PipelineConfig::builder()
//!     .worker_count(4)
//!     .buffer_capacity(5)
//!     .idle_interval(Duration::from_millis(50))
//!     .seed(42)
//!     .build();
//! ```
//!
//! # Performance considerations:
//! - `worker_count`: More workers hide more decode latency but hold more
//!                   decoded volumes in memory at once.
//! - `buffer_capacity`: Soft bound; with `n` workers the buffer can briefly
//!                      hold `buffer_capacity + n - 1` productions.
//! - `idle_interval`: Upper bound on how long a worker waiting for room
//!                    sleeps before re-checking for shutdown.

use anyhow::{ensure, Result};
use std::time::Duration;

/// Configuration for [`Pipeline`](super::Pipeline)
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of background producer threads (0 = produce on the consumer's thread)
    pub worker_count: usize,
    /// Soft upper bound on buffered items
    pub buffer_capacity: usize,
    /// How long a worker waits for room before re-checking its shutdown flag.
    /// Not an error timeout - just a polling bound. Default: 50ms.
    pub idle_interval: Duration,
    /// Base seed for per-worker RNGs. A random seed is drawn when `None`.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            buffer_capacity: 5,
            idle_interval: Duration::from_millis(50),
            seed: None,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.buffer_capacity > 0,
            "Buffer capacity must be greater than 0"
        );
        ensure!(
            !self.idle_interval.is_zero(),
            "Idle interval must be non-zero"
        );
        Ok(())
    }
}

/// Builder for PipelineConfig with method chaining
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the number of producer workers
    pub fn worker_count(mut self, workers: usize) -> Self {
        self.config.worker_count = workers;
        self
    }

    /// Set the soft buffer capacity (must be > 0)
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Set the idle wait bound for workers blocked on a full buffer.
    ///
    /// - Too low: More responsive shutdown, more wakeups.
    /// - Too high: Fewer wakeups, slower shutdown response.
    pub fn idle_interval(mut self, interval: Duration) -> Self {
        self.config.idle_interval = interval;
        self
    }

    /// Set the base seed for worker randomness.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

/// Configuration for [`BatchLoader`](super::BatchLoader)
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Samples per batch
    pub batch_size: usize,
    /// Number of collation threads
    pub thread_count: usize,
    /// Number of finished batches queued ahead of the consumer
    pub queue_capacity: usize,
    /// How often a collation thread waiting on samples checks for shutdown
    pub poll_interval: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            thread_count: 2,
            queue_capacity: 5,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "Batch size must be greater than 0");
        ensure!(
            self.thread_count > 0,
            "Batch loader needs at least one thread"
        );
        ensure!(
            self.queue_capacity > 0,
            "Queue capacity must be > 0 to prevent deadlocks"
        );
        Ok(())
    }
}
