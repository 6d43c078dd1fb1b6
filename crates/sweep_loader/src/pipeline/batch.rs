//! src/pipeline/batch.rs
//!
//! Background collation of samples into mini-batches.
//!
//! A [`BatchLoader`] runs `thread_count` collation threads on top of any
//! [`SampleSource`]. Each thread gathers `batch_size` samples, collates them
//! and pushes the batch into a bounded crossbeam channel, so the consumer
//! only ever waits on finished batches.
//!
//! # Shutdown
//! Threads check the shared shutdown flag between samples and while waiting
//! to send, bounded by `poll_interval`. They also stop when the source closes.
//! Once every thread has exited the output channel disconnects and
//! [`BatchLoader::next_batch`] returns `None`.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::config::BatchConfig;
use super::loader::{Pipeline, Producer};
use super::workers::pool::WorkerPool;
use crate::collator::Collator;
use crate::minibatch::MiniBatch;
use crate::sample::Sample;

/// Anything that hands out samples one at a time, across threads.
pub trait SampleSource: Send + Sync + 'static {
    /// Waits up to `timeout` for the next sample.
    fn next_sample_timeout(&self, timeout: Duration) -> Option<Sample>;

    /// `true` once no more samples will ever arrive.
    fn is_closed(&self) -> bool;
}

impl<P> SampleSource for Pipeline<P>
where
    P: Producer<Item = Sample>,
{
    fn next_sample_timeout(&self, timeout: Duration) -> Option<Sample> {
        self.next_timeout(timeout)
    }

    fn is_closed(&self) -> bool {
        !self.is_alive()
    }
}

/// Collates samples from a [`SampleSource`] into [`MiniBatch`]es on
/// background threads.
///
/// # Example
/// ```ignore
/// let loader = BatchLoader::new(dataset.clone(), StackCollator, BatchConfig {
///     batch_size: 16,
///     ..BatchConfig::default()
/// })?;
/// while let Some(batch) = loader.next_batch() {
///     train_step(&batch.data, &batch.mask);
/// }
/// ```
pub struct BatchLoader {
    pool: Option<WorkerPool>,
    output_rx: Receiver<MiniBatch>,
    config: BatchConfig,
}

impl BatchLoader {
    /// Starts the collation threads.
    ///
    /// # Errors
    /// - Invalid batch configuration
    /// - Thread creation failure
    pub fn new<S, C>(source: Arc<S>, collator: C, config: BatchConfig) -> Result<Self>
    where
        S: SampleSource,
        C: Collator + 'static,
    {
        config.validate().context("Invalid batch configuration")?;

        let (output_tx, output_rx) = bounded(config.queue_capacity);
        let collator = Arc::new(collator);

        let pool = {
            let shutdown = Arc::new(AtomicBool::new(false));
            let batch_size = config.batch_size;
            let poll_interval = config.poll_interval;
            WorkerPool::spawn(
                "batch-worker",
                config.thread_count,
                shutdown.clone(),
                move |worker_id| {
                    collate_loop(
                        worker_id,
                        source.as_ref(),
                        collator.as_ref(),
                        &output_tx,
                        &shutdown,
                        batch_size,
                        poll_interval,
                    )
                },
            )
            .context("Failed to start batch workers")?
        };

        Ok(Self {
            pool: Some(pool),
            output_rx,
            config,
        })
    }

    /// Waits for the next batch. Returns `None` once the source has closed
    /// and every queued batch has been consumed.
    pub fn next_batch(&self) -> Option<MiniBatch> {
        self.output_rx.recv().ok()
    }

    /// Like [`BatchLoader::next_batch`], but gives up after `timeout`.
    pub fn next_batch_timeout(&self, timeout: Duration) -> Option<MiniBatch> {
        match self.output_rx.recv_timeout(timeout) {
            Ok(batch) => Some(batch),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Number of finished batches waiting to be consumed.
    pub fn queued(&self) -> usize {
        self.output_rx.len()
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }
}

impl Drop for BatchLoader {
    fn drop(&mut self) {
        // Dropping the pool raises the shutdown flag and joins the threads.
        self.pool.take();
    }
}

fn collate_loop<S: SampleSource, C: Collator>(
    worker_id: usize,
    source: &S,
    collator: &C,
    output_tx: &Sender<MiniBatch>,
    shutdown: &AtomicBool,
    batch_size: usize,
    poll_interval: Duration,
) {
    let mut samples = Vec::with_capacity(batch_size);
    loop {
        while samples.len() < batch_size {
            if shutdown.load(Ordering::Acquire) {
                return;
            }
            match source.next_sample_timeout(poll_interval) {
                Some(sample) => samples.push(sample),
                None if source.is_closed() => {
                    debug!("Batch worker {} stopping: source closed", worker_id);
                    return;
                }
                None => {}
            }
        }

        let mut batch = match collator.collate(&samples) {
            Ok(batch) => batch,
            Err(err) => {
                warn!("Batch worker {} dropped a batch: {:#}", worker_id, err);
                samples.clear();
                continue;
            }
        };
        samples.clear();

        loop {
            match output_tx.send_timeout(batch, poll_interval) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(returned)) => {
                    if shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    batch = returned;
                }
                Err(SendTimeoutError::Disconnected(_)) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collator::StackCollator;
    use crate::window::Window;
    use ndarray::{ArrayD, IxDyn};
    use std::sync::Mutex;

    /// Hands out `remaining` samples, then reports itself closed.
    struct FiniteSource {
        remaining: Mutex<usize>,
    }

    impl FiniteSource {
        fn new(count: usize) -> Arc<Self> {
            Arc::new(Self {
                remaining: Mutex::new(count),
            })
        }
    }

    impl SampleSource for FiniteSource {
        fn next_sample_timeout(&self, _timeout: Duration) -> Option<Sample> {
            let mut remaining = self.remaining.lock().unwrap();
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
            Some(Sample::new(
                ArrayD::from_elem(IxDyn(&[2, 2, 1]), *remaining as f32),
                ArrayD::zeros(IxDyn(&[2, 2])),
                format!("file-{}", remaining),
                Window::new(0, 2, 5, 7),
            ))
        }

        fn is_closed(&self) -> bool {
            *self.remaining.lock().unwrap() == 0
        }
    }

    fn config(batch_size: usize, threads: usize) -> BatchConfig {
        BatchConfig {
            batch_size,
            thread_count: threads,
            queue_capacity: 2,
            poll_interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_batches_have_requested_size() -> Result<()> {
        let loader = BatchLoader::new(FiniteSource::new(12), StackCollator, config(4, 1))?;
        let mut batches = Vec::new();
        while let Some(batch) = loader.next_batch() {
            batches.push(batch);
        }
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.batch_size() == 4));
        assert!(batches.iter().all(|b| b.data.shape() == [4, 2, 2, 1]));
        Ok(())
    }

    #[test]
    fn test_partial_batch_is_dropped_when_source_closes() -> Result<()> {
        let loader = BatchLoader::new(FiniteSource::new(5), StackCollator, config(4, 1))?;
        assert!(loader.next_batch().is_some());
        assert!(loader.next_batch().is_none());
        Ok(())
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = BatchLoader::new(FiniteSource::new(1), StackCollator, config(0, 1));
        assert!(result.is_err());
    }

    #[test]
    fn test_drop_with_full_queue_does_not_hang() -> Result<()> {
        let loader = BatchLoader::new(FiniteSource::new(1000), StackCollator, config(1, 3))?;
        std::thread::sleep(Duration::from_millis(30));
        assert!(loader.queued() <= 2);
        drop(loader);
        Ok(())
    }
}
