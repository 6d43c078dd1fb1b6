//! src/dataset/mod.rs
//!
//! The event window dataset: a [`Pipeline`] whose producer walks a list of
//! radar files and turns each into training windows around labelled events.
//!
//! ```text
//!  FileCursor ──→ VolumeDecoder ──→ CoverageRule ──→ AnnotationGenerator ──→ AnnotationSampler
//!  (next file)    (load channels)   (skip sparse)    (mask + events)         (one Sample per event)
//! ```
//!
//! # Example
//! ```ignore
//! let split = TrainTestSplit::from_dir("data/level2", 80.0)?;
//! let dataset = EventWindowDataset::new(
//!     split.train_paths(),
//!     decoder,
//!     annotator,
//!     DatasetConfig::from_json_file("dataset.json")?,
//! )?;
//!
//! while let Some(sample) = dataset.next(true) {
//!     train_step(&sample.data, &sample.mask);
//! }
//! ```

pub mod config;
pub mod producer;

pub use config::DatasetConfig;
pub use producer::WindowProducer;

use anyhow::{Context, Error, Result};
use rand::Rng;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use crate::cursor::FileCursor;
use crate::pipeline::{Pipeline, SampleSource};
use crate::sample::Sample;
use crate::source::{AnnotationGenerator, VolumeDecoder};

/// Streams [`Sample`]s cut from a list of radar files.
///
/// The file list is read in order and wraps around forever; with
/// `auto_shuffle` it is shuffled once here and again on every wraparound.
/// Files that fail to decode, validate or label are skipped.
pub struct EventWindowDataset<D: VolumeDecoder, A: AnnotationGenerator> {
    pipeline: Pipeline<WindowProducer<D, A>>,
}

impl<D: VolumeDecoder, A: AnnotationGenerator> EventWindowDataset<D, A> {
    /// Builds the dataset and starts its workers.
    ///
    /// # Errors
    /// - Empty file list
    /// - Invalid configuration
    /// - Worker thread creation failure
    pub fn new(files: Vec<PathBuf>, decoder: D, annotator: A, config: DatasetConfig) -> Result<Self> {
        config.validate().context("Invalid dataset configuration")?;

        // One seed drives both the worker RNGs and the file order.
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut pipeline_config = config.pipeline_config();
        pipeline_config.seed = Some(seed);

        let mut cursor = FileCursor::new(files, config.auto_shuffle, seed)?;
        if config.auto_shuffle {
            cursor.shuffle(&mut VecDeque::<Sample>::new());
        }

        let producer = WindowProducer::new(decoder, annotator, &config)?;
        let pipeline = Pipeline::spawn(producer, cursor, pipeline_config)?;
        Ok(Self { pipeline })
    }

    /// Next sample, oldest first. See [`Pipeline::next`].
    pub fn next(&self, blocking: bool) -> Option<Sample> {
        self.pipeline.next(blocking)
    }

    pub fn next_timeout(&self, timeout: Duration) -> Option<Sample> {
        self.pipeline.next_timeout(timeout)
    }

    /// Number of buffered samples. Advisory only.
    pub fn size(&self) -> usize {
        self.pipeline.size()
    }

    /// Reshuffles the file list, rewinds the cursor and discards every
    /// buffered sample, all under the buffer lock.
    ///
    /// Workers that were mid-file keep going; their samples from the old
    /// order can still arrive after this returns.
    pub fn shuffle(&self) {
        self.pipeline.with_state(|cursor, buffered| cursor.shuffle(buffered));
    }

    /// Index of the next file the cursor will hand out.
    pub fn position(&self) -> usize {
        self.pipeline.with_state(|cursor, _| cursor.position())
    }

    /// Snapshot of the current file order.
    pub fn files(&self) -> Vec<PathBuf> {
        self.pipeline.with_state(|cursor, _| cursor.files().to_vec())
    }

    pub fn shutdown(&self) {
        self.pipeline.shutdown();
    }

    pub fn is_alive(&self) -> bool {
        self.pipeline.is_alive()
    }

    /// The fatal error that stopped production, if any.
    pub fn take_fault(&self) -> Option<Error> {
        self.pipeline.take_fault()
    }

    pub fn pipeline(&self) -> &Pipeline<WindowProducer<D, A>> {
        &self.pipeline
    }
}

impl<D: VolumeDecoder, A: AnnotationGenerator> SampleSource for EventWindowDataset<D, A> {
    fn next_sample_timeout(&self, timeout: Duration) -> Option<Sample> {
        self.next_timeout(timeout)
    }

    fn is_closed(&self) -> bool {
        !self.is_alive()
    }
}
