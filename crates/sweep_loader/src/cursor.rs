//! Sequential file cursor with wraparound and reshuffling.
//!
//! The cursor lives inside the pipeline's buffer lock (it is the pipeline's
//! shared state, see [`crate::pipeline::PipelineBuffer::with_state`]). Both
//! operations that reorder the file list take the buffered items as well, so
//! reordering and discarding stale results always happen in one critical
//! section.

use anyhow::{ensure, Result};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::path::PathBuf;

#[derive(Debug)]
pub struct FileCursor {
    files: Vec<PathBuf>,
    position: usize,
    auto_shuffle: bool,
    rng: StdRng,
}

impl FileCursor {
    /// Creates a cursor positioned at the first file.
    ///
    /// `seed` drives every reshuffle of the list. The list is not shuffled
    /// here; call [`FileCursor::shuffle`] for an initial permutation.
    pub fn new(files: Vec<PathBuf>, auto_shuffle: bool, seed: u64) -> Result<Self> {
        ensure!(!files.is_empty(), "File cursor needs at least one file");
        Ok(Self {
            files,
            position: 0,
            auto_shuffle,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Returns the file under the cursor and advances it.
    ///
    /// When the cursor runs off the end it goes back to `0`; with
    /// `auto_shuffle` set the list is also reshuffled and `buffered` cleared.
    pub fn next_file<T>(&mut self, buffered: &mut VecDeque<T>) -> PathBuf {
        let file = self.files[self.position].clone();
        self.position += 1;
        if self.position >= self.files.len() {
            self.position = 0;
            if self.auto_shuffle {
                self.shuffle(buffered);
            }
        }
        file
    }

    /// Randomizes the file order, drops every buffered item and rewinds.
    pub fn shuffle<T>(&mut self, buffered: &mut VecDeque<T>) {
        self.files.shuffle(&mut self.rng);
        let discarded = buffered.len();
        buffered.clear();
        self.position = 0;
        debug!(
            "Reshuffled {} files, discarded {} buffered items",
            self.files.len(),
            discarded
        );
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn auto_shuffle(&self) -> bool {
        self.auto_shuffle
    }
}
