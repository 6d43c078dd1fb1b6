use crate::collator::Collator;
use crate::sample::Sample;
use crate::window::Window;
use anyhow::Result;
use ndarray::ArrayD;
use std::path::PathBuf;

/// The `MiniBatch` struct represents a batch of windows grouped for model input.
///
/// It is constructed by stacking multiple [`Sample`]s together along a new
/// leading batch axis (axis 0).
///
/// # Examples
/// Four samples cut from layered products with a section of 512 and five
/// channels each have data of shape `[8, 512, 512, 5]` and a mask of shape
/// `[512, 512]`. The resulting `MiniBatch` holds:
/// - `data` -> shape `[4, 8, 512, 512, 5]`
/// - `mask` -> shape `[4, 512, 512]`
///
/// `sources[i]` and `bounds[i]` describe where row `i` was cut from.
#[derive(Debug, Clone)]
pub struct MiniBatch {
    pub data: ArrayD<f32>,
    pub mask: ArrayD<f32>,
    pub sources: Vec<PathBuf>,
    pub bounds: Vec<Window>,
}

impl MiniBatch {
    /// Constructs a `MiniBatch` by applying the given [`Collator`] to a
    /// list of individual [`Sample`]s.
    ///
    /// Example:
    /// // Stack-only default
    /// let batch = MiniBatch::collate(samples, StackCollator);
    pub fn collate(samples: Vec<Sample>, collator: impl Collator) -> Result<Self> {
        collator.collate(&samples)
    }

    /// Returns the number of samples in the batch.
    pub fn batch_size(&self) -> usize {
        self.sources.len()
    }
}
