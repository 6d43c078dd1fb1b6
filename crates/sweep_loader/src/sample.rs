use crate::window::Window;
use ndarray::ArrayD;
use std::path::{Path, PathBuf};

/// One training example cut out around an annotated event.
///
/// - `data`: the stacked channel windows. Each channel slice has shape
///   `(layers, angular, radial)` (or `(angular, radial)` for single-layer
///   products) and the channels are stacked on a trailing axis, so a layered
///   sample has shape `(layers, angular, radial, channels)`.
/// - `mask`: the label window, cut without angular padding so it stays aligned
///   with exact label pixels.
/// - `source_file` and `bounds` record where the window came from.
///
/// A `Sample` owns its arrays; it moves from the producing worker into the
/// pipeline buffer and from there to exactly one consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub data: ArrayD<f32>,
    pub mask: ArrayD<f32>,
    pub source_file: PathBuf,
    pub bounds: Window,
}

impl Sample {
    pub fn new(
        data: ArrayD<f32>,
        mask: ArrayD<f32>,
        source_file: impl Into<PathBuf>,
        bounds: Window,
    ) -> Self {
        Self {
            data,
            mask,
            source_file: source_file.into(),
            bounds,
        }
    }

    /// Number of stacked channels (size of the trailing data axis).
    pub fn channel_count(&self) -> usize {
        self.data.shape().last().copied().unwrap_or(0)
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }
}

#[cfg(test)]
mod sample_test {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn test_sample_basic_construction() {
        let sample = Sample::new(
            ArrayD::zeros(IxDyn(&[8, 16, 16, 5])),
            ArrayD::ones(IxDyn(&[16, 16])),
            "KTLX20240520_2301",
            Window::new(-3, 13, 5, 21),
        );

        assert_eq!(sample.channel_count(), 5);
        assert_eq!(sample.source_file(), Path::new("KTLX20240520_2301"));
        assert_eq!(sample.bounds.angular_size(), 16);
        assert_eq!(sample.mask.sum(), 256.0);
    }
}
