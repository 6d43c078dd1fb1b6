use crate::error::{GeometryError, GeometryResult};
use crate::sample::Sample;
use crate::volume::{Annotation, Volume};
use crate::window::{extract, Window};
use anyhow::{ensure, Result};
use ndarray::{stack, ArrayViewD, Axis};
use rand::Rng;
use std::path::Path;

/// Radial rows kept clear at the near edge of every window.
pub const RADIAL_GUARD: usize = 5;

/// ============================================================================
/// Cuts fixed-size, randomly offset windows around point annotations.
///
/// # Arguments:
/// - `section_size`: Side length of every window, along both axes.
/// - `jitter`: If `true`, each window centre is displaced by an offset drawn
///             uniformly from `[-section_size/4, section_size/4]` on each axis,
///             so the event does not always sit in the middle of the window.
///
/// # Window placement
/// 1. Angular: `round(location) + jitter - section_size/2`. The end is
///    `start + section_size`; no clamping is needed because the axis wraps.
/// 2. Radial: same formula, then clamped so the window starts at or after
///    [`RADIAL_GUARD`] and ends at or before the radial extent.
///
/// `section_size/2` is floor division, so a window covers
/// `[centre - floor(s/2), centre + ceil(s/2))`. An odd size puts the centre
/// cell exactly in the middle. An even size leaves one cell more before the
/// centre than after it.
///
/// A volume whose radial extent cannot hold `section_size + RADIAL_GUARD`
/// rows is reported as [`GeometryError::SectionTooLarge`] instead of silently
/// yielding shorter windows.
///
/// # Example
/// ```ignore
/// let sampler = AnnotationSampler::new(512)?;
/// let mut rng = StdRng::seed_from_u64(42);
/// let samples = sampler.sample(&channels, &mask, &annotations, path, &mut rng)?;
/// ```
#[derive(Debug, Clone)]
pub struct AnnotationSampler {
    section_size: usize,
    jitter: bool,
}

impl AnnotationSampler {
    pub fn new(section_size: usize) -> Result<Self> {
        ensure!(
            section_size > 0,
            "section_size must be a positive integer value, but got section_size={}",
            section_size
        );
        Ok(Self {
            section_size,
            jitter: true,
        })
    }

    /// Enables or disables the random centre offset.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn section_size(&self) -> usize {
        self.section_size
    }

    /// Places a window for `annotation` in a volume with `radial_len` radial rows.
    pub fn window_for<R: Rng + ?Sized>(
        &self,
        annotation: &Annotation,
        radial_len: usize,
        rng: &mut R,
    ) -> GeometryResult<Window> {
        if radial_len < self.section_size + RADIAL_GUARD {
            return Err(GeometryError::SectionTooLarge {
                section_size: self.section_size,
                guard: RADIAL_GUARD,
                radial_len,
            });
        }

        let section = self.section_size as i64;
        let quarter = section / 4;
        let (angular_jitter, radial_jitter) = if self.jitter {
            (
                rng.random_range(-quarter..=quarter),
                rng.random_range(-quarter..=quarter),
            )
        } else {
            (0, 0)
        };

        let angular_start = annotation.angular_location.round() as i64 + angular_jitter - section / 2;
        let angular_end = angular_start + section;

        let guard = RADIAL_GUARD as i64;
        let radial_len = radial_len as i64;
        let mut radial_start = annotation.radial_location.round() as i64 + radial_jitter - section / 2;
        if radial_start < guard {
            radial_start = guard;
        }
        if radial_start + section > radial_len {
            radial_start = radial_len - section;
        }

        Ok(Window::new(
            angular_start,
            angular_end,
            radial_start as usize,
            (radial_start + section) as usize,
        ))
    }

    /// Builds one [`Sample`] per annotation.
    ///
    /// Every channel is cut with angular padding; the mask is cut without it.
    /// The channel windows are stacked on a new trailing axis in the order
    /// given. The radial extent is taken from the first channel. Returns an
    /// empty vector when there are no annotations.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        channels: &[Volume],
        mask: &Volume,
        annotations: &[Annotation],
        source_file: &Path,
        rng: &mut R,
    ) -> GeometryResult<Vec<Sample>> {
        let Some(first) = channels.first() else {
            return Err(GeometryError::NoChannels);
        };
        let radial_len = first.radial_len();

        let mut samples = Vec::with_capacity(annotations.len());
        for annotation in annotations {
            let window = self.window_for(annotation, radial_len, rng)?;

            let slices = channels
                .iter()
                .map(|channel| extract(channel, &window, true))
                .collect::<GeometryResult<Vec<_>>>()?;
            let views: Vec<ArrayViewD<'_, f32>> = slices.iter().map(Volume::view).collect();
            let data = stack(Axis(views[0].ndim()), &views)
                .map_err(|e| GeometryError::ShapeMismatch(e.to_string()))?;

            let mask_slice = extract(mask, &window, false)?;

            samples.push(Sample::new(
                data,
                mask_slice.into_array(),
                source_file,
                window,
            ));
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn plane(angular: usize, radial: usize, value: f32) -> Volume {
        Volume::from_plane(Array2::from_elem((angular, radial), value))
    }

    #[test]
    fn test_zero_section_rejected() {
        assert!(AnnotationSampler::new(0).is_err());
    }

    #[test]
    fn test_near_edge_annotation_clamps_to_guard() -> Result<()> {
        let sampler = AnnotationSampler::new(512)?.with_jitter(false);
        let mut rng = StdRng::seed_from_u64(0);
        let window = sampler.window_for(&Annotation::at(0.0, 5.0), 1832, &mut rng)?;

        assert_eq!(window.radial_start, 5);
        assert_eq!(window.radial_end, 517);
        assert_eq!(window.angular_start, -256);
        assert_eq!(window.angular_end, 256);
        Ok(())
    }

    #[test]
    fn test_far_edge_annotation_shifts_inward() -> Result<()> {
        let sampler = AnnotationSampler::new(64)?.with_jitter(false);
        let mut rng = StdRng::seed_from_u64(0);
        let window = sampler.window_for(&Annotation::at(10.0, 199.0), 200, &mut rng)?;

        assert_eq!(window.radial_start, 136);
        assert_eq!(window.radial_end, 200);
        Ok(())
    }

    #[test]
    fn test_half_section_rounds_down() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let at = Annotation::at(100.0, 50.0);

        // 8 cells before the centre, the centre itself, 8 after.
        let odd = AnnotationSampler::new(17)?.with_jitter(false);
        let window = odd.window_for(&at, 200, &mut rng)?;
        assert_eq!((window.angular_start, window.angular_end), (92, 109));
        assert_eq!((window.radial_start, window.radial_end), (42, 59));

        // 8 before, the centre, 7 after.
        let even = AnnotationSampler::new(16)?.with_jitter(false);
        let window = even.window_for(&at, 200, &mut rng)?;
        assert_eq!((window.angular_start, window.angular_end), (92, 108));
        assert_eq!((window.radial_start, window.radial_end), (42, 58));
        Ok(())
    }

    #[test]
    fn test_radial_bounds_hold_for_any_location() -> Result<()> {
        let sampler = AnnotationSampler::new(32)?;
        let mut rng = StdRng::seed_from_u64(17);
        for radial_len in [37usize, 40, 100, 1000] {
            for location in (-50..1100).step_by(7) {
                let annotation = Annotation::at(location as f64 * 0.37, location as f64);
                let window = sampler.window_for(&annotation, radial_len, &mut rng)?;
                assert!(window.radial_start >= RADIAL_GUARD);
                assert!(window.radial_end <= radial_len);
                assert_eq!(window.radial_size(), 32);
                assert_eq!(window.angular_size(), 32);
            }
        }
        Ok(())
    }

    #[test]
    fn test_jitter_stays_within_a_quarter_section() -> Result<()> {
        let sampler = AnnotationSampler::new(40)?;
        let mut rng = StdRng::seed_from_u64(5);
        let annotation = Annotation::at(180.0, 500.0);
        let mut offsets = std::collections::HashSet::new();
        for _ in 0..500 {
            let window = sampler.window_for(&annotation, 1000, &mut rng)?;
            let offset = window.angular_start - (180 - 20);
            assert!((-10..=10).contains(&offset), "offset {offset}");
            offsets.insert(offset);
        }
        // Jitter actually moves the window around.
        assert!(offsets.len() > 5);
        Ok(())
    }

    #[test]
    fn test_section_wider_than_volume_is_fatal() -> Result<()> {
        let sampler = AnnotationSampler::new(512)?;
        let mut rng = StdRng::seed_from_u64(0);
        let err = sampler
            .window_for(&Annotation::at(0.0, 0.0), 516, &mut rng)
            .unwrap_err();
        assert!(err.is_fatal());
        Ok(())
    }

    #[test]
    fn test_same_seed_same_windows() -> Result<()> {
        let sampler = AnnotationSampler::new(16)?;
        let annotation = Annotation::at(3.4, 40.6);
        let draw = |seed| -> GeometryResult<Vec<Window>> {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| sampler.window_for(&annotation, 200, &mut rng))
                .collect()
        };
        assert_eq!(draw(11)?, draw(11)?);
        Ok(())
    }

    #[test]
    fn test_sample_stacks_channels_and_cuts_mask() -> Result<()> {
        let sampler = AnnotationSampler::new(8)?.with_jitter(false);
        let mut rng = StdRng::seed_from_u64(0);
        let channels = vec![
            Volume::from_layers(Array3::from_elem((10, 36, 30), 1.0)),
            Volume::from_layers(Array3::from_elem((10, 36, 30), 2.0)),
            Volume::from_layers(Array3::from_elem((10, 36, 30), 3.0)),
        ];
        let mask = plane(36, 30, 1.0);
        let annotations = vec![Annotation::at(0.0, 15.0), Annotation::at(20.0, 29.0)];

        let samples = sampler.sample(
            &channels,
            &mask,
            &annotations,
            Path::new("KTLX_0001"),
            &mut rng,
        )?;

        assert_eq!(samples.len(), 2);
        for sample in &samples {
            assert_eq!(sample.data.shape(), &[8, 8, 8, 3]);
            assert_eq!(sample.mask.shape(), &[8, 8]);
            assert_eq!(sample.source_file(), Path::new("KTLX_0001"));
            assert_eq!(sample.data[[0, 0, 0, 2]], 3.0);
        }
        assert_eq!(samples[0].bounds, Window::new(-4, 4, 11, 19));
        assert_eq!(samples[1].bounds, Window::new(16, 24, 22, 30));
        Ok(())
    }

    #[test]
    fn test_mask_is_not_padded_but_channels_are() -> Result<()> {
        let sampler = AnnotationSampler::new(4)?.with_jitter(false);
        let mut rng = StdRng::seed_from_u64(0);
        let coords = Volume::from_plane(Array2::from_shape_fn((12, 10), |(a, _)| a as f32));

        let samples = sampler.sample(
            &[coords.clone()],
            &coords,
            &[Annotation::at(2.0, 7.0)],
            Path::new("f"),
            &mut rng,
        )?;
        let sample = &samples[0];

        // Window covers angular rows 0..4: the mask sees them as-is, the
        // padded channel is shifted one row forward.
        let mask_rows: Vec<f32> = (0..4).map(|a| sample.mask[[a, 0]]).collect();
        let data_rows: Vec<f32> = (0..4).map(|a| sample.data[[a, 0, 0]]).collect();
        assert_eq!(mask_rows, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(data_rows, vec![1.0, 2.0, 3.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_no_annotations_no_samples() -> Result<()> {
        let sampler = AnnotationSampler::new(8)?;
        let mut rng = StdRng::seed_from_u64(0);
        let samples = sampler.sample(
            &[plane(36, 30, 0.0)],
            &plane(36, 30, 0.0),
            &[],
            Path::new("f"),
            &mut rng,
        )?;
        assert!(samples.is_empty());
        Ok(())
    }

    #[test]
    fn test_mismatched_channel_shapes_reported() -> Result<()> {
        let sampler = AnnotationSampler::new(8)?.with_jitter(false);
        let mut rng = StdRng::seed_from_u64(0);
        let channels = vec![plane(36, 30, 0.0), Volume::from_layers(Array3::zeros((2, 36, 30)))];
        let err = sampler
            .sample(
                &channels,
                &plane(36, 30, 0.0),
                &[Annotation::at(0.0, 15.0)],
                Path::new("f"),
                &mut rng,
            )
            .unwrap_err();
        assert!(matches!(err, GeometryError::ShapeMismatch(_)));
        assert!(sampler
            .sample(&[], &plane(36, 30, 0.0), &[], Path::new("f"), &mut rng)
            .is_err());
        Ok(())
    }
}
