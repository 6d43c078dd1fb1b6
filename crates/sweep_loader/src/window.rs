//! Circular window extraction.
//!
//! Windows are cut out of a [`Volume`] along two axes that behave differently:
//! - the angular axis wraps, so any start position selects exactly
//!   `angular_end - angular_start` rows, folding across the seam when needed;
//! - the radial axis is linear, so the radial range must already lie inside
//!   `[0, radial_len)` (callers clamp it, see [`crate::sampler`]).
//!
//! Layered volumes keep only their first [`MAX_LAYERS`] layers; higher sweeps
//! carry little signal near the ground and are dropped before indexing.

use crate::error::{GeometryError, GeometryResult};
use crate::volume::Volume;
use ndarray::{Axis, Slice};
use serde::{Deserialize, Serialize};

/// Number of leading layers kept from a layered volume.
pub const MAX_LAYERS: usize = 8;

/// A rectangular region in `(angular, radial)` space.
///
/// Angular bounds are signed and may lie outside `[0, angular_len)`; they are
/// reduced onto the circle at extraction time. Radial bounds are plain
/// indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub angular_start: i64,
    pub angular_end: i64,
    pub radial_start: usize,
    pub radial_end: usize,
}

impl Window {
    pub fn new(angular_start: i64, angular_end: i64, radial_start: usize, radial_end: usize) -> Self {
        Self {
            angular_start,
            angular_end,
            radial_start,
            radial_end,
        }
    }

    pub fn angular_size(&self) -> usize {
        (self.angular_end - self.angular_start).max(0) as usize
    }

    pub fn radial_size(&self) -> usize {
        self.radial_end.saturating_sub(self.radial_start)
    }
}

/// Computes the angular row indices selected by `start..end` on a circle of
/// `angular_len` rows.
///
/// The bounds are brought into range with a single shift of one period, then
/// every index is reduced modulo `angular_len`. With `padded` set, indices are
/// moved one row forward and the last row of the circle is skipped by folding
/// anything at or past `angular_len - 1` back by `angular_len - 2`. Rows `0`
/// and `angular_len - 1` therefore never appear in a padded selection; they
/// are the guard rows around the seam.
pub fn angular_indices(
    angular_len: usize,
    start: i64,
    end: i64,
    padded: bool,
) -> GeometryResult<Vec<usize>> {
    if angular_len == 0 {
        return Err(GeometryError::EmptyAngularAxis);
    }
    if end <= start {
        return Err(GeometryError::EmptyWindow { start, end });
    }

    let len = angular_len as i64;
    let (mut start, mut end) = (start, end);
    if start < 0 {
        start += len;
        end += len;
    }
    if start >= len {
        start -= len;
        end -= len;
    }

    let indices = (start..end)
        .map(|index| {
            let index = if padded {
                let shifted = index + 1;
                if shifted < len - 1 {
                    shifted
                } else {
                    shifted - (len - 2)
                }
            } else {
                index
            };
            index.rem_euclid(len) as usize
        })
        .collect();
    Ok(indices)
}

/// Cuts `window` out of `volume`.
///
/// The result has shape `(layers, angular_size, radial_size)` for layered
/// volumes (with at most [`MAX_LAYERS`] layers) and
/// `(angular_size, radial_size)` otherwise. The source volume is untouched.
///
/// # Errors
/// - [`GeometryError::RadialOutOfBounds`] if the radial range leaves the volume.
/// - [`GeometryError::EmptyAngularAxis`] / [`GeometryError::EmptyWindow`] for
///   degenerate inputs.
pub fn extract(volume: &Volume, window: &Window, padded: bool) -> GeometryResult<Volume> {
    let radial_len = volume.radial_len();
    if window.radial_start > window.radial_end || window.radial_end > radial_len {
        return Err(GeometryError::RadialOutOfBounds {
            start: window.radial_start,
            end: window.radial_end,
            radial_len,
        });
    }

    let indices = angular_indices(
        volume.angular_len(),
        window.angular_start,
        window.angular_end,
        padded,
    )?;

    let angular_axis = volume.angular_axis();
    let mut view = volume.view();
    if let Some(layers) = volume.layer_count() {
        view.slice_axis_inplace(Axis(0), Slice::from(0..layers.min(MAX_LAYERS)));
    }
    view.slice_axis_inplace(
        Axis(angular_axis + 1),
        Slice::from(window.radial_start..window.radial_end),
    );

    Volume::new(view.select(Axis(angular_axis), &indices))
}
